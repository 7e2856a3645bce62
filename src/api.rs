use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, RequestBuilder, Response};

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::listing::SortKey;
use crate::types::{ApiErrorBody, CreateFolderRequest, FileEntry};

/// Thin client for the file manager REST API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    pub fn new(cfg: &ApiConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cfg.session_cookie() {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| AppError::InvalidInput(format!("invalid api.session_cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }
        // No overall timeout: a transfer runs until the transport itself fails.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .user_agent(concat!("filedeck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base: cfg.base_url.trim_end_matches('/').to_string() })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub async fn list_files(&self, parent_id: Option<i64>, sort: SortKey) -> AppResult<Vec<FileEntry>> {
        let mut query: Vec<(&str, String)> = vec![];
        if let Some(p) = parent_id {
            query.push(("parent_id", p.to_string()));
        }
        // The server only knows name/date; type ordering happens client side.
        let sort_by = match sort {
            SortKey::Date => "date",
            SortKey::Name | SortKey::Type => "name",
        };
        query.push(("sort_by", sort_by.to_string()));

        let resp = self.get("/api/files").query(&query).send().await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn create_folder(&self, name: &str, parent_id: Option<i64>) -> AppResult<FileEntry> {
        let req = CreateFolderRequest { folder_name: name.trim().to_string(), parent_id };
        let resp = self.post("/api/folders").json(&req).send().await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let resp = self.client.delete(self.url(&format!("/api/files/{}", id))).send().await?;
        ensure_success(resp).await?;
        Ok(())
    }
}

/// Passes successful responses through and turns everything else into an
/// `AppError`, preferring the server's `error` field as message.
pub async fn ensure_success(resp: Response) -> AppResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
    Err(AppError::from_status(status.as_u16(), body.error))
}
