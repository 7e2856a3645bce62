//! Command handlers behind the CLI subcommands.
//!
//! - [`files`]: listing, folder creation and deletion
//! - [`transfers`]: sequential upload and download batches

use std::sync::Arc;

use tracing::level_filters::LevelFilter;

use crate::api::ApiClient;
use crate::cli::{Command, FolderArgs};
use crate::config::{AppConfig, StatusFormat};
use crate::error::AppResult;
use crate::listing::Breadcrumb;
use crate::metrics::Metrics;

pub mod files;
pub mod transfers;

/// Shared state of one CLI invocation.
#[derive(Clone)]
pub struct Context {
    pub api: ApiClient,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    pub status_format: StatusFormat,
}

impl Context {
    pub fn new(config: AppConfig, force_json: bool) -> AppResult<Self> {
        let api = ApiClient::new(&config.api)?;
        let status_format = status_format(&config, force_json);
        Ok(Self { api, config: Arc::new(config), metrics: Metrics::new(), status_format })
    }
}

/// `--json` overrides the configured format.
pub fn status_format(config: &AppConfig, force_json: bool) -> StatusFormat {
    if force_json {
        StatusFormat::Json
    } else {
        config.status.format
    }
}

/// Most verbose level for the stderr log layer. Transfers in text mode draw a
/// `\r`-rewritten line on stderr, so only errors (logged after the batch) get through.
pub fn stderr_log_level(command: &Command, format: StatusFormat) -> LevelFilter {
    let is_transfer = matches!(command, Command::Upload { .. } | Command::Download { .. });
    if is_transfer && format == StatusFormat::Text {
        LevelFilter::ERROR
    } else {
        LevelFilter::TRACE
    }
}

/// `--path` wins over `--parent`; neither means the root folder.
pub async fn resolve_folder(api: &ApiClient, folder: &FolderArgs) -> AppResult<Breadcrumb> {
    match (&folder.path, folder.parent) {
        (Some(path), _) => Breadcrumb::resolve(api, path).await,
        (None, Some(id)) => {
            let mut crumbs = Breadcrumb::default();
            crumbs.push(id, format!("#{}", id));
            Ok(crumbs)
        }
        (None, None) => Ok(Breadcrumb::default()),
    }
}
