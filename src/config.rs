use serde::Deserialize;

use crate::listing::{SortDirection, SortKey, ViewMode};

const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Raw `Cookie` header value of an already authenticated session. Empty means none.
    pub session_cookie: String,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    pub sort: SortKey,
    pub order: SortDirection,
    pub view: ViewMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    pub format: StatusFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub dir: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub transfer: TransferConfig,
    pub listing: ListingConfig,
    pub status: StatusConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

impl ApiConfig {
    pub fn session_cookie(&self) -> Option<&str> {
        let c = self.session_cookie.trim();
        if c.is_empty() {
            None
        } else {
            Some(c)
        }
    }
}

/// Loads the layered configuration: embedded defaults, `filedeck.toml`, an explicit
/// file (argument or `FILEDECK_CONFIG`), then `FILEDECK__*` environment variables.
pub fn load(explicit_path: Option<&str>) -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: filedeck.toml (in CWD)
        .add_source(::config::File::with_name("filedeck").required(false));

    if let Ok(custom_path) = std::env::var("FILEDECK_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    if let Some(path) = explicit_path {
        builder = builder.add_source(::config::File::with_name(path).required(true));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("FILEDECK").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // API
    let url = cfg.api.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(anyhow::anyhow!("invalid api.base_url: {}", cfg.api.base_url));
    }
    if cfg.api.connect_timeout_secs == 0 {
        return Err(anyhow::anyhow!("api.connect_timeout_secs must be > 0"));
    }

    // Transfer
    if cfg.transfer.chunk_size == 0 {
        return Err(anyhow::anyhow!("transfer.chunk_size must be > 0"));
    }
    if cfg.transfer.chunk_size > MAX_CHUNK_SIZE {
        return Err(anyhow::anyhow!("transfer.chunk_size must be <= {}", MAX_CHUNK_SIZE));
    }

    // Logging
    if cfg.logging.dir.trim().is_empty() {
        return Err(anyhow::anyhow!("logging.dir must not be empty"));
    }

    Ok(())
}
