use std::error::Error;
use std::fmt;

/// Failure of a single transfer. Any of these aborts the remaining batch.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Network failure or a response body that could not be read/parsed.
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Local file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The primary error type for everything outside a running batch.
///
/// API calls, configuration, path resolution and user input all end up here.
#[derive(Debug)]
pub enum AppError {
    /// Unexpected failures that carry their own context.
    Internal(anyhow::Error),
    /// The server or a local lookup could not find the requested item.
    NotFound(String),
    /// The server refused the operation (HTTP 403).
    Forbidden(String),
    /// Any other non-success answer from the REST API.
    Api {
        /// HTTP status code.
        status: u16,
        /// Server supplied `error` field, or a generic description.
        message: String,
    },
    /// Network failure before a response arrived.
    Network(String),
    /// For when user input is invalid.
    InvalidInput(String),
    /// For errors related to I/O operations.
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Permission denied: {}", msg),
            AppError::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl AppError {
    /// Maps a non-success HTTP status and the server's `error` field to an error.
    pub fn from_status(status: u16, server_message: Option<String>) -> Self {
        match status {
            403 => AppError::Forbidden(
                server_message.unwrap_or_else(|| "you are not allowed to modify this item".to_string()),
            ),
            404 => AppError::NotFound(server_message.unwrap_or_else(|| "item not found".to_string())),
            _ => AppError::Api {
                status,
                message: server_message.unwrap_or_else(|| format!("HTTP error! status: {}", status)),
            },
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => AppError::from_status(status.as_u16(), None),
            None if err.is_decode() => AppError::Network(format!("malformed response: {}", err)),
            None => AppError::Network(err.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(format!("{}: {}", err.kind(), err))
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// An extension trait for `Option` that provides a convenient way to convert
/// an `Option` to a `Result` with a `NotFound` error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, AppError>`.
    ///
    /// # Arguments
    ///
    /// * `entity` - A string describing the entity that was not found.
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(format!("{} not found", entity)))
    }
}

/// Helpers for validating command-line input before any request is sent.
pub mod validation {
    use super::*;
    use std::path::Path;

    /// Rejects empty names and names containing path separators or null characters.
    pub fn validate_folder_name(name: &str) -> AppResult<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidInput("Folder name is required".to_string()));
        }
        if trimmed.contains('\0') || trimmed.contains('/') || trimmed.contains('\\') {
            return Err(AppError::InvalidInput(format!("Invalid folder name: {}", name)));
        }
        Ok(())
    }

    /// Validates that a list of local paths exist before a batch is started.
    pub fn validate_paths_exist(paths: &[String]) -> AppResult<()> {
        for path_str in paths {
            let path = Path::new(path_str);
            if !path.exists() {
                return Err(AppError::NotFound(format!("Path does not exist: {}", path_str)));
            }
        }
        Ok(())
    }
}
