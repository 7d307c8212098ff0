//! Error types for nl2sql-console-core

use thiserror::Error;

/// Main error type for the nl2sql-console-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected before any network call was attempted
    #[error("{0}")]
    Validation(String),

    /// Backend rejected the request with a non-success status
    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    /// The request never completed (connect, timeout, decode)
    #[error("request failed: {0}")]
    Http(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for nl2sql-console-core
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The human-readable failure detail handed to the session.
    ///
    /// Backend rejections surface the server's `detail` verbatim; everything
    /// else falls back to the error's display form.
    pub fn detail(&self) -> String {
        match self {
            Error::Api { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}
