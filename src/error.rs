use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

/// Errors that make a whole run meaningless. Anything local to a single batch
/// or media file is a [`FetchError`] and gets recorded instead of propagated.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("bearer token not provided (use --bearer-token or set X_BEARER_TOKEN)")]
    MissingCredential,

    #[error("failed to open {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("column `{column}` not found in header of {}", path.display())]
    Schema { column: String, path: PathBuf },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed response document {}: {source}", path.display())]
    MalformedResponse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("HTTP client setup failed: {0}")]
    Client(#[from] FetchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failure of one unit of work: a batch lookup or a media download.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("write error: {0}")]
    Write(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Api { status: status.as_u16(), message: err.to_string() },
            None => FetchError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Write(err.to_string())
    }
}
