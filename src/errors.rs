//! Errors for the vessel viewer
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiasViewerError {
    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    ConfigurationError { message: String },

    #[error("HTTP client error")]
    HttpClientError(#[from] reqwest::Error),

    #[cfg(feature = "browser")]
    #[error("Browser error")]
    BrowserError(#[from] chromiumoxide::error::CdpError),

    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("CSV error")]
    CsvError(#[from] csv::Error),

    #[error("IO error")]
    IoError(#[from] std::io::Error),
}

/// Failure of a single tile request.
///
/// Never escalated past the aggregator: a failed tile contributes zero rows.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request to {url} failed: {origin}")]
    Transport { url: String, origin: String },

    #[error("Invalid JSON from {url}: {origin}")]
    InvalidJson { url: String, origin: String },
}

impl FetchError {
    /// Observed HTTP status, `None` when no response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::InvalidJson { .. } => Some(200),
            FetchError::Timeout { .. } | FetchError::Transport { .. } => None,
        }
    }

    /// Status for log lines, "no response" when nothing came back
    pub fn status_label(&self) -> String {
        match self.status() {
            Some(status) => status.to_string(),
            None => "no response".to_string(),
        }
    }
}

/// Structural mismatch in a tile payload.
///
/// Only seen inside the flattener, which degrades it to an empty table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlattenError {
    #[error("Payload is not tabular")]
    NotTabular,

    #[error("Row {index} of column {column} is not an object")]
    MalformedRow { column: String, index: usize },
}
