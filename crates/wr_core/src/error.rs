use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Browser(String),
}

/// Coarse failure category used when deciding what a failed fetch means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network unreachable, connection reset, timeout.
    Transport,
    /// The response arrived but did not have the expected shape.
    Decode,
    Other,
}

impl Error {
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Http(e) if e.is_decode() => FailureKind::Decode,
            Error::Http(_) | Error::Timeout(_) => FailureKind::Transport,
            Error::Decode(_) | Error::Serialization(_) => FailureKind::Decode,
            _ => FailureKind::Other,
        }
    }

    pub fn missing(field: &str) -> Self {
        Error::Decode(format!("missing field `{}`", field))
    }
}
