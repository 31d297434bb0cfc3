//! Error types for the camera client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CamError {
    /// No camera answered the SSDP search, or its description was unusable.
    #[error("Discovery: {0}")]
    Discovery(String),

    #[error("Transport: {0}")]
    Transport(String),

    /// Malformed reply, or a reply carrying an `error` field.
    #[error("Protocol: {0}")]
    Protocol(String),

    #[error("Auth: {0}")]
    Auth(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config: {0}")]
    Config(String),
}

impl From<reqwest::Error> for CamError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for CamError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CamError>;
