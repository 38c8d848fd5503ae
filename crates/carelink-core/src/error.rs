//! Error types for Carelink

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("handshake failed in state {state}: {message}")]
    Handshake { state: String, message: String },

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn handshake(state: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handshake {
            state: state.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}
