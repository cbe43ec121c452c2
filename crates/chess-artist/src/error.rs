//! Annotator error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtistError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start engine '{path}': {source}")]
    EngineSpawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine protocol error: {0}")]
    EngineProtocol(String),

    #[error("Invalid engine option: {0}")]
    InvalidOption(String),

    #[error("Engine is no longer running")]
    EngineGone,

    #[error("Opening book error: {0}")]
    Book(String),

    #[error(transparent)]
    Core(#[from] chess_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArtistError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        ArtistError::EngineProtocol(msg.into())
    }
}
