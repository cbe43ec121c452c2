//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Illegal move '{mv}' in position {fen}")]
    IllegalMove { mv: String, fen: String },

    #[error("Invalid EPD line: {0}")]
    InvalidEpd(String),

    #[error("PGN read error: {0}")]
    Pgn(#[from] std::io::Error),
}
