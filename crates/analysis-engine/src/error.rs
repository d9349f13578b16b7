//! Engine error types

use chess_core::position::BoardError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No analysis engine available: {0}")]
    Unavailable(String),

    #[error("Engine failure: {0}")]
    Failure(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Illegal move {uci} in position {fen}")]
    IllegalMove { uci: String, fen: String },

    #[error("Analysis task failed: {0}")]
    Task(String),
}

impl From<BoardError> for EngineError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::IllegalMove { uci, fen } => EngineError::IllegalMove { uci, fen },
            BoardError::InvalidUci(uci) => EngineError::IllegalMove {
                uci,
                fen: String::new(),
            },
            other => EngineError::InvalidPosition(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        EngineError::Task(err.to_string())
    }
}
