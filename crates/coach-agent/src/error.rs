//! Lesson generation error types

use analysis_engine::EngineError;
use chess_core::pgn::PgnError;
use thiserror::Error;

/// Terminal errors for one lesson run.
#[derive(Error, Debug)]
pub enum LessonError {
    #[error("Invalid game: {0}")]
    InvalidGame(#[from] PgnError),

    #[error("Lesson generation failed: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ServiceError> for LessonError {
    fn from(err: ServiceError) -> Self {
        LessonError::Generation(err.to_string())
    }
}

/// A single tool call failed. Reported back to the model, never fatal.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("target_rating {0} is outside 800-2800")]
    RatingOutOfRange(u32),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors talking to the language-model service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited after {0} attempts")]
    RateLimited(u32),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
}
