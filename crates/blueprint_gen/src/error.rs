//! Error types for the generation pipeline.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for generation operations.
pub type GenResult<T> = Result<T, GenError>;

/// Errors that can occur while generating, parsing or storing a schema.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("LLM not configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY")]
    LlmNotConfigured,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Invalid AI response format")]
    InvalidResponseFormat,

    #[error("A generation cycle is already in flight for this session")]
    Busy,

    #[error("Generation cancelled: session was disposed")]
    Cancelled,

    #[error("Generation phase timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Table is not editable: {0}")]
    NotEditable(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
