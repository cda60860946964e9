// Error types for the turn core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can escape the turn core
///
/// Backend tool failures deliberately do NOT appear here: they are
/// classified by `DispatchError` and fed back into the model as structured
/// tool results.
#[derive(Debug, Error)]
pub enum AgentError {
    /// LLM provider call failed or returned an unusable response
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The per-turn wall-clock deadline elapsed
    #[error("Turn deadline exceeded")]
    DeadlineExceeded,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AgentError {
    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        AgentError::Llm(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        AgentError::Configuration(msg.into())
    }
}
