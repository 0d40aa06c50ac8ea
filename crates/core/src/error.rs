//! Error types for Spark.
//!
//! One enum covers every failure category in the workspace. Policy outcomes
//! (a question being unsafe or a diagnosis request) are not errors and never
//! appear here.

use thiserror::Error;

/// Unified error type for Spark.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Invalid safety or tone policy (bad pattern, conflicting replacements)
    #[error("Policy error: {0}")]
    Policy(String),

    /// The retrieval/generation engine failed or timed out.
    ///
    /// Never converted into an answer string and never cached.
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether this error came from the generation engine.
    pub fn is_engine_unavailable(&self) -> bool {
        matches!(self, AppError::EngineUnavailable(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
