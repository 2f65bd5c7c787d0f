//! Core Error Types
//!
//! Errors shared by the scheduler and the output readers. Only `thiserror`
//! and `serde_json` are needed here; YAML and TOML failures are folded into
//! [`CoreError::Parse`] by the application crate.

use thiserror::Error;

/// Errors raised while scheduling a batch or reading tool output.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration file contents
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON diagnostic arrays
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected batch input, e.g. a zero concurrency bound
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing artifact or config file
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed tool output
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
