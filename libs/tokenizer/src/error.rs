//! Error type for tokenizer operations

use thiserror::Error;

/// Errors surfaced by configuration checks and artifact persistence.
///
/// Training, encoding and decoding never fail: unknown symbols and ids are
/// resolved by substitution or elision instead.
#[derive(Error, Debug)]
pub enum TokenizerError {
    /// Reading or writing an artifact failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The document is not valid JSON for the artifact layout
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The document parsed but breaks the artifact contract
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),
    /// Configuration rejected by validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TokenizerError>;
