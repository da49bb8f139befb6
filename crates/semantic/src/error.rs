//! Error types produced by the `semantic` crate.
use thiserror::Error;

#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum SemanticError {
    #[error("model resource unavailable: {0}")]
    ModelUnavailable(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("inference timed out after {0}ms")]
    InferenceTimeout(u64),
}
