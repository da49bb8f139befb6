//! Error types produced by the `tokenizer` crate.
use thiserror::Error;

/// Errors that can occur while loading a vocabulary or chunking text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TokenizerError {
    #[error("vocabulary is empty")]
    EmptyVocabulary,
    #[error("failed to read vocabulary file: {0}")]
    Io(String),
    #[error("no text content to tokenize")]
    NoTextContent,
}

impl From<std::io::Error> for TokenizerError {
    fn from(err: std::io::Error) -> Self {
        TokenizerError::Io(err.to_string())
    }
}
