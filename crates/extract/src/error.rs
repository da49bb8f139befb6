//! Error types produced by the `extract` crate.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExtractError {
    #[error("no text content found in document")]
    NoTextContent,
}
