//! Error types produced by the `orchestrator` crate.
use thiserror::Error;

use archive::ArchiveError;
use extract::ExtractError;
use index::IndexError;
use semantic::SemanticError;
use storage::StorageError;
use tokenizer::TokenizerError;

/// Errors surfaced to orchestrator callers. Aggregates every stage's typed
/// error via `#[from]`, following the teacher's `ServerError` convention of
/// one top-level enum wrapping each pipeline stage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    #[error("archive decode failed: {0}")]
    Archive(#[from] ArchiveError),
    #[error("text extraction failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("tokenization failed: {0}")]
    Tokenizer(#[from] TokenizerError),
    #[error("embedding failed: {0}")]
    Semantic(#[from] SemanticError),
    #[error("index operation failed: {0}")]
    Index(#[from] IndexError),
    #[error("storage I/O failed: {0}")]
    Storage(#[from] StorageError),
    #[error("vocabulary is missing or unreadable: {0}")]
    VocabularyMissing(String),
    #[error("too many ingest requests in flight")]
    Overloaded,
    #[error("ingest was cancelled")]
    Cancelled,
    #[error("page not found: {0}")]
    PageNotFound(String),
}
