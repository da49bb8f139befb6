//! Error types produced by the `archive` crate.
use thiserror::Error;

/// Errors from structured archive parsing. The public [`decode`](crate::decode)
/// entrypoint never surfaces these directly — it falls back to a best-effort
/// scan instead — but they remain useful for anything calling the structured
/// path directly (tests, diagnostics).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ArchiveError {
    #[error("archive container has no text/html part")]
    ArchiveMalformed,
}
