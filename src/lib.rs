//! Workspace umbrella crate for `webindex`, a local, privacy-preserving
//! semantic search index over captured web pages.
//!
//! `webindex` re-exports the archive, extraction, tokenization, embedding,
//! indexing, retrieval, storage, and orchestration layers so applications
//! can drive the full pipeline through a single dependency, the way the
//! `webindex` CLI binary does. [`open`] is the one entry point most callers
//! need: it loads the vocabulary and embedding model named by a
//! [`config::WebIndexConfig`] and returns a ready
//! [`Orchestrator`](orchestrator::Orchestrator).
//!
//! ## Quick start
//!
//! ```ignore
//! use webindex::config::WebIndexConfig;
//! use webindex::{open, CancelToken};
//!
//! # async fn demo() -> Result<(), webindex::WebIndexError> {
//! let config = WebIndexConfig::from_file("webindex.yaml")?;
//! let engine = webindex::open(config)?;
//!
//! let page = engine
//!     .ingest(&archive_bytes, "https://example.com/post", None, 1_700_000_000_000, &CancelToken::new())
//!     .await?;
//! let hits = engine.search("example query", 10, retriever::SearchMode::Hybrid).await?;
//! # Ok(())
//! # }
//! # let archive_bytes: Vec<u8> = vec![];
//! ```
//!
//! ## Errors
//!
//! Failures from any layer converge on [`WebIndexError`], which distinguishes
//! startup failures (vocabulary or model provisioning) from the pipeline's
//! own [`OrchestratorError`].

pub use archive::{ArchiveError, DecodedArchive};
pub use extract::{ExtractError, ExtractedPage};
pub use index::{BM25Config, IndexError, PageVectors, VectorStore};
pub use orchestrator::{
    CancelToken, Orchestrator, OrchestratorConfig, OrchestratorError, ScoredHit, StateSnapshot,
    Stats,
};
pub use retriever::{reciprocal_rank_fusion, SearchMode};
pub use semantic::{EmbeddingEngine, OnnxEmbeddingEngine, SemanticConfig, SemanticError};
pub use storage::{PageRecord, StorageError};
pub use tokenizer::{ChunkedPassage, Chunker, ChunkerConfig, TokenizerError, Vocabulary};

pub mod config;

use std::fmt;

use config::WebIndexConfig;

/// Errors that can occur while provisioning the engine from a
/// [`WebIndexConfig`], before any ingest or search call has happened.
#[derive(Debug)]
pub enum WebIndexError {
    Vocabulary(TokenizerError),
    Model(SemanticError),
    Orchestrator(OrchestratorError),
}

impl fmt::Display for WebIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebIndexError::Vocabulary(err) => write!(f, "failed to load vocabulary: {err}"),
            WebIndexError::Model(err) => write!(f, "failed to load embedding model: {err}"),
            WebIndexError::Orchestrator(err) => write!(f, "orchestrator startup failed: {err}"),
        }
    }
}

impl std::error::Error for WebIndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WebIndexError::Vocabulary(err) => Some(err),
            WebIndexError::Model(err) => Some(err),
            WebIndexError::Orchestrator(err) => Some(err),
        }
    }
}

impl From<TokenizerError> for WebIndexError {
    fn from(value: TokenizerError) -> Self {
        WebIndexError::Vocabulary(value)
    }
}

impl From<SemanticError> for WebIndexError {
    fn from(value: SemanticError) -> Self {
        WebIndexError::Model(value)
    }
}

impl From<OrchestratorError> for WebIndexError {
    fn from(value: OrchestratorError) -> Self {
        WebIndexError::Orchestrator(value)
    }
}

/// Loads the vocabulary and ONNX embedding model named by `config` and opens
/// an [`Orchestrator`] over `config.data_root`, reaping orphaned blobs and
/// reconciling the inverted index against `pages.meta` along the way.
pub fn open(config: WebIndexConfig) -> Result<Orchestrator<OnnxEmbeddingEngine>, WebIndexError> {
    let vocab = Vocabulary::load(&config.vocab_path)?;
    let embedding = OnnxEmbeddingEngine::load(config.semantic.clone())?;
    let chunker_config: ChunkerConfig = config.chunker.into();

    let orchestrator = Orchestrator::open(
        config.data_root,
        vocab,
        chunker_config,
        embedding,
        config.orchestrator,
        config.bm25,
    )?;
    Ok(orchestrator)
}
