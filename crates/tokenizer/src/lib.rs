//! Deterministic WordPiece tokenization and token-aligned passage chunking.
//!
//! This crate owns the two pieces of the pipeline with an exact, testable
//! algorithmic contract: turning text into BERT-style subword ids against a
//! fixed vocabulary, and slicing a document's token stream into overlapping,
//! model-sized passages with exact-token overlap between neighbors.
//!
//! Nothing here talks to a model or to disk beyond loading the vocabulary
//! file; both `encode` and `chunk` are pure functions of their inputs.

mod chunker;
mod error;
mod vocab;
mod wordpiece;

pub use chunker::{ChunkedPassage, Chunker, ChunkerConfig};
pub use error::TokenizerError;
pub use vocab::{Vocabulary, DEFAULT_CLS_ID, DEFAULT_SEP_ID, DEFAULT_UNK_ID};
pub use wordpiece::{encode, encode_content};
