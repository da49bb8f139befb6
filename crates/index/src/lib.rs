//! Lexical and dense retrieval structures over passages.
//!
//! Two independent indexes share a passage-key space (`(page_id,
//! chunk_index)`) but know nothing of each other: [`bm25`] is a term
//! postings index, [`vectors`] is a brute-force cosine vector store. Fusing
//! their rankings is the `retriever` crate's job.

pub mod bm25;
mod error;
pub mod vectors;

pub use bm25::{BM25Config, InvertedIndex, InvertedIndexFile, PassageKey, Posting};
pub use error::IndexError;
pub use vectors::{cosine_similarity, PageVectors, VectorStore};
