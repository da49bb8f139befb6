//! Packed-binary vector store with brute-force cosine search.
//!
//! One blob per page: an 8-byte `{vector_count: u32, vector_size: u32}`
//! header (little-endian) followed by `vector_count * vector_size * 4` bytes
//! of row-major little-endian float32 values. This is the canonical form;
//! it is small enough and the target corpus (low thousands of pages) is
//! small enough that brute-force search is the correct design, not an
//! optimization placeholder.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::bm25::PassageKey;
use crate::error::IndexError;

const HEADER_SIZE: usize = 8;

/// All embeddings for one page, in `chunk_index` order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageVectors {
    pub vector_size: u32,
    pub vectors: Vec<Vec<f32>>,
}

impl PageVectors {
    pub fn new(vector_size: u32, vectors: Vec<Vec<f32>>) -> Self {
        Self {
            vector_size,
            vectors,
        }
    }

    /// Serializes to the canonical packed-binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let count = self.vectors.len() as u32;
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.vectors.len() * self.vector_size as usize * 4);
        buf.extend_from_slice(&count.to_le_bytes());
        buf.extend_from_slice(&self.vector_size.to_le_bytes());
        for vector in &self.vectors {
            for value in vector {
                buf.extend_from_slice(&value.to_le_bytes());
            }
        }
        buf
    }

    /// Parses the canonical packed-binary form, validating the header
    /// against the actual payload length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() < HEADER_SIZE {
            return Err(IndexError::Corrupt("vector blob shorter than header".into()));
        }
        let count = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let size = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let expected_len = HEADER_SIZE + (count as usize) * (size as usize) * 4;
        if bytes.len() != expected_len {
            return Err(IndexError::Corrupt(format!(
                "vector blob is {} bytes, header declares {count}x{size} ({expected_len} bytes)",
                bytes.len()
            )));
        }

        let mut vectors = Vec::with_capacity(count as usize);
        let mut offset = HEADER_SIZE;
        for _ in 0..count {
            let mut vector = Vec::with_capacity(size as usize);
            for _ in 0..size {
                let value = f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
                vector.push(value);
                offset += 4;
            }
            vectors.push(vector);
        }

        Ok(Self {
            vector_size: size,
            vectors,
        })
    }
}

/// Cosine similarity with a zero-magnitude guard (returns 0.0 instead of
/// dividing by zero).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Process-wide dense vector store, append-only at page granularity.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    pages: HashMap<String, PageVectors>,
}

impl VectorStore {
    pub fn upsert_page(&mut self, page_id: impl Into<String>, vectors: PageVectors) {
        self.pages.insert(page_id.into(), vectors);
    }

    pub fn remove_page(&mut self, page_id: &str) -> Option<PageVectors> {
        self.pages.remove(page_id)
    }

    pub fn get_page(&self, page_id: &str) -> Option<&PageVectors> {
        self.pages.get(page_id)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_ids(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    /// Brute-force cosine search across every passage of every page.
    /// Passages whose vector length disagrees with `query`'s are skipped
    /// and logged rather than failing the whole search.
    pub fn dense_search(&self, query: &[f32], k: usize) -> Vec<(PassageKey, f32)> {
        let mut scored = Vec::new();
        for (page_id, page_vectors) in &self.pages {
            for (chunk_index, vector) in page_vectors.vectors.iter().enumerate() {
                if vector.len() != query.len() {
                    tracing::warn!(
                        page_id = %page_id,
                        chunk_index,
                        expected = query.len(),
                        got = vector.len(),
                        "dense search: dimension mismatch, skipping passage"
                    );
                    continue;
                }
                let similarity = cosine_similarity(query, vector);
                scored.push(((page_id.clone(), chunk_index), similarity));
            }
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        scored
    }
}
