//! Deterministic stand-in for [`OnnxEmbeddingEngine`](crate::OnnxEmbeddingEngine).
//!
//! Tests that exercise ranking, chunk fan-out, or storage round-trips care
//! about the *pipeline*, not about what a real model would score a passage.
//! Pinning them to live floats from an actual ONNX model would make them
//! flaky across model revisions and slow for no benefit: this engine produces
//! the same vector for the same token ids every time, with no I/O and no
//! model file on disk.

use crate::error::SemanticError;

/// Produces a deterministic unit-ish vector from a token id sequence.
///
/// The only property callers may rely on is: same `token_ids` and
/// `embedding_dim` always produce the same output, and different inputs
/// produce (with overwhelming likelihood) different output. The values carry
/// no semantic meaning.
pub fn stub_embed(token_ids: &[u32], embedding_dim: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; embedding_dim];
    if token_ids.is_empty() {
        return out;
    }

    for (pos, &id) in token_ids.iter().enumerate() {
        let weight = (id as f32 + 1.0) * (pos as f32 + 1.0);
        for (d, slot) in out.iter_mut().enumerate() {
            let phase = weight + (d as f32 + 1.0) * 0.173;
            *slot += phase.sin();
        }
    }

    let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in out.iter_mut() {
            *v /= norm;
        }
    }
    out
}

/// A fixed-dimension, model-free [`EmbeddingEngine`](crate::EmbeddingEngine).
#[derive(Debug, Clone, Copy)]
pub struct StubEmbeddingEngine {
    embedding_dim: usize,
}

impl StubEmbeddingEngine {
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }
}

impl Default for StubEmbeddingEngine {
    fn default() -> Self {
        Self::new(384)
    }
}

impl crate::EmbeddingEngine for StubEmbeddingEngine {
    fn embed_tokens(&self, token_ids: &[u32]) -> Result<Vec<f32>, SemanticError> {
        if token_ids.is_empty() {
            return Err(SemanticError::InferenceFailed(
                "cannot embed an empty token sequence".into(),
            ));
        }
        Ok(stub_embed(token_ids, self.embedding_dim))
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmbeddingEngine;

    #[test]
    fn same_input_same_output() {
        let a = stub_embed(&[101, 42, 7, 102], 16);
        let b = stub_embed(&[101, 42, 7, 102], 16);
        assert_eq!(a, b);
    }

    #[test]
    fn different_tokens_differ() {
        let a = stub_embed(&[101, 42, 102], 16);
        let b = stub_embed(&[101, 43, 102], 16);
        assert_ne!(a, b);
    }

    #[test]
    fn output_is_unit_normalized() {
        let v = stub_embed(&[5, 6, 7], 32);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn engine_rejects_empty_token_sequence() {
        let engine = StubEmbeddingEngine::new(8);
        assert!(engine.embed_tokens(&[]).is_err());
    }

    #[test]
    fn engine_reports_its_dimension() {
        let engine = StubEmbeddingEngine::new(384);
        assert_eq!(engine.embedding_dim(), 384);
    }
}
