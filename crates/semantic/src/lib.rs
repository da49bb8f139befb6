//! ONNX-backed embedding engine producing pooled dense vectors for passages
//! and queries, plus a deterministic stub for tests that should not depend on
//! a real model.
//!
//! Callers interact with this crate through the [`EmbeddingEngine`] trait so
//! that ranking, storage, and orchestration code can be exercised against
//! [`stub::StubEmbeddingEngine`] without ever loading a model file.

mod cache;
mod config;
mod error;
mod onnx;
pub mod stub;

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokenizer::Vocabulary;

pub use config::SemanticConfig;
pub use error::SemanticError;
pub use stub::StubEmbeddingEngine;

use cache::ModelHandle;

/// Full sequence length (`[CLS]` + content + `[SEP]`) a model accepts when an
/// engine does not override [`EmbeddingEngine::max_sequence_length`].
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 512;

/// Produces a dense vector from a token id sequence, or from raw text via the
/// default [`embed_text`](EmbeddingEngine::embed_text) method.
pub trait EmbeddingEngine: Send + Sync {
    /// Embeds an already-tokenized sequence (expected to include `[CLS]`/
    /// `[SEP]` framing, as produced by [`tokenizer::encode`]).
    fn embed_tokens(&self, token_ids: &[u32]) -> Result<Vec<f32>, SemanticError>;

    /// Output vector width this engine produces.
    fn embedding_dim(&self) -> usize;

    /// Full sequence length, including `[CLS]`/`[SEP]`, this engine's model
    /// accepts. [`embed_text`](EmbeddingEngine::embed_text) truncates to this
    /// bound before embedding.
    fn max_sequence_length(&self) -> usize {
        DEFAULT_MAX_SEQUENCE_LENGTH
    }

    /// Reports whether the engine is ready to serve inference, for
    /// diagnostics such as an orchestrator's `model_ready` stat.
    fn is_ready(&self) -> bool {
        true
    }

    /// Tokenizes `text` against `vocab`, truncates to
    /// [`max_sequence_length`](EmbeddingEngine::max_sequence_length), and
    /// embeds the result.
    fn embed_text(&self, text: &str, vocab: &Vocabulary) -> Result<Vec<f32>, SemanticError> {
        let mut token_ids = tokenizer::encode(text, vocab);
        token_ids.truncate(self.max_sequence_length());
        self.embed_tokens(&token_ids)
    }
}

/// ONNX-backed engine. Holds a lazily-loaded, mutex-serialized model session
/// behind an `Arc` so it can be shared across ingest/search tasks; each call
/// into the model runs on a worker thread so a stuck inference cannot hang
/// the caller past [`SemanticConfig::inference_timeout_ms`].
pub struct OnnxEmbeddingEngine {
    handle: Arc<ModelHandle>,
    config: SemanticConfig,
}

impl OnnxEmbeddingEngine {
    /// Loads the model named by `config.model_path`.
    ///
    /// Returns [`SemanticError::ModelUnavailable`] if the file does not
    /// exist; this is the path the orchestrator is expected to surface as a
    /// startup failure rather than a per-request one.
    pub fn load(config: SemanticConfig) -> Result<Self, SemanticError> {
        let handle = ModelHandle::load(&config.model_path)?;
        Ok(Self {
            handle: Arc::new(handle),
            config,
        })
    }
}

impl EmbeddingEngine for OnnxEmbeddingEngine {
    fn embed_tokens(&self, token_ids: &[u32]) -> Result<Vec<f32>, SemanticError> {
        let handle = Arc::clone(&self.handle);
        let token_ids = token_ids.to_vec();
        let embedding_dim = self.config.embedding_dim;
        let timeout_ms = self.config.inference_timeout_ms;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = onnx::run_inference(&handle, &token_ids, embedding_dim);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(Duration::from_millis(timeout_ms)) {
            Ok(result) => result,
            Err(_) => Err(SemanticError::InferenceTimeout(timeout_ms)),
        }
    }

    fn embedding_dim(&self) -> usize {
        self.config.embedding_dim
    }

    fn max_sequence_length(&self) -> usize {
        self.config.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_file_is_model_unavailable() {
        let config = SemanticConfig {
            model_path: "/nonexistent/path/to/model.onnx".into(),
            ..SemanticConfig::default()
        };
        let err = OnnxEmbeddingEngine::load(config).unwrap_err();
        assert!(matches!(err, SemanticError::ModelUnavailable(_)));
    }

    #[test]
    fn stub_engine_satisfies_embed_text() {
        let vocab = Vocabulary::from_tokens(
            vec!["[UNK]", "[CLS]", "[SEP]", "hello", "world"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
        .unwrap();
        let engine = StubEmbeddingEngine::new(16);
        let v = engine.embed_text("hello world", &vocab).unwrap();
        assert_eq!(v.len(), 16);
    }

    /// Records the length of whatever token sequence it was asked to embed,
    /// so tests can check truncation without a real model.
    struct LengthRecordingEngine {
        seen_len: std::cell::Cell<usize>,
        max_sequence_length: usize,
    }

    impl EmbeddingEngine for LengthRecordingEngine {
        fn embed_tokens(&self, token_ids: &[u32]) -> Result<Vec<f32>, SemanticError> {
            self.seen_len.set(token_ids.len());
            Ok(vec![0.0; 4])
        }

        fn embedding_dim(&self) -> usize {
            4
        }

        fn max_sequence_length(&self) -> usize {
            self.max_sequence_length
        }
    }

    #[test]
    fn embed_text_truncates_to_max_sequence_length() {
        let mut tokens: Vec<String> = vec!["[UNK]", "[CLS]", "[SEP]"]
            .into_iter()
            .map(str::to_string)
            .collect();
        for n in 0..100 {
            tokens.push(format!("tok{n}"));
        }
        let vocab = Vocabulary::from_tokens(tokens).unwrap();
        let long_text = (0..100).map(|n| format!("tok{n}")).collect::<Vec<_>>().join(" ");

        let engine = LengthRecordingEngine {
            seen_len: std::cell::Cell::new(0),
            max_sequence_length: 8,
        };
        engine.embed_text(&long_text, &vocab).unwrap();
        assert_eq!(engine.seen_len.get(), 8);
    }

    #[test]
    fn embed_text_passes_short_sequences_through_unchanged() {
        let vocab = Vocabulary::from_tokens(
            vec!["[UNK]", "[CLS]", "[SEP]", "hello", "world"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
        .unwrap();
        let engine = LengthRecordingEngine {
            seen_len: std::cell::Cell::new(0),
            max_sequence_length: 512,
        };
        let token_ids = tokenizer::encode("hello world", &vocab);
        engine.embed_text("hello world", &vocab).unwrap();
        assert_eq!(engine.seen_len.get(), token_ids.len());
    }

    #[test]
    fn default_is_ready_is_true_for_stub_engine() {
        let engine = StubEmbeddingEngine::new(8);
        assert!(engine.is_ready());
    }
}
