use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Runtime configuration for the embedding engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticConfig {
    /// Path to the provisioned ONNX model file.
    pub model_path: PathBuf,
    /// Output vector width. Fixed at 384 for the shipped model.
    pub embedding_dim: usize,
    /// Full sequence length the model accepts, including `[CLS]`/`[SEP]`.
    pub chunk_size: usize,
    /// Per-inference deadline; expiry surfaces as
    /// [`SemanticError::InferenceTimeout`](crate::SemanticError::InferenceTimeout).
    pub inference_timeout_ms: u64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/webindex-embed/model.onnx"),
            embedding_dim: 384,
            chunk_size: 512,
            inference_timeout_ms: 30_000,
        }
    }
}
