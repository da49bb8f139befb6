//! YAML configuration file support for `webindex`.
//!
//! Loads every stage's configuration from a single YAML document and hands
//! each block to its owning crate, so the binary never constructs a stage
//! config field-by-field.
//!
//! ## Example YAML configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! data_root: "./data"
//! vocab_path: "./models/webindex-embed/vocab.txt"
//!
//! chunker:
//!   max_content_tokens: 510
//!   overlap: 50
//!
//! semantic:
//!   model_path: "./models/webindex-embed/model.onnx"
//!   embedding_dim: 384
//!   chunk_size: 512
//!   inference_timeout_ms: 30000
//!
//! bm25:
//!   k1: 1.2
//!   b: 0.75
//!
//! orchestrator:
//!   auto_indexing: true
//!   default_search_limit: 10
//!   search_mode: hybrid
//!   rrf_constant: 60
//!   per_mode_candidates: 50
//!   max_concurrent_ingests: 4
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use index::BM25Config;
use orchestrator::OrchestratorConfig;
use semantic::SemanticConfig;
use tokenizer::ChunkerConfig;

/// Errors that can occur when loading a YAML configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebIndexConfig {
    /// Configuration format version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Directory holding `pages.meta`, `chunks/`, `vectors/`, `index/`.
    pub data_root: PathBuf,

    /// Path to the newline-delimited WordPiece vocabulary file.
    pub vocab_path: PathBuf,

    #[serde(default)]
    pub chunker: ChunkerYamlConfig,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub bm25: BM25Config,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl WebIndexConfig {
    /// Loads a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parses a YAML configuration document from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: WebIndexConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if self.orchestrator.max_concurrent_ingests == 0 {
            return Err(ConfigLoadError::Validation(
                "orchestrator.max_concurrent_ingests must be >= 1".to_string(),
            ));
        }
        if self.chunker.overlap >= self.chunker.max_content_tokens {
            return Err(ConfigLoadError::Validation(
                "chunker.overlap must be smaller than chunker.max_content_tokens".to_string(),
            ));
        }
        if self.bm25.k1 < 0.0 || self.bm25.b < 0.0 || self.bm25.b > 1.0 {
            return Err(ConfigLoadError::Validation(
                "bm25.k1 must be >= 0 and bm25.b must be within [0, 1]".to_string(),
            ));
        }

        Ok(())
    }
}

/// Chunking parameters as they appear in the YAML document; converted to a
/// [`ChunkerConfig`] once loaded (the domain type itself carries no serde
/// impl, since it is a pure in-memory value the tokenizer crate owns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerYamlConfig {
    pub max_content_tokens: usize,
    pub overlap: usize,
}

impl Default for ChunkerYamlConfig {
    fn default() -> Self {
        let default = ChunkerConfig::default();
        Self {
            max_content_tokens: default.max_content_tokens,
            overlap: default.overlap,
        }
    }
}

impl From<ChunkerYamlConfig> for ChunkerConfig {
    fn from(value: ChunkerYamlConfig) -> Self {
        ChunkerConfig::new(value.max_content_tokens, value.overlap)
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
