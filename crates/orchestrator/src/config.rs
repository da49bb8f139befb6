//! Orchestrator-level tunables. One field per option named in the external
//! interfaces table; the root `webindex` binary loads this (and every other
//! crate's config struct) from one YAML document and hands each block to its
//! owning crate.

use serde::{Deserialize, Serialize};

use retriever::SearchMode;

/// Runtime configuration for the [`crate::Orchestrator`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorConfig {
    /// Ingest automatically on capture notification. The orchestrator itself
    /// is notification-agnostic (out of scope, §1); this flag is surfaced for
    /// the CLI/caller to read, not enforced here.
    pub auto_indexing: bool,
    pub default_search_limit: usize,
    pub search_mode: SearchMode,
    pub rrf_constant: u32,
    pub per_mode_candidates: usize,
    /// Bound on concurrently in-flight ingest tasks before `Overloaded`.
    pub max_concurrent_ingests: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            auto_indexing: true,
            default_search_limit: 10,
            search_mode: SearchMode::Hybrid,
            rrf_constant: retriever::DEFAULT_RRF_CONSTANT,
            per_mode_candidates: retriever::DEFAULT_PER_MODE_CANDIDATES,
            max_concurrent_ingests: 4,
        }
    }
}
