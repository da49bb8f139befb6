//! On-disk shapes for `pages.meta` and the chunk files.
//!
//! The inverted index and vector blob shapes live in the `index` crate
//! ([`index::InvertedIndexFile`], [`index::PageVectors`]); this module owns
//! the two formats specific to the storage layer itself.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use tokenizer::ChunkedPassage;

/// Current on-disk shape of a `pages.meta` record. Bumped whenever a
/// released field layout changes so an older data directory can be migrated
/// instead of silently misread.
pub const PAGE_SCHEMA_VERSION: u16 = 1;

fn default_schema_version() -> u16 {
    PAGE_SCHEMA_VERSION
}

/// One page's entry inside `pages.meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub url: String,
    pub title: String,
    /// Unix epoch milliseconds.
    pub timestamp: u64,
    pub chunk_count: usize,
    pub dimensions: usize,
}

/// The full contents of `pages.meta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagesMetaFile {
    pub pages: HashMap<String, PageRecord>,
    pub url_index: HashMap<String, String>,
}

impl PagesMetaFile {
    pub fn page_id_for_url(&self, url: &str) -> Option<&str> {
        self.url_index.get(url).map(String::as_str)
    }

    pub fn insert(&mut self, page_id: String, record: PageRecord) {
        self.url_index.insert(record.url.clone(), page_id.clone());
        self.pages.insert(page_id, record);
    }

    pub fn remove(&mut self, page_id: &str) -> Option<PageRecord> {
        let record = self.pages.remove(page_id)?;
        self.url_index.remove(&record.url);
        Some(record)
    }
}

/// A passage as persisted in `chunks/{page_id}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPassage {
    pub id: String,
    pub tokens: Vec<u32>,
    pub token_count: usize,
    pub text: String,
    pub start_token_index: usize,
    pub end_token_index: usize,
}

impl From<&ChunkedPassage> for PersistedPassage {
    fn from(passage: &ChunkedPassage) -> Self {
        Self {
            id: format!("chunk_{}", passage.chunk_index),
            tokens: passage.token_ids.clone(),
            token_count: passage.token_count,
            text: passage.text.clone(),
            start_token_index: passage.start_token_index,
            end_token_index: passage.end_token_index,
        }
    }
}
