//! Okapi BM25 lexical index over passages.
//!
//! Tokenization here is deliberately separate from WordPiece: it is a sparse,
//! surface-level vocabulary tuned for exact-term matching, not a subword
//! scheme shared with the embedding path.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Uniquely identifies a passage within the whole index.
pub type PassageKey = (String, usize);

/// Okapi BM25 tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BM25Config {
    pub k1: f32,
    pub b: f32,
}

impl Default for BM25Config {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// One occurrence record of a term in a single passage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Posting {
    pub page_id: String,
    pub chunk_index: usize,
    pub term_freq: u32,
    pub positions: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermPostings {
    pub term: String,
    pub postings: Vec<Posting>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermDocFreq {
    pub term: String,
    pub freq: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocLength {
    pub doc_key: String,
    pub length: u32,
}

/// The on-disk shape of the inverted index file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvertedIndexFile {
    pub inverted_index: Vec<TermPostings>,
    pub document_frequency: Vec<TermDocFreq>,
    pub document_lengths: Vec<DocLength>,
    pub average_document_length: f32,
    pub total_documents: u32,
}

/// Splits text into BM25 surface terms: lowercase, non-word characters
/// become spaces, whitespace-split, terms of length <= 2 are dropped.
pub fn bm25_tokenize(text: &str) -> Vec<String> {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .filter(|t| t.len() > 2)
        .map(str::to_string)
        .collect()
}

fn doc_key(key: &PassageKey) -> String {
    format!("{}:{}", key.0, key.1)
}

fn parse_doc_key(s: &str) -> Option<PassageKey> {
    let (page_id, idx) = s.rsplit_once(':')?;
    idx.parse::<usize>().ok().map(|i| (page_id.to_string(), i))
}

fn idf(total_docs: f32, doc_freq: f32) -> f32 {
    ((total_docs - doc_freq + 0.5) / (doc_freq + 0.5) + 1.0).ln()
}

fn tf_component(tf: f32, doc_len: f32, avg_doc_len: f32, k1: f32, b: f32) -> f32 {
    let norm = 1.0 - b + b * if avg_doc_len > 0.0 { doc_len / avg_doc_len } else { 0.0 };
    tf * (k1 + 1.0) / (tf + k1 * norm)
}

/// Process-wide BM25 postings index. Readers may run concurrently with each
/// other; mutation (insert/delete) requires exclusive access enforced by the
/// caller (the orchestrator takes a writer lock around these calls).
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>,
    doc_freq: HashMap<String, u32>,
    doc_len: HashMap<PassageKey, u32>,
    /// Passages in the order they were first indexed; doubles as the BM25
    /// stable tiebreak rank and as the persisted `document_lengths` order.
    doc_order: Vec<PassageKey>,
    rank: HashMap<PassageKey, usize>,
    total_token_count: u64,
    config: BM25Config,
}

impl InvertedIndex {
    pub fn new(config: BM25Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn total_docs(&self) -> u32 {
        self.doc_len.len() as u32
    }

    pub fn avg_doc_len(&self) -> f32 {
        if self.doc_len.is_empty() {
            0.0
        } else {
            self.total_token_count as f32 / self.doc_len.len() as f32
        }
    }

    /// Indexes one passage's BM25 token stream. Idempotent only in the sense
    /// that calling it twice for the same key double-counts; callers must not
    /// re-index a passage without first deleting its page.
    pub fn insert_passage(&mut self, page_id: &str, chunk_index: usize, text: &str) {
        let terms = bm25_tokenize(text);
        let key: PassageKey = (page_id.to_string(), chunk_index);
        let doc_len = terms.len() as u32;

        let mut grouped: HashMap<String, Vec<u32>> = HashMap::new();
        for (pos, term) in terms.into_iter().enumerate() {
            grouped.entry(term).or_default().push(pos as u32);
        }

        for (term, positions) in grouped {
            let posting = Posting {
                page_id: page_id.to_string(),
                chunk_index,
                term_freq: positions.len() as u32,
                positions,
            };
            self.postings.entry(term.clone()).or_default().push(posting);
            *self.doc_freq.entry(term).or_insert(0) += 1;
        }

        self.doc_len.insert(key.clone(), doc_len);
        self.total_token_count += doc_len as u64;
        self.rank.insert(key.clone(), self.doc_order.len());
        self.doc_order.push(key);
    }

    /// Removes postings for any page not present in `valid_page_ids`. Used at
    /// startup to prune index entries that survived a crash between the
    /// index persist step and the `pages.meta` update (spec's atomicity
    /// discipline: `pages.meta` is written last, so its keys are the source
    /// of truth for what actually exists).
    pub fn prune_missing_pages(&mut self, valid_page_ids: &std::collections::HashSet<String>) {
        let stale: std::collections::HashSet<String> = self
            .doc_order
            .iter()
            .map(|(page_id, _)| page_id.clone())
            .filter(|page_id| !valid_page_ids.contains(page_id))
            .collect();
        for page_id in stale {
            self.delete_page(&page_id);
        }
    }

    /// Removes every passage of `page_id`, reversing the postings/doc_freq
    /// updates those passages made on insert.
    pub fn delete_page(&mut self, page_id: &str) {
        let removed_keys: Vec<PassageKey> = self
            .doc_len
            .keys()
            .filter(|k| k.0 == page_id)
            .cloned()
            .collect();

        for key in &removed_keys {
            if let Some(len) = self.doc_len.remove(key) {
                self.total_token_count -= len as u64;
            }
            self.rank.remove(key);
        }
        self.doc_order.retain(|k| k.0 != page_id);

        let mut emptied_terms = Vec::new();
        for (term, postings) in self.postings.iter_mut() {
            let before = postings.len();
            postings.retain(|p| p.page_id != page_id);
            let removed = before - postings.len();
            if removed > 0 {
                if let Some(freq) = self.doc_freq.get_mut(term) {
                    *freq = freq.saturating_sub(removed as u32);
                }
            }
            if postings.is_empty() {
                emptied_terms.push(term.clone());
            }
        }
        for term in emptied_terms {
            self.postings.remove(&term);
            self.doc_freq.remove(&term);
        }
    }

    /// Scores `query` against every passage with at least one matching term
    /// and returns the top `k`, descending by score, ties broken by
    /// insertion order (earliest-indexed passage wins).
    pub fn search(&self, query: &str, k: usize) -> Vec<(PassageKey, f32)> {
        let terms = bm25_tokenize(query);
        if terms.is_empty() || self.total_docs() == 0 {
            return Vec::new();
        }

        let total_docs = self.total_docs() as f32;
        let avg_doc_len = self.avg_doc_len();
        let mut scores: HashMap<PassageKey, f32> = HashMap::new();

        for term in &terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let df = *self.doc_freq.get(term).unwrap_or(&(postings.len() as u32)) as f32;
            let idf_t = idf(total_docs, df);
            for posting in postings {
                let key = (posting.page_id.clone(), posting.chunk_index);
                let dl = *self.doc_len.get(&key).unwrap_or(&0) as f32;
                let contribution = idf_t
                    * tf_component(posting.term_freq as f32, dl, avg_doc_len, self.config.k1, self.config.b);
                *scores.entry(key).or_insert(0.0) += contribution;
            }
        }

        let mut results: Vec<(PassageKey, f32)> = scores.into_iter().collect();
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.rank_of(&a.0).cmp(&self.rank_of(&b.0)))
        });
        results.truncate(k);
        results
    }

    fn rank_of(&self, key: &PassageKey) -> usize {
        self.rank.get(key).copied().unwrap_or(usize::MAX)
    }

    /// Produces the exact on-disk shape described by the storage layout.
    pub fn snapshot(&self) -> InvertedIndexFile {
        let inverted_index = self
            .postings
            .iter()
            .map(|(term, postings)| TermPostings {
                term: term.clone(),
                postings: postings.clone(),
            })
            .collect();
        let document_frequency = self
            .doc_freq
            .iter()
            .map(|(term, freq)| TermDocFreq {
                term: term.clone(),
                freq: *freq,
            })
            .collect();
        let document_lengths = self
            .doc_order
            .iter()
            .map(|key| DocLength {
                doc_key: doc_key(key),
                length: *self.doc_len.get(key).unwrap_or(&0),
            })
            .collect();

        InvertedIndexFile {
            inverted_index,
            document_frequency,
            document_lengths,
            average_document_length: self.avg_doc_len(),
            total_documents: self.total_docs(),
        }
    }

    /// Rebuilds an `InvertedIndex` from its persisted form.
    pub fn from_file(file: InvertedIndexFile, config: BM25Config) -> Result<Self, IndexError> {
        let mut postings = HashMap::new();
        for tp in file.inverted_index {
            postings.insert(tp.term, tp.postings);
        }
        let mut doc_freq = HashMap::new();
        for tf in file.document_frequency {
            doc_freq.insert(tf.term, tf.freq);
        }

        let mut doc_len = HashMap::new();
        let mut doc_order = Vec::with_capacity(file.document_lengths.len());
        let mut rank = HashMap::new();
        let mut total_token_count = 0u64;

        for (i, entry) in file.document_lengths.into_iter().enumerate() {
            let key = parse_doc_key(&entry.doc_key)
                .ok_or_else(|| IndexError::Corrupt(format!("bad doc_key `{}`", entry.doc_key)))?;
            total_token_count += entry.length as u64;
            doc_len.insert(key.clone(), entry.length);
            rank.insert(key.clone(), i);
            doc_order.push(key);
        }

        Ok(Self {
            postings,
            doc_freq,
            doc_len,
            doc_order,
            rank,
            total_token_count,
            config,
        })
    }
}
