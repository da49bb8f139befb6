//! Token-aligned overlapping passage chunking.
//!
//! Partitions a document's content tokens into overlapping windows sized for
//! a 512-token model, and reconstructs human-readable text for each window
//! from the surface words whose token ranges intersect it.

use crate::error::TokenizerError;
use crate::vocab::Vocabulary;
use crate::wordpiece::{preprocess, tokenize_word};

/// Chunking parameters. Defaults match a 512-token model: two positions are
/// reserved for `[CLS]`/`[SEP]`, leaving 510 content tokens per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub max_content_tokens: usize,
    pub overlap: usize,
}

impl ChunkerConfig {
    pub fn new(max_content_tokens: usize, overlap: usize) -> Self {
        Self {
            max_content_tokens,
            overlap,
        }
    }

    /// Derives the max content-token budget from a model's full sequence
    /// length (reserving two slots for `[CLS]`/`[SEP]`).
    pub fn from_model_sequence_length(chunk_size: usize, overlap: usize) -> Self {
        Self {
            max_content_tokens: chunk_size.saturating_sub(2),
            overlap,
        }
    }

    /// `stride = max_content_tokens - overlap`, the step between window
    /// starts.
    pub fn stride(&self) -> usize {
        self.max_content_tokens.saturating_sub(self.overlap)
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_content_tokens: 510,
            overlap: 50,
        }
    }
}

/// One overlapping window of a document, ready to be embedded and persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkedPassage {
    pub chunk_index: usize,
    /// Full token sequence including the leading `[CLS]` and trailing `[SEP]`.
    pub token_ids: Vec<u32>,
    pub token_count: usize,
    /// Reconstructed human-readable text for this window.
    pub text: String,
    /// Global offsets into the page's content-token stream, for traceability.
    pub start_token_index: usize,
    pub end_token_index: usize,
}

struct WordSpan {
    surface: String,
    token_start: usize,
    token_end: usize,
}

/// Tokenizes `text` and records, per surface word, which half-open range of
/// the content-token stream it produced.
fn tokenize_with_word_spans(text: &str, vocab: &Vocabulary) -> (Vec<u32>, Vec<WordSpan>) {
    let mut content_tokens = Vec::new();
    let mut spans = Vec::new();

    for (candidate, surface) in preprocess(text) {
        let ids = tokenize_word(&candidate, vocab);
        if ids.is_empty() {
            continue;
        }
        let start = content_tokens.len();
        content_tokens.extend(ids);
        let end = content_tokens.len();
        spans.push(WordSpan {
            surface,
            token_start: start,
            token_end: end,
        });
    }

    (content_tokens, spans)
}

/// Partitions a document's content tokens into overlapping, model-sized
/// passages.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Chunks `text` into overlapping passages. Fails with
    /// [`TokenizerError::NoTextContent`] when `text` tokenizes to zero
    /// content tokens.
    pub fn chunk(
        &self,
        text: &str,
        vocab: &Vocabulary,
    ) -> Result<Vec<ChunkedPassage>, TokenizerError> {
        let (content_tokens, spans) = tokenize_with_word_spans(text, vocab);
        if content_tokens.is_empty() {
            return Err(TokenizerError::NoTextContent);
        }

        let max = self.config.max_content_tokens;
        let stride = self.config.stride();
        let total = content_tokens.len();

        let mut passages = Vec::new();
        let mut start = 0usize;
        let mut chunk_index = 0usize;

        loop {
            let end = (start + max).min(total);
            let window_text = reconstruct_text(&spans, start, end);

            let mut token_ids = Vec::with_capacity(end - start + 2);
            token_ids.push(vocab.cls_id());
            token_ids.extend_from_slice(&content_tokens[start..end]);
            token_ids.push(vocab.sep_id());
            let token_count = token_ids.len();

            passages.push(ChunkedPassage {
                chunk_index,
                token_ids,
                token_count,
                text: window_text,
                start_token_index: start,
                end_token_index: end,
            });

            if end == total {
                break;
            }
            start += stride;
            chunk_index += 1;
        }

        Ok(passages)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

fn reconstruct_text(spans: &[WordSpan], window_start: usize, window_end: usize) -> String {
    spans
        .iter()
        .filter(|s| s.token_start < window_end && s.token_end > window_start)
        .map(|s| s.surface.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
