//! Vocabulary loading for WordPiece tokenization.
//!
//! A vocabulary is an ordered list of tokens; a token's position in the list
//! is its id. The file format is newline-delimited UTF-8 tokens in id order
//! (see the workspace storage layout).

use std::collections::HashMap;
use std::path::Path;

use crate::error::TokenizerError;

/// Default id for `[CLS]` when the loaded vocabulary does not define it.
pub const DEFAULT_CLS_ID: u32 = 101;
/// Default id for `[SEP]` when the loaded vocabulary does not define it.
pub const DEFAULT_SEP_ID: u32 = 102;
/// Default id for `[UNK]` when the loaded vocabulary does not define it.
pub const DEFAULT_UNK_ID: u32 = 100;

/// An immutable, ordered token vocabulary with special-token ids resolved.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
    ids: HashMap<String, u32>,
    cls_id: u32,
    sep_id: u32,
    unk_id: u32,
}

impl Vocabulary {
    /// Builds a vocabulary from an ordered token list. The list's index is
    /// each token's id.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self, TokenizerError> {
        if tokens.is_empty() {
            return Err(TokenizerError::EmptyVocabulary);
        }
        let mut ids = HashMap::with_capacity(tokens.len());
        for (idx, tok) in tokens.iter().enumerate() {
            ids.insert(tok.clone(), idx as u32);
        }
        let cls_id = ids.get("[CLS]").copied().unwrap_or(DEFAULT_CLS_ID);
        let sep_id = ids.get("[SEP]").copied().unwrap_or(DEFAULT_SEP_ID);
        let unk_id = ids.get("[UNK]").copied().unwrap_or(DEFAULT_UNK_ID);
        Ok(Self {
            tokens,
            ids,
            cls_id,
            sep_id,
            unk_id,
        })
    }

    /// Loads a vocabulary from a newline-delimited token file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TokenizerError> {
        let text = std::fs::read_to_string(path)?;
        let tokens: Vec<String> = text.lines().map(str::to_string).collect();
        Self::from_tokens(tokens)
    }

    /// Looks up a token's id, if present.
    pub fn id_of(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    /// Looks up the token text for an id, if in range.
    pub fn token_of(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn cls_id(&self) -> u32 {
        self.cls_id
    }

    pub fn sep_id(&self) -> u32 {
        self.sep_id
    }

    pub fn unk_id(&self) -> u32 {
        self.unk_id
    }
}
