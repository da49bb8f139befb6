//! Deterministic BERT-style WordPiece subword tokenization.
//!
//! This is a from-scratch implementation of the greedy longest-match-first
//! algorithm against a fixed vocabulary. It intentionally does not delegate
//! to a black-box tokenizer library: the subword resolution rule is itself
//! the contract being implemented.

use crate::vocab::Vocabulary;

/// Normalizes curly single/double quotes to their ASCII equivalents.
fn normalize_quotes(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{2032}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201F}' | '\u{2033}' => '"',
        other => other,
    }
}

fn is_word_char(c: char) -> bool {
    // Apostrophe survives stripping: quotes are normalized (not removed) one
    // line above so that contractions like "don't" stay a single lookup
    // candidate instead of losing the character that made normalization
    // worth doing in the first place.
    c.is_alphanumeric() || c == '_' || c == '\''
}

/// Splits text on whitespace, lowercases, normalizes quotes, and strips
/// non-word characters from each resulting word. Words that become empty
/// after stripping are dropped.
///
/// Returns pairs of `(lookup_candidate, surface_word)` so callers that need
/// the original surface form (the [`Chunker`](crate::Chunker)) can recover
/// human-readable text while the tokenizer itself only ever sees the
/// normalized candidate.
pub(crate) fn preprocess(text: &str) -> Vec<(String, String)> {
    text.split_whitespace()
        .filter_map(|surface| {
            let candidate: String = surface
                .chars()
                .map(normalize_quotes)
                .map(|c| c.to_ascii_lowercase())
                .filter(|c| is_word_char(*c))
                .collect();
            if candidate.is_empty() {
                None
            } else {
                Some((candidate, surface.to_string()))
            }
        })
        .collect()
}

/// Resolves one normalized word into subword ids via greedy
/// longest-match-first, falling back to `[UNK]` for the whole word if the
/// walk cannot fully cover it.
pub(crate) fn tokenize_word(word: &str, vocab: &Vocabulary) -> Vec<u32> {
    if let Some(id) = vocab.id_of(word) {
        return vec![id];
    }

    let chars: Vec<char> = word.chars().collect();
    let mut start = 0usize;
    let mut resolved = Vec::new();

    while start < chars.len() {
        let mut end = chars.len();
        let mut matched_id = None;

        while end > start {
            let piece: String = chars[start..end].iter().collect();
            let candidate = if start > 0 {
                format!("##{piece}")
            } else {
                piece
            };
            if let Some(id) = vocab.id_of(&candidate) {
                matched_id = Some(id);
                break;
            }
            end -= 1;
        }

        match matched_id {
            Some(id) => {
                resolved.push(id);
                start = end;
            }
            None => return vec![vocab.unk_id()],
        }
    }

    resolved
}

/// Tokenizes free text into WordPiece ids, without `[CLS]`/`[SEP]` framing.
pub fn encode_content(text: &str, vocab: &Vocabulary) -> Vec<u32> {
    preprocess(text)
        .into_iter()
        .flat_map(|(candidate, _surface)| tokenize_word(&candidate, vocab))
        .collect()
}

/// Tokenizes free text, framing the content tokens with `[CLS]` and `[SEP]`.
pub fn encode(text: &str, vocab: &Vocabulary) -> Vec<u32> {
    let mut ids = Vec::with_capacity(text.len() / 4 + 2);
    ids.push(vocab.cls_id());
    ids.extend(encode_content(text, vocab));
    ids.push(vocab.sep_id());
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_vocab() -> Vocabulary {
        Vocabulary::from_tokens(
            vec!["[UNK]", "[CLS]", "[SEP]", "hello", "##o", "world"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn s6_tokenizer_determinism_scenario() {
        let vocab = toy_vocab();
        let ids = encode("Hello worldx", &vocab);
        assert_eq!(
            ids,
            vec![
                vocab.cls_id(),
                vocab.id_of("hello").unwrap(),
                vocab.unk_id(),
                vocab.sep_id(),
            ]
        );
    }

    #[test]
    fn whole_word_hit_short_circuits_the_walk() {
        let vocab = toy_vocab();
        assert_eq!(
            tokenize_word("world", &vocab),
            vec![vocab.id_of("world").unwrap()]
        );
    }

    #[test]
    fn greedy_longest_match_prefers_the_whole_vocab_entry() {
        // "hello" is in vocab directly; walking ("he" + "##llo") must not win.
        let vocab = toy_vocab();
        assert_eq!(
            tokenize_word("hello", &vocab),
            vec![vocab.id_of("hello").unwrap()]
        );
    }

    #[test]
    fn partial_progress_is_discarded_on_total_failure() {
        // "worldz": "world" matches at start=0, but "##z" has no match, so the
        // whole word must become a single [UNK], not "world" + a dangling tail.
        let vocab = toy_vocab();
        assert_eq!(tokenize_word("worldz", &vocab), vec![vocab.unk_id()]);
    }

    #[test]
    fn curly_quotes_normalize_before_lookup() {
        let vocab = Vocabulary::from_tokens(
            vec!["[UNK]", "[CLS]", "[SEP]", "don't"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
        .unwrap();
        assert_eq!(
            tokenize_word(
                &preprocess("don\u{2019}t").into_iter().next().unwrap().0,
                &vocab
            ),
            vec![vocab.id_of("don't").unwrap()]
        );
    }

    #[test]
    fn punctuation_only_words_are_skipped() {
        let pairs = preprocess("hello -- world");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "hello");
        assert_eq!(pairs[1].0, "world");
    }

    #[test]
    fn empty_text_yields_no_content_tokens() {
        let vocab = toy_vocab();
        assert!(encode_content("", &vocab).is_empty());
        assert!(encode_content("   ", &vocab).is_empty());
    }

    #[test]
    fn encode_always_frames_with_cls_and_sep() {
        let vocab = toy_vocab();
        let ids = encode("hello world", &vocab);
        assert_eq!(ids.first(), Some(&vocab.cls_id()));
        assert_eq!(ids.last(), Some(&vocab.sep_id()));
    }

    #[test]
    fn determinism_same_input_same_output() {
        let vocab = toy_vocab();
        let a = encode("Hello worldx", &vocab);
        let b = encode("Hello worldx", &vocab);
        assert_eq!(a, b);
    }
}
