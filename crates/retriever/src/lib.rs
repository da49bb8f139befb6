//! Fuses a BM25 ranking and a dense ranking into one ranked result list.
//!
//! The algorithm is Reciprocal Rank Fusion (RRF): each ranked list
//! contributes `1 / (C + rank)` to a passage's fused score, summed across
//! lists. This avoids having to calibrate BM25 and cosine scores onto a
//! shared scale, which the teacher's own weighted-sum fusion required and
//! this one doesn't.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use index::PassageKey;

/// The constant `C` in `1 / (C + rank)`. Larger values flatten the
/// contribution curve across ranks.
pub const DEFAULT_RRF_CONSTANT: u32 = 60;
/// How many hits to request from each ranker before fusing.
pub const DEFAULT_PER_MODE_CANDIDATES: usize = 50;

/// Which ranker(s) a query should consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Dense,
    Bm25,
    Hybrid,
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::Hybrid
    }
}

/// Fuses `bm25_hits` and `dense_hits` (each already sorted descending by
/// their own score) into one list, descending by fused score. Ties break by
/// BM25 rank, then by passage key.
pub fn reciprocal_rank_fusion(
    bm25_hits: &[(PassageKey, f32)],
    dense_hits: &[(PassageKey, f32)],
    c: u32,
    k: usize,
) -> Vec<(PassageKey, f32)> {
    let mut fused: HashMap<PassageKey, f32> = HashMap::new();
    let mut bm25_rank: HashMap<PassageKey, usize> = HashMap::new();

    for (rank, (key, _)) in bm25_hits.iter().enumerate() {
        *fused.entry(key.clone()).or_insert(0.0) += 1.0 / (c as f32 + rank as f32);
        bm25_rank.entry(key.clone()).or_insert(rank);
    }
    for (rank, (key, _)) in dense_hits.iter().enumerate() {
        *fused.entry(key.clone()).or_insert(0.0) += 1.0 / (c as f32 + rank as f32);
    }

    let mut results: Vec<(PassageKey, f32)> = fused.into_iter().collect();
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| {
            let rank_a = bm25_rank.get(&a.0).copied().unwrap_or(usize::MAX);
            let rank_b = bm25_rank.get(&b.0).copied().unwrap_or(usize::MAX);
            rank_a.cmp(&rank_b).then_with(|| a.0.cmp(&b.0))
        })
    });
    results.truncate(k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(page: &str) -> PassageKey {
        (page.to_string(), 0)
    }

    #[test]
    fn s4_hybrid_fusion_scenario() {
        let bm25_hits = vec![(key("P1"), 5.0), (key("P2"), 3.0)];
        let dense_hits = vec![(key("P2"), 0.9), (key("P1"), 0.8)];

        let fused = reciprocal_rank_fusion(&bm25_hits, &dense_hits, 60, 10);

        assert_eq!(fused[0].0, key("P1"));
        assert_eq!(fused[1].0, key("P2"));
        let expected = 1.0 / 60.0 + 1.0 / 61.0;
        assert!((fused[0].1 - expected).abs() < 1e-6);
        assert!((fused[1].1 - expected).abs() < 1e-6);
    }

    #[test]
    fn a_passage_present_in_only_one_list_still_scores() {
        let bm25_hits = vec![(key("P1"), 5.0)];
        let dense_hits: Vec<(PassageKey, f32)> = vec![];

        let fused = reciprocal_rank_fusion(&bm25_hits, &dense_hits, 60, 10);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].1 - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn empty_lists_fuse_to_an_empty_result() {
        assert!(reciprocal_rank_fusion(&[], &[], 60, 10).is_empty());
    }

    #[test]
    fn result_is_truncated_to_k() {
        let bm25_hits = vec![(key("P1"), 1.0), (key("P2"), 1.0), (key("P3"), 1.0)];
        let fused = reciprocal_rank_fusion(&bm25_hits, &[], 60, 2);
        assert_eq!(fused.len(), 2);
    }
}
