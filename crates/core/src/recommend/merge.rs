use std::collections::HashMap;

use crate::domain::product::ProductId;
use crate::domain::recommendation::CandidateCategory;

use super::types::RecommendationCandidate;

/// Accumulates candidates from several sources keyed by product.
///
/// Candidates live in an arena so insertion order is stable and merging is a
/// single hash lookup per candidate.
#[derive(Debug, Default)]
pub struct CandidateMerger {
    candidates: Vec<RecommendationCandidate>,
    index: HashMap<ProductId, usize>,
}

impl CandidateMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `weight * score` for every candidate of one strategy. A product
    /// seen before keeps its first category and gains the new reason.
    pub fn merge(
        &mut self,
        source: Vec<RecommendationCandidate>,
        weight: f64,
        category: CandidateCategory,
    ) {
        for candidate in source {
            let weighted = weight * candidate.score;
            match self.index.get(&candidate.product_id()) {
                Some(&slot) => {
                    let existing = &mut self.candidates[slot];
                    existing.score += weighted;
                    existing.reason.push_str(", ");
                    existing.reason.push_str(&candidate.reason);
                }
                None => {
                    self.index.insert(candidate.product_id(), self.candidates.len());
                    self.candidates.push(RecommendationCandidate {
                        score: weighted,
                        category,
                        ..candidate
                    });
                }
            }
        }
    }

    /// Inserts `candidate` unless its product is already present.
    pub fn insert_new(&mut self, candidate: RecommendationCandidate) -> bool {
        if self.index.contains_key(&candidate.product_id()) {
            return false;
        }
        self.index.insert(candidate.product_id(), self.candidates.len());
        self.candidates.push(candidate);
        true
    }

    pub fn contains(&self, product: ProductId) -> bool {
        self.index.contains_key(&product)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_ranked(self, limit: usize) -> Vec<RecommendationCandidate> {
        rank_candidates(self.candidates, limit)
    }
}

/// Sorts by score descending, then product id ascending, and truncates.
pub fn rank_candidates(
    mut candidates: Vec<RecommendationCandidate>,
    limit: usize,
) -> Vec<RecommendationCandidate> {
    candidates.sort_by(|a, b| {
        b.score.total_cmp(&a.score).then_with(|| a.product_id().cmp(&b.product_id()))
    });
    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::CandidateMerger;
    use crate::domain::recommendation::CandidateCategory;
    use crate::recommend::scoring::tests::product;
    use crate::recommend::types::RecommendationCandidate;

    fn candidate(id: i64, score: f64, reason: &str, category: CandidateCategory) -> RecommendationCandidate {
        RecommendationCandidate::new(product(id, "Rose", 10), score, reason, category)
    }

    #[test]
    fn repeated_product_accumulates_score_and_reason() {
        let mut merger = CandidateMerger::new();
        merger.merge(
            vec![candidate(7, 0.3, "Users with similar taste also bought this", CandidateCategory::Collaborative)],
            0.4,
            CandidateCategory::Collaborative,
        );
        merger.merge(
            vec![candidate(7, 0.3, "Popular among all customers", CandidateCategory::Popular)],
            0.2,
            CandidateCategory::Popularity,
        );

        let ranked = merger.into_ranked(10);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].score - 0.18).abs() < 1e-9);
        assert_eq!(
            ranked[0].reason,
            "Users with similar taste also bought this, Popular among all customers"
        );
        assert_eq!(ranked[0].category, CandidateCategory::Collaborative);
    }

    #[test]
    fn new_product_takes_the_strategy_category() {
        let mut merger = CandidateMerger::new();
        merger.merge(
            vec![candidate(1, 1.0, "Popular among all customers", CandidateCategory::Popular)],
            0.2,
            CandidateCategory::Popularity,
        );
        let ranked = merger.into_ranked(10);
        assert_eq!(ranked[0].category, CandidateCategory::Popularity);
    }

    #[test]
    fn ranking_is_score_desc_then_id_and_respects_limit() {
        let mut merger = CandidateMerger::new();
        merger.merge(
            vec![
                candidate(5, 0.5, "a", CandidateCategory::Trending),
                candidate(2, 0.5, "a", CandidateCategory::Trending),
                candidate(9, 0.9, "a", CandidateCategory::Trending),
            ],
            1.0,
            CandidateCategory::Trending,
        );
        let ids: Vec<i64> = merger.into_ranked(2).iter().map(|c| c.product_id().0).collect();
        assert_eq!(ids, vec![9, 2]);
    }

    #[test]
    fn merging_identical_inputs_is_deterministic() {
        let build = || {
            let mut merger = CandidateMerger::new();
            merger.merge(
                vec![candidate(3, 0.4, "x", CandidateCategory::Collaborative), candidate(1, 0.4, "x", CandidateCategory::Collaborative)],
                0.4,
                CandidateCategory::Collaborative,
            );
            merger.merge(
                vec![candidate(1, 1.0, "y", CandidateCategory::Trending)],
                0.1,
                CandidateCategory::Trending,
            );
            merger.into_ranked(10)
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn insert_new_keeps_the_first_occurrence() {
        let mut merger = CandidateMerger::new();
        assert!(merger.insert_new(candidate(4, 0.9, "Similar product features", CandidateCategory::SimilarProducts)));
        assert!(!merger.insert_new(candidate(4, 0.7, "Same flower type: Rose", CandidateCategory::SameType)));
        assert!(merger.contains(crate::domain::product::ProductId(4)));

        let ranked = merger.into_ranked(10);
        assert_eq!(ranked[0].category, CandidateCategory::SimilarProducts);
        assert_eq!(ranked[0].score, 0.9);
    }
}
