//! Hybrid product recommendation engine
//!
//! Blends collaborative, content-based, popularity and trending signals into
//! one ranked candidate list, and runs the batch jobs that keep the
//! similarity, trending and preference tables fresh.

mod engine;
mod feedback;
mod interactions;
mod merge;
mod preferences;
mod scoring;
mod similarity;
mod trending;
mod types;

pub use engine::{RecommendationEngine, SimilarityRun, TrendRefresh};
pub use feedback::summarize_feedback;
pub use interactions::summarize_interactions;
pub use merge::{rank_candidates, CandidateMerger};
pub use preferences::build_profile;
pub use scoring::{
    content_similarity, interaction_score, occasion_score, popularity_score, price_band_score,
    trend_score, InteractionWeights, StrategyWeights,
};
pub use similarity::score_against_catalog;
pub use trending::score_period;
pub use types::*;

use crate::errors::ApplicationError;

/// Result type for recommendation operations
pub type RecommendResult<T> = Result<T, ApplicationError>;

/// No request, whatever the configured `max_limit`, returns more candidates.
pub const HARD_RESULT_LIMIT: usize = 50;

/// Default strategy blend weights
pub const DEFAULT_STRATEGY_WEIGHTS: StrategyWeights =
    StrategyWeights { collaborative: 0.4, content: 0.3, popularity: 0.2, trending: 0.1 };

/// Default weights of raw interaction events
pub const DEFAULT_INTERACTION_WEIGHTS: InteractionWeights = InteractionWeights {
    view: 0.1,
    cart_add: 0.3,
    wishlist_add: 0.2,
    purchase: 1.0,
    review: 0.5,
};

pub const DEFAULT_SETTINGS: RecommendationSettings = RecommendationSettings {
    strategy_weights: DEFAULT_STRATEGY_WEIGHTS,
    interaction_weights: DEFAULT_INTERACTION_WEIGHTS,
    min_similarity: 0.1,
    min_interactions: 3,
    default_limit: 10,
    max_limit: HARD_RESULT_LIMIT,
    similar_user_limit: 10,
    preferred_flower_threshold: 0.5,
    history_share_threshold: 0.2,
    trend_threshold: 0.1,
};

/// Tunable thresholds and weights of the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationSettings {
    pub strategy_weights: StrategyWeights,
    pub interaction_weights: InteractionWeights,
    /// Similarity pairs scoring below this are never stored
    pub min_similarity: f64,
    /// Users with fewer interaction summaries get trending results
    pub min_interactions: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    /// Number of peers consulted by the collaborative strategy
    pub similar_user_limit: usize,
    /// Profile flower weights must exceed this to drive content candidates
    pub preferred_flower_threshold: f64,
    /// Share of purchase history a flower type needs to drive candidates
    pub history_share_threshold: f64,
    /// Trend scores at or below this are dropped
    pub trend_threshold: f64,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        DEFAULT_SETTINGS
    }
}

impl RecommendationSettings {
    /// Absent or zero limits fall back to the default; everything is capped.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        let cap = self.max_limit.min(HARD_RESULT_LIMIT);
        match requested {
            Some(limit) if limit > 0 => limit.min(cap),
            _ => self.default_limit.min(cap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_SETTINGS, HARD_RESULT_LIMIT};

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(DEFAULT_SETTINGS.effective_limit(None), 10);
        assert_eq!(DEFAULT_SETTINGS.effective_limit(Some(0)), 10);
        assert_eq!(DEFAULT_SETTINGS.effective_limit(Some(7)), 7);
        assert_eq!(DEFAULT_SETTINGS.effective_limit(Some(500)), 50);
    }

    #[test]
    fn raised_max_limit_still_stops_at_hard_limit() {
        let mut settings = DEFAULT_SETTINGS;
        settings.max_limit = 200;
        settings.default_limit = 120;
        assert_eq!(settings.effective_limit(Some(120)), HARD_RESULT_LIMIT);
        assert_eq!(settings.effective_limit(None), HARD_RESULT_LIMIT);

        settings.max_limit = 20;
        assert_eq!(settings.effective_limit(Some(30)), 20);
    }
}
