use std::collections::BTreeMap;

use crate::domain::feedback::{FeedbackAction, FeedbackTally};
use crate::domain::recommendation::RecommendationType;
use crate::domain::trending::TrendPeriod;

use super::types::RecommendationStats;

/// Folds per (type, action) counts into rates for the window.
pub fn summarize_feedback(window: TrendPeriod, tallies: &[FeedbackTally]) -> RecommendationStats {
    let mut total = 0u64;
    let mut clicked = 0u64;
    let mut purchased = 0u64;
    let mut engagement: BTreeMap<&'static str, (u64, RecommendationType)> = BTreeMap::new();

    for tally in tallies {
        total += tally.count;
        let engaged = match tally.action {
            FeedbackAction::Clicked => {
                clicked += tally.count;
                tally.count
            }
            FeedbackAction::Purchased => {
                purchased += tally.count;
                tally.count
            }
            FeedbackAction::Dismissed | FeedbackAction::Liked => 0,
        };
        let entry = engagement
            .entry(tally.recommendation_type.as_str())
            .or_insert((0, tally.recommendation_type));
        entry.0 += engaged;
    }

    // BTreeMap iterates alphabetically, so the first maximum wins ties.
    let mut top = None;
    let mut best = 0u64;
    for (engaged, recommendation_type) in engagement.values() {
        if *engaged > best {
            best = *engaged;
            top = Some(*recommendation_type);
        }
    }

    let rate = |count: u64| if total == 0 { 0.0 } else { count as f64 / total as f64 };

    RecommendationStats {
        window,
        total_events: total,
        click_through_rate: rate(clicked),
        conversion_rate: rate(purchased),
        top_performing_type: top,
    }
}
