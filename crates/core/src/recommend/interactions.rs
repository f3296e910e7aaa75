use crate::domain::interaction::{InteractionCounts, UserId, UserInteractionSummary};

use super::scoring::{interaction_score, InteractionWeights};

/// Scores raw counts and orders them by interaction score, highest first,
/// breaking ties by product id.
pub fn summarize_interactions(
    user: &UserId,
    counts: Vec<InteractionCounts>,
    weights: &InteractionWeights,
) -> Vec<UserInteractionSummary> {
    let mut summaries: Vec<UserInteractionSummary> = counts
        .into_iter()
        .map(|counts| UserInteractionSummary {
            user_id: user.clone(),
            interaction_score: interaction_score(&counts, weights),
            counts,
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.interaction_score
            .total_cmp(&a.interaction_score)
            .then_with(|| a.product_id().cmp(&b.product_id()))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::summarize_interactions;
    use crate::domain::interaction::{InteractionCounts, UserId};
    use crate::domain::product::ProductId;
    use crate::recommend::InteractionWeights;

    fn counts(product: i64, views: u32, purchases: u32) -> InteractionCounts {
        InteractionCounts {
            product_id: ProductId(product),
            view_count: views,
            purchase_count: purchases,
            ..InteractionCounts::default()
        }
    }

    #[test]
    fn summaries_are_sorted_by_score_then_product() {
        let user = UserId::new("u-1");
        let summaries = summarize_interactions(
            &user,
            vec![counts(3, 10, 0), counts(1, 0, 1), counts(2, 10, 0)],
            &InteractionWeights::default(),
        );

        let order: Vec<i64> = summaries.iter().map(|s| s.product_id().0).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(summaries.iter().all(|s| s.user_id == user));
    }

    #[test]
    fn no_events_means_no_summaries() {
        let summaries =
            summarize_interactions(&UserId::new("u-2"), Vec::new(), &InteractionWeights::default());
        assert!(summaries.is_empty());
    }
}
