use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::interaction::{UserId, UserInteractionSummary};
use crate::domain::preference::{PriceBand, UserPreferenceProfile};
use crate::domain::product::{Product, ProductId};

/// Builds a normalized taste profile from scored interaction summaries.
///
/// Returns `None` when fewer than `min_interactions` summaries exist or when
/// none of the summarized products is still in the catalog.
pub fn build_profile(
    user: &UserId,
    summaries: &[UserInteractionSummary],
    products: &HashMap<ProductId, Product>,
    min_interactions: usize,
    now: DateTime<Utc>,
) -> Option<UserPreferenceProfile> {
    if summaries.len() < min_interactions {
        return None;
    }

    let mut flower_weights: BTreeMap<String, f64> = BTreeMap::new();
    let mut occasion_weights: BTreeMap<String, f64> = BTreeMap::new();
    let mut price_band = PriceBand::default();
    let mut spent = Decimal::ZERO;
    let mut purchases = Decimal::ZERO;
    let mut resolved = 0usize;

    for summary in summaries {
        let Some(product) = products.get(&summary.product_id()) else {
            continue;
        };
        resolved += 1;

        let contribution = (summary.interaction_score / 10.0).min(1.0);
        *flower_weights.entry(product.flower_type.clone()).or_insert(0.0) += contribution;
        for occasion in &product.occasions {
            *occasion_weights.entry(occasion.clone()).or_insert(0.0) += contribution;
        }

        if summary.has_purchases() {
            let price = product.base_price;
            price_band.min = Some(price_band.min.map_or(price, |min| min.min(price)));
            price_band.max = Some(price_band.max.map_or(price, |max| max.max(price)));
            let count = Decimal::from(summary.counts.purchase_count);
            spent += price * count;
            purchases += count;
        }
    }

    if resolved == 0 {
        return None;
    }

    if !purchases.is_zero() {
        price_band.average_spent = Some((spent / purchases).round_dp(2));
    }

    normalize(&mut flower_weights);
    normalize(&mut occasion_weights);

    Some(UserPreferenceProfile {
        user_id: user.clone(),
        flower_weights,
        occasion_weights,
        price_band,
        last_updated: now,
    })
}

fn normalize(weights: &mut BTreeMap<String, f64>) {
    let max = weights.values().copied().fold(0.0_f64, f64::max);
    if max > 0.0 {
        for weight in weights.values_mut() {
            *weight /= max;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::build_profile;
    use crate::domain::interaction::{InteractionCounts, UserId, UserInteractionSummary};
    use crate::domain::product::{Product, ProductId};
    use crate::recommend::scoring::tests::product;

    fn summary(product: i64, score: f64, purchases: u32) -> UserInteractionSummary {
        UserInteractionSummary {
            user_id: UserId::new("u-1"),
            counts: InteractionCounts {
                product_id: ProductId(product),
                purchase_count: purchases,
                ..InteractionCounts::default()
            },
            interaction_score: score,
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<ProductId, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn too_few_interactions_yield_no_profile() {
        let products = catalog(vec![product(1, "Rose", 10)]);
        let summaries = vec![summary(1, 5.0, 1), summary(1, 5.0, 1)];
        assert!(build_profile(&UserId::new("u-1"), &summaries, &products, 3, Utc::now()).is_none());
    }

    #[test]
    fn weights_are_max_normalized_and_price_band_tracks_purchases() {
        let mut rose = product(1, "Rose", 40);
        rose.occasions = vec!["Birthday".to_string(), "Anniversary".to_string()];
        let mut tulip = product(2, "Tulip", 20);
        tulip.occasions = vec!["Birthday".to_string()];
        let lily = product(3, "Lily", 90);
        let products = catalog(vec![rose, tulip, lily]);

        let summaries = vec![summary(1, 12.0, 2), summary(2, 4.0, 1), summary(3, 0.5, 0)];
        let profile = build_profile(&UserId::new("u-1"), &summaries, &products, 3, Utc::now());
        let Some(profile) = profile else {
            panic!("profile expected");
        };

        assert_eq!(profile.flower_weights.get("Rose"), Some(&1.0));
        assert_eq!(profile.flower_weights.get("Tulip"), Some(&0.4));
        assert_eq!(profile.flower_weights.get("Lily"), Some(&0.05));
        assert_eq!(profile.occasion_weights.get("Birthday"), Some(&1.0));
        assert_eq!(profile.occasion_weights.get("Anniversary"), Some(&(1.0 / 1.4)));

        assert_eq!(profile.price_band.min, Some(Decimal::from(20)));
        assert_eq!(profile.price_band.max, Some(Decimal::from(40)));
        assert_eq!(profile.price_band.average_spent, Some(Decimal::new(3333, 2)));
    }

    #[test]
    fn missing_products_are_skipped() {
        let products = catalog(vec![product(1, "Rose", 40)]);
        let summaries = vec![summary(1, 2.0, 0), summary(8, 9.0, 1), summary(9, 9.0, 1)];
        let profile = build_profile(&UserId::new("u-1"), &summaries, &products, 3, Utc::now());
        let Some(profile) = profile else {
            panic!("profile expected");
        };

        assert_eq!(profile.flower_weights.len(), 1);
        assert_eq!(profile.flower_weights.get("Rose"), Some(&1.0));
        assert_eq!(profile.price_band.min, None);
        assert_eq!(profile.price_band.average_spent, None);
    }
}
