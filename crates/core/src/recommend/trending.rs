use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::interaction::PeriodActivity;
use crate::domain::product::{Product, ProductId};
use crate::domain::trending::{TrendPeriod, TrendingProduct};

use super::scoring::trend_score;

/// Trend rows for one period, highest score first. Products at or below
/// `threshold` are left out.
pub fn score_period(
    catalog: &[Product],
    activity: &HashMap<ProductId, PeriodActivity>,
    period: TrendPeriod,
    threshold: f64,
    now: DateTime<Utc>,
) -> Vec<TrendingProduct> {
    let mut rows: Vec<TrendingProduct> = catalog
        .iter()
        .filter_map(|product| {
            let score = trend_score(product);
            if score <= threshold {
                return None;
            }
            let observed = activity.get(&product.id).copied().unwrap_or_default();
            Some(TrendingProduct {
                product_id: product.id,
                period,
                trend_score: score,
                view_count: observed.view_count,
                purchase_count: observed.purchase_count,
                updated_at: now,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.trend_score.total_cmp(&a.trend_score).then_with(|| a.product_id.cmp(&b.product_id))
    });
    rows
}
