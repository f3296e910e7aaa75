//! Scoring formulas shared by the strategies and batch jobs

use crate::domain::interaction::InteractionCounts;
use crate::domain::product::Product;

/// Blend weights applied when merging strategy outputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyWeights {
    /// Weight for collaborative candidates (default: 0.4)
    pub collaborative: f64,
    /// Weight for content-based candidates (default: 0.3)
    pub content: f64,
    /// Weight for popularity candidates (default: 0.2)
    pub popularity: f64,
    /// Weight for trending candidates (default: 0.1)
    pub trending: f64,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        super::DEFAULT_STRATEGY_WEIGHTS
    }
}

/// Per-event weights of the interaction score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionWeights {
    pub view: f64,
    pub cart_add: f64,
    pub wishlist_add: f64,
    pub purchase: f64,
    pub review: f64,
}

impl Default for InteractionWeights {
    fn default() -> Self {
        super::DEFAULT_INTERACTION_WEIGHTS
    }
}

pub fn interaction_score(counts: &InteractionCounts, weights: &InteractionWeights) -> f64 {
    f64::from(counts.view_count) * weights.view
        + f64::from(counts.cart_adds) * weights.cart_add
        + f64::from(counts.wishlist_adds) * weights.wishlist_add
        + f64::from(counts.purchase_count) * weights.purchase
        + f64::from(counts.review_count) * weights.review
}

/// Attribute similarity of two products in `[0, 1]`.
pub fn content_similarity(a: &Product, b: &Product) -> f64 {
    let mut score = 0.0;

    if a.flower_type == b.flower_type {
        score += 0.4;
    }

    let (price_a, price_b) = (a.price_value(), b.price_value());
    let max_price = price_a.max(price_b);
    if max_price > 0.0 {
        score += 0.3 * (1.0 - (price_a - price_b).abs() / max_price);
    }

    if a.status == b.status {
        score += 0.2;
    }

    if a.is_rated() && b.is_rated() {
        score += 0.1 * (1.0 - (a.average_rating - b.average_rating).abs() / 5.0);
    }

    score.min(1.0)
}

/// Recent-momentum score stored in the trending table.
pub fn trend_score(product: &Product) -> f64 {
    let mut score = 0.0;

    if let Some(rank) = product.sales_rank.filter(|rank| *rank <= 100) {
        score += 0.5 * (100.0 - f64::from(rank)).max(0.0) / 100.0;
    }
    if product.is_rated() {
        score += 0.3 * product.average_rating / 5.0;
    }
    if product.review_count > 0 {
        score += 0.2 * (f64::from(product.review_count) / 50.0).min(1.0);
    }

    score
}

/// All-time popularity over the whole catalog.
pub fn popularity_score(product: &Product) -> f64 {
    let mut score = 0.0;

    if product.is_rated() {
        score += 0.4 * product.average_rating / 5.0;
    }
    if product.review_count > 0 {
        score += 0.3 * (f64::from(product.review_count) / 100.0).min(1.0);
    }
    if let Some(rank) = product.sales_rank.filter(|rank| *rank <= 1000) {
        score += 0.3 * (1000.0 - f64::from(rank)) / 1000.0;
    }

    score
}

pub fn occasion_score(product: &Product) -> f64 {
    let mut score = 0.5;

    if product.is_rated() {
        score += 0.3 * product.average_rating / 5.0;
    }
    if let Some(rank) = product.sales_rank.filter(|rank| *rank <= 100) {
        score += 0.2 * (100.0 - f64::from(rank)) / 100.0;
    }

    score
}

/// Value score inside a shopper's budget. Unrated products score `0.5`.
pub fn price_band_score(product: &Product, min: f64, max: f64) -> f64 {
    if !product.is_rated() {
        return 0.5;
    }

    let span = max - min;
    let closeness = if span > 0.0 { (max - product.price_value()) / span } else { 1.0 };
    (closeness + product.average_rating / 5.0) / 2.0
}
