//! Request and response types for the recommendation engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::interaction::UserId;
use crate::domain::product::{Product, ProductId};
use crate::domain::recommendation::{CandidateCategory, RecommendationType};
use crate::domain::trending::TrendPeriod;

/// A recommendation request as received from an outer surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    /// Shopper the results are for; anonymous when absent
    pub user_id: Option<UserId>,
    /// Browser session, carried through for feedback attribution
    pub session_id: Option<String>,
    /// One of personalized|similar|trending|occasion_based|price_based
    pub recommendation_type: String,
    /// Reference product for `similar`
    pub product_id: Option<ProductId>,
    /// Occasion tag for `occasion_based`
    pub occasion: Option<String>,
    /// Budget bounds for `price_based`
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    /// Trend period for `trending` (default weekly)
    pub period: Option<TrendPeriod>,
    /// Maximum number of results; absent or zero means the default
    pub limit: Option<usize>,
}

impl RecommendationRequest {
    pub fn new(recommendation_type: impl Into<String>) -> Self {
        Self { recommendation_type: recommendation_type.into(), ..Self::default() }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(UserId::new(user_id));
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_occasion(mut self, occasion: impl Into<String>) -> Self {
        self.occasion = Some(occasion.into());
        self
    }

    pub fn with_price_range(mut self, min: Decimal, max: Decimal) -> Self {
        self.price_min = Some(min);
        self.price_max = Some(max);
        self
    }

    pub fn with_period(mut self, period: TrendPeriod) -> Self {
        self.period = Some(period);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One ranked product in a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    pub product: Product,
    pub score: f64,
    /// Human readable reasons, comma separated when several strategies agree
    pub reason: String,
    pub category: CandidateCategory,
}

impl RecommendationCandidate {
    pub fn new(
        product: Product,
        score: f64,
        reason: impl Into<String>,
        category: CandidateCategory,
    ) -> Self {
        Self { product, score, reason: reason.into(), category }
    }

    pub fn product_id(&self) -> ProductId {
        self.product.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendation_type: RecommendationType,
    pub candidates: Vec<RecommendationCandidate>,
    pub explanation: String,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
}

impl RecommendationResponse {
    pub fn new(
        recommendation_type: RecommendationType,
        candidates: Vec<RecommendationCandidate>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            recommendation_type,
            total: candidates.len(),
            candidates,
            explanation: explanation.into(),
            generated_at: Utc::now(),
        }
    }

    pub fn product_ids(&self) -> Vec<ProductId> {
        self.candidates.iter().map(RecommendationCandidate::product_id).collect()
    }
}

/// Feedback as submitted by a client, validated by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackInput {
    pub user_id: Option<UserId>,
    pub session_id: Option<String>,
    pub product_id: ProductId,
    pub recommendation_type: String,
    pub action: String,
}

/// Aggregate feedback performance over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationStats {
    pub window: TrendPeriod,
    pub total_events: u64,
    /// Clicked events over all events
    pub click_through_rate: f64,
    /// Purchased events over all events
    pub conversion_rate: f64,
    /// Type with the most clicked plus purchased events
    pub top_performing_type: Option<RecommendationType>,
}
