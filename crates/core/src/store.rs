//! Persistence seams consumed by the recommendation engine and pricing
//! service. Implementations live in `bloom-db`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::feedback::{FeedbackTally, RecommendationFeedback};
use crate::domain::interaction::{InteractionCounts, PeriodActivity, UserId};
use crate::domain::preference::UserPreferenceProfile;
use crate::domain::pricing::{PricingRule, SpecialDayId};
use crate::domain::product::{FlowerTypeDirectory, Product, ProductId};
use crate::domain::similarity::ProductSimilarity;
use crate::domain::trending::{TrendPeriod, TrendingProduct};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store decode failure: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn all_products(&self) -> StoreResult<Vec<Product>>;

    /// In-stock products of a flower type, newest first.
    async fn products_by_flower_type(
        &self,
        flower_type: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> StoreResult<Vec<Product>>;

    /// In-stock products tagged with an occasion, newest first.
    async fn products_by_occasion(
        &self,
        occasion: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> StoreResult<Vec<Product>>;

    /// In-stock products whose base price lies in `[min, max]`, newest first.
    async fn products_in_price_range(
        &self,
        min: Decimal,
        max: Decimal,
        exclude: &[ProductId],
        limit: usize,
    ) -> StoreResult<Vec<Product>>;

    async fn flower_type_directory(&self) -> StoreResult<FlowerTypeDirectory>;
}

#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// One row per product the user touched through any event source.
    async fn interaction_counts(&self, user: &UserId) -> StoreResult<Vec<InteractionCounts>>;

    /// Distinct products from the user's completed orders, most recent first.
    async fn purchase_history(&self, user: &UserId) -> StoreResult<Vec<Product>>;

    /// Users ranked by the number of distinct completed-order products they
    /// share with `user`.
    async fn similar_users(&self, user: &UserId, limit: usize) -> StoreResult<Vec<UserId>>;

    async fn period_activity(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<HashMap<ProductId, PeriodActivity>>;

    async fn recently_active_users(&self, since: DateTime<Utc>) -> StoreResult<Vec<UserId>>;
}

#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn preference_profile(&self, user: &UserId)
        -> StoreResult<Option<UserPreferenceProfile>>;

    async fn upsert_preference_profile(&self, profile: &UserPreferenceProfile) -> StoreResult<()>;

    /// Stored similarities involving `product` in either position, highest
    /// score first.
    async fn similarities_for(
        &self,
        product: ProductId,
        limit: usize,
    ) -> StoreResult<Vec<ProductSimilarity>>;

    async fn upsert_similarity(&self, similarity: &ProductSimilarity) -> StoreResult<()>;

    /// Stored rows for a period, highest trend score first.
    async fn trending_products(
        &self,
        period: TrendPeriod,
        limit: usize,
    ) -> StoreResult<Vec<TrendingProduct>>;

    /// Replaces every row of `period` with `rows` in one transaction.
    async fn replace_trending_products(
        &self,
        period: TrendPeriod,
        rows: &[TrendingProduct],
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait PricingRuleStore: Send + Sync {
    /// Active rules ordered by rule id.
    async fn active_rules(&self) -> StoreResult<Vec<PricingRule>>;

    async fn active_special_days(&self, date: NaiveDate) -> StoreResult<HashSet<SpecialDayId>>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn append_feedback(&self, feedback: &RecommendationFeedback) -> StoreResult<()>;

    async fn feedback_tallies(&self, since: DateTime<Utc>) -> StoreResult<Vec<FeedbackTally>>;
}

/// Store handles shared by the engine and the pricing service.
#[derive(Clone)]
pub struct EngineStores {
    pub catalog: Arc<dyn CatalogStore>,
    pub interactions: Arc<dyn InteractionStore>,
    pub recommendations: Arc<dyn RecommendationStore>,
    pub pricing_rules: Arc<dyn PricingRuleStore>,
    pub feedback: Arc<dyn FeedbackStore>,
}

impl EngineStores {
    /// Uses one backing store for every seam.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: CatalogStore
            + InteractionStore
            + RecommendationStore
            + PricingRuleStore
            + FeedbackStore
            + 'static,
    {
        Self {
            catalog: store.clone(),
            interactions: store.clone(),
            recommendations: store.clone(),
            pricing_rules: store.clone(),
            feedback: store,
        }
    }
}
