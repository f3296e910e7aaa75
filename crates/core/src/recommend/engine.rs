//! Recommendation orchestration and maintenance jobs

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::feedback::{FeedbackAction, RecommendationFeedback, ANONYMOUS_USER};
use crate::domain::interaction::{UserId, UserInteractionSummary};
use crate::domain::preference::UserPreferenceProfile;
use crate::domain::product::{Product, ProductId};
use crate::domain::recommendation::{CandidateCategory, RecommendationType};
use crate::domain::trending::TrendPeriod;
use crate::errors::{ApplicationError, DomainError};
use crate::store::EngineStores;

use super::feedback::summarize_feedback;
use super::interactions::summarize_interactions;
use super::merge::{rank_candidates, CandidateMerger};
use super::preferences::build_profile;
use super::scoring::{occasion_score, popularity_score, price_band_score};
use super::similarity::score_against_catalog;
use super::trending::score_period;
use super::types::*;
use super::{RecommendResult, RecommendationSettings};

const PERSONALIZED_EXPLANATION: &str =
    "Personalized recommendations based on your purchase history, preferences, and trending products";
const TRENDING_EXPLANATION: &str = "Currently trending products";
const PRICE_EXPLANATION: &str = "Best flowers within your price range";

const COLLABORATIVE_REASON: &str = "Users with similar taste also bought this";
const POPULARITY_REASON: &str = "Popular among all customers";
const TRENDING_STRATEGY_REASON: &str = "Currently trending";
const TRENDING_REASON: &str = "Trending product with high popularity";
const TRENDING_FALLBACK_REASON: &str = "Popular product";
const SIMILAR_REASON: &str = "Similar product features";
const SIMILAR_PRICE_REASON: &str = "Similar price range";
const PRICE_REASON: &str = "Great value within your budget";

const SAME_TYPE_SCORE: f64 = 0.7;
const SIMILAR_PRICE_SCORE: f64 = 0.5;

/// Outcome of a similarity pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimilarityRun {
    pub products: usize,
    pub pairs_stored: usize,
    pub failed_writes: usize,
}

impl SimilarityRun {
    fn absorb(&mut self, other: SimilarityRun) {
        self.products += other.products;
        self.pairs_stored += other.pairs_stored;
        self.failed_writes += other.failed_writes;
    }

    fn into_result(self) -> RecommendResult<Self> {
        if self.failed_writes > 0 {
            return Err(ApplicationError::DependencyFailure(format!(
                "{} of {} similarity writes failed",
                self.failed_writes,
                self.failed_writes + self.pairs_stored
            )));
        }
        Ok(self)
    }
}

/// Rows written for one trend period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendRefresh {
    pub period: TrendPeriod,
    pub rows: usize,
}

/// Validated form of a request, built before any store access.
enum Plan {
    Personalized { user: Option<UserId> },
    Similar { product: ProductId },
    Trending { period: TrendPeriod },
    Occasion { occasion: String },
    PriceBand { min: Decimal, max: Decimal },
}

impl Plan {
    fn from_request(request: &RecommendationRequest) -> Result<Self, DomainError> {
        match request.recommendation_type.parse::<RecommendationType>()? {
            RecommendationType::Personalized => {
                Ok(Self::Personalized { user: request.user_id.clone() })
            }
            RecommendationType::Similar => request
                .product_id
                .map(|product| Self::Similar { product })
                .ok_or_else(|| DomainError::invalid("product_id is required for similar")),
            RecommendationType::Trending => {
                Ok(Self::Trending { period: request.period.unwrap_or(TrendPeriod::Weekly) })
            }
            RecommendationType::OccasionBased => {
                let occasion = request.occasion.as_deref().unwrap_or_default();
                Ok(Self::Occasion { occasion: validate_occasion(occasion)?.to_string() })
            }
            RecommendationType::PriceBased => match (request.price_min, request.price_max) {
                (Some(min), Some(max)) => {
                    validate_price_range(min, max)?;
                    Ok(Self::PriceBand { min, max })
                }
                _ => Err(DomainError::invalid(
                    "price_min and price_max are required for price_based",
                )),
            },
        }
    }
}

fn validate_occasion(occasion: &str) -> Result<&str, DomainError> {
    let occasion = occasion.trim();
    if occasion.is_empty() {
        return Err(DomainError::invalid("occasion is required for occasion_based"));
    }
    Ok(occasion)
}

fn validate_price_range(min: Decimal, max: Decimal) -> Result<(), DomainError> {
    if min.is_sign_negative() || max.is_sign_negative() {
        return Err(DomainError::invalid("price bounds must not be negative"));
    }
    if min > max {
        return Err(DomainError::invalid(format!("price_min {min} exceeds price_max {max}")));
    }
    Ok(())
}

fn merge_strategy(
    merger: &mut CandidateMerger,
    outcome: RecommendResult<Vec<RecommendationCandidate>>,
    weight: f64,
    category: CandidateCategory,
    user: &UserId,
) {
    match outcome {
        Ok(candidates) => merger.merge(candidates, weight, category),
        Err(error) => warn!(
            event_name = "recommendation.strategy.failed",
            strategy = category.as_str(),
            user_id = %user,
            error = %error,
            "recommendation strategy failed; continuing without it"
        ),
    }
}

/// Hybrid recommendation engine.
///
/// Holds only shared store handles and immutable settings, so clones are
/// cheap and can be handed to concurrent request handlers.
#[derive(Clone)]
pub struct RecommendationEngine {
    stores: EngineStores,
    settings: RecommendationSettings,
}

impl RecommendationEngine {
    pub fn new(stores: EngineStores, settings: RecommendationSettings) -> Self {
        Self { stores, settings }
    }

    pub fn settings(&self) -> &RecommendationSettings {
        &self.settings
    }

    /// Validates the request and dispatches on its type.
    pub async fn recommend(
        &self,
        request: RecommendationRequest,
    ) -> RecommendResult<RecommendationResponse> {
        let plan = Plan::from_request(&request)?;
        let limit = self.settings.effective_limit(request.limit);

        match plan {
            Plan::Personalized { user } => self.personalized(user.as_ref(), limit).await,
            Plan::Similar { product } => self.similar_products(product, limit).await,
            Plan::Trending { period } => self.trending_products(period, limit).await,
            Plan::Occasion { occasion } => self.occasion_recommendations(&occasion, limit).await,
            Plan::PriceBand { min, max } => self.price_recommendations(min, max, limit).await,
        }
    }

    pub async fn personalized_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> RecommendResult<RecommendationResponse> {
        let limit = self.settings.effective_limit(request.limit);
        self.personalized(request.user_id.as_ref(), limit).await
    }

    async fn personalized(
        &self,
        user: Option<&UserId>,
        limit: usize,
    ) -> RecommendResult<RecommendationResponse> {
        let Some(user) = user else {
            return self.trending_products(TrendPeriod::Weekly, limit).await;
        };

        let summaries = self.aggregate_interactions(user).await?;
        if summaries.len() < self.settings.min_interactions {
            debug!(
                event_name = "recommendation.personalized.cold_start",
                user_id = %user,
                interactions = summaries.len(),
                "not enough interactions; serving trending products"
            );
            return self.trending_products(TrendPeriod::Weekly, limit).await;
        }

        let weights = self.settings.strategy_weights;
        let mut merger = CandidateMerger::new();

        let collaborative = self.collaborative_candidates(user, limit * 2).await;
        merge_strategy(
            &mut merger,
            collaborative,
            weights.collaborative,
            CandidateCategory::Collaborative,
            user,
        );

        let content = self.content_candidates(user, limit * 2).await;
        merge_strategy(&mut merger, content, weights.content, CandidateCategory::ContentBased, user);

        let popular = self.popularity_candidates(limit).await;
        merge_strategy(&mut merger, popular, weights.popularity, CandidateCategory::Popularity, user);

        let trending =
            self.trending_candidates(TrendPeriod::Weekly, limit, TRENDING_STRATEGY_REASON).await;
        merge_strategy(&mut merger, trending, weights.trending, CandidateCategory::Trending, user);

        let candidates = merger.into_ranked(limit);
        debug!(
            event_name = "recommendation.personalized.ranked",
            user_id = %user,
            candidates = candidates.len(),
            "personalized candidates ranked"
        );
        Ok(RecommendationResponse::new(
            RecommendationType::Personalized,
            candidates,
            PERSONALIZED_EXPLANATION,
        ))
    }

    /// Products related to `product_id`: stored similarities first, then
    /// same-type and similar-price padding.
    pub async fn similar_products(
        &self,
        product_id: ProductId,
        limit: usize,
    ) -> RecommendResult<RecommendationResponse> {
        let limit = self.settings.effective_limit(Some(limit));
        let reference = self
            .stores
            .catalog
            .product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", product_id))?;

        let mut merger = CandidateMerger::new();
        let stored = self.stores.recommendations.similarities_for(product_id, limit * 2).await?;
        for similarity in stored {
            let other = similarity.other(product_id);
            if other == product_id || merger.contains(other) {
                continue;
            }
            if let Some(product) = self.stores.catalog.product(other).await? {
                merger.insert_new(RecommendationCandidate::new(
                    product,
                    similarity.score,
                    SIMILAR_REASON,
                    CandidateCategory::SimilarProducts,
                ));
            }
        }

        if merger.len() < limit {
            let exclude = [product_id];
            let same_type = self
                .stores
                .catalog
                .products_by_flower_type(&reference.flower_type, &exclude, limit)
                .await?;
            for product in same_type {
                let reason = format!("Same flower type: {}", product.flower_type);
                merger.insert_new(RecommendationCandidate::new(
                    product,
                    SAME_TYPE_SCORE,
                    reason,
                    CandidateCategory::SameType,
                ));
            }

            let min = reference.base_price * Decimal::new(8, 1);
            let max = reference.base_price * Decimal::new(12, 1);
            let similar_price =
                self.stores.catalog.products_in_price_range(min, max, &exclude, limit).await?;
            for product in similar_price {
                merger.insert_new(RecommendationCandidate::new(
                    product,
                    SIMILAR_PRICE_SCORE,
                    SIMILAR_PRICE_REASON,
                    CandidateCategory::SimilarPrice,
                ));
            }
        }

        Ok(RecommendationResponse::new(
            RecommendationType::Similar,
            merger.into_ranked(limit),
            format!("Products similar to {}", reference.name),
        ))
    }

    /// Stored trending rows for `period`, or popular products when the
    /// period has no rows yet.
    pub async fn trending_products(
        &self,
        period: TrendPeriod,
        limit: usize,
    ) -> RecommendResult<RecommendationResponse> {
        let limit = self.settings.effective_limit(Some(limit));
        let mut candidates = self.trending_candidates(period, limit, TRENDING_REASON).await?;

        if candidates.is_empty() {
            debug!(
                event_name = "recommendation.trending.fallback",
                period = period.as_str(),
                "no trending rows; serving popular products"
            );
            candidates = self
                .popularity_candidates(limit)
                .await?
                .into_iter()
                .map(|candidate| RecommendationCandidate {
                    reason: TRENDING_FALLBACK_REASON.to_string(),
                    category: CandidateCategory::Popular,
                    ..candidate
                })
                .collect();
        }

        Ok(RecommendationResponse::new(
            RecommendationType::Trending,
            candidates,
            TRENDING_EXPLANATION,
        ))
    }

    pub async fn occasion_recommendations(
        &self,
        occasion: &str,
        limit: usize,
    ) -> RecommendResult<RecommendationResponse> {
        let occasion = validate_occasion(occasion)?;
        let limit = self.settings.effective_limit(Some(limit));

        let products = self.stores.catalog.products_by_occasion(occasion, &[], limit).await?;
        let reason = format!("Perfect for {occasion}");
        let candidates = products
            .into_iter()
            .map(|product| {
                let score = occasion_score(&product);
                RecommendationCandidate::new(
                    product,
                    score,
                    reason.clone(),
                    CandidateCategory::OccasionBased,
                )
            })
            .collect();

        Ok(RecommendationResponse::new(
            RecommendationType::OccasionBased,
            rank_candidates(candidates, limit),
            format!("Perfect flowers for {occasion}"),
        ))
    }

    pub async fn price_recommendations(
        &self,
        min: Decimal,
        max: Decimal,
        limit: usize,
    ) -> RecommendResult<RecommendationResponse> {
        validate_price_range(min, max)?;
        let limit = self.settings.effective_limit(Some(limit));

        let products = self.stores.catalog.products_in_price_range(min, max, &[], limit).await?;
        let (low, high) = (min.to_f64().unwrap_or(0.0), max.to_f64().unwrap_or(0.0));
        let candidates = products
            .into_iter()
            .map(|product| {
                let score = price_band_score(&product, low, high);
                RecommendationCandidate::new(
                    product,
                    score,
                    PRICE_REASON,
                    CandidateCategory::PriceBased,
                )
            })
            .collect();

        Ok(RecommendationResponse::new(
            RecommendationType::PriceBased,
            rank_candidates(candidates, limit),
            PRICE_EXPLANATION,
        ))
    }

    /// Scored interaction summaries for `user`, highest first.
    pub async fn aggregate_interactions(
        &self,
        user: &UserId,
    ) -> RecommendResult<Vec<UserInteractionSummary>> {
        let counts = self.stores.interactions.interaction_counts(user).await?;
        Ok(summarize_interactions(user, counts, &self.settings.interaction_weights))
    }

    async fn collaborative_candidates(
        &self,
        user: &UserId,
        limit: usize,
    ) -> RecommendResult<Vec<RecommendationCandidate>> {
        let peers =
            self.stores.interactions.similar_users(user, self.settings.similar_user_limit).await?;
        if peers.is_empty() {
            return Err(DomainError::not_found("peer group", user).into());
        }

        let owned: HashSet<ProductId> = self
            .stores
            .interactions
            .purchase_history(user)
            .await?
            .into_iter()
            .map(|product| product.id)
            .collect();

        let share = 1.0 / peers.len() as f64;
        let mut scored: BTreeMap<ProductId, (Product, f64)> = BTreeMap::new();
        for peer in &peers {
            let history = match self.stores.interactions.purchase_history(peer).await {
                Ok(history) => history,
                Err(error) => {
                    debug!(
                        event_name = "recommendation.collaborative.peer_skipped",
                        peer_id = %peer,
                        error = %error,
                        "could not read peer purchase history"
                    );
                    continue;
                }
            };
            for product in history {
                if owned.contains(&product.id) {
                    continue;
                }
                scored.entry(product.id).or_insert((product, 0.0)).1 += share;
            }
        }

        let candidates = scored
            .into_values()
            .map(|(product, score)| {
                RecommendationCandidate::new(
                    product,
                    score,
                    COLLABORATIVE_REASON,
                    CandidateCategory::Collaborative,
                )
            })
            .collect();
        Ok(rank_candidates(candidates, limit))
    }

    async fn content_candidates(
        &self,
        user: &UserId,
        limit: usize,
    ) -> RecommendResult<Vec<RecommendationCandidate>> {
        let history = self.stores.interactions.purchase_history(user).await?;
        let owned: Vec<ProductId> = history.iter().map(|product| product.id).collect();
        let mut candidates = Vec::new();

        if let Some(profile) = self.stores.recommendations.preference_profile(user).await? {
            let preferred = profile.preferred_flower_types(self.settings.preferred_flower_threshold);
            if !preferred.is_empty() {
                let per_type = limit / preferred.len() + 1;
                for (flower_type, weight) in preferred {
                    let products = self
                        .stores
                        .catalog
                        .products_by_flower_type(flower_type, &owned, per_type)
                        .await?;
                    let reason = format!("Based on your preference for {flower_type}");
                    candidates.extend(products.into_iter().map(|product| {
                        RecommendationCandidate::new(
                            product,
                            weight,
                            reason.clone(),
                            CandidateCategory::ContentBased,
                        )
                    }));
                }
                return Ok(candidates);
            }
        }

        if history.is_empty() {
            return Err(DomainError::not_found("purchase history", user).into());
        }

        let mut type_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for product in &history {
            *type_counts.entry(product.flower_type.as_str()).or_insert(0) += 1;
        }

        let per_type = limit / type_counts.len() + 1;
        let total = history.len() as f64;
        for (flower_type, count) in type_counts {
            let share = count as f64 / total;
            if share <= self.settings.history_share_threshold {
                continue;
            }
            let products =
                self.stores.catalog.products_by_flower_type(flower_type, &owned, per_type).await?;
            let reason = format!("Based on your past purchases of {flower_type}");
            candidates.extend(products.into_iter().map(|product| {
                RecommendationCandidate::new(
                    product,
                    share,
                    reason.clone(),
                    CandidateCategory::ContentBased,
                )
            }));
        }

        Ok(candidates)
    }

    async fn popularity_candidates(
        &self,
        limit: usize,
    ) -> RecommendResult<Vec<RecommendationCandidate>> {
        let products = self.stores.catalog.all_products().await?;
        let candidates = products
            .into_iter()
            .map(|product| {
                let score = popularity_score(&product);
                RecommendationCandidate::new(
                    product,
                    score,
                    POPULARITY_REASON,
                    CandidateCategory::Popular,
                )
            })
            .collect();
        Ok(rank_candidates(candidates, limit))
    }

    async fn trending_candidates(
        &self,
        period: TrendPeriod,
        limit: usize,
        reason: &str,
    ) -> RecommendResult<Vec<RecommendationCandidate>> {
        let rows = self.stores.recommendations.trending_products(period, limit).await?;
        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            match self.stores.catalog.product(row.product_id).await? {
                Some(product) => candidates.push(RecommendationCandidate::new(
                    product,
                    row.trend_score,
                    reason,
                    CandidateCategory::Trending,
                )),
                None => debug!(
                    event_name = "recommendation.trending.missing_product",
                    product_id = %row.product_id,
                    "trending row references a product no longer in the catalog"
                ),
            }
        }
        Ok(candidates)
    }

    /// Rebuilds and stores the preference profile of `user`. Returns `None`
    /// without writing when the user has too few interactions.
    pub async fn update_user_preferences(
        &self,
        user: &UserId,
    ) -> RecommendResult<Option<UserPreferenceProfile>> {
        let summaries = self.aggregate_interactions(user).await?;
        if summaries.len() < self.settings.min_interactions {
            debug!(
                event_name = "maintenance.preferences.skipped",
                user_id = %user,
                interactions = summaries.len(),
                "not enough interactions to build a preference profile"
            );
            return Ok(None);
        }

        let mut products = HashMap::with_capacity(summaries.len());
        for summary in &summaries {
            if let Some(product) = self.stores.catalog.product(summary.product_id()).await? {
                products.insert(product.id, product);
            }
        }

        let Some(profile) = build_profile(
            user,
            &summaries,
            &products,
            self.settings.min_interactions,
            Utc::now(),
        ) else {
            return Ok(None);
        };

        self.stores.recommendations.upsert_preference_profile(&profile).await?;
        info!(
            event_name = "maintenance.preferences.updated",
            user_id = %user,
            flower_types = profile.flower_weights.len(),
            occasions = profile.occasion_weights.len(),
            "user preference profile updated"
        );
        Ok(Some(profile))
    }

    /// Refreshes the profile of every user active since `since`. Per-user
    /// failures are logged and skipped; returns the number of stored profiles.
    pub async fn refresh_active_user_preferences(
        &self,
        since: DateTime<Utc>,
    ) -> RecommendResult<usize> {
        let users = self.stores.interactions.recently_active_users(since).await?;
        let mut updated = 0;
        for user in &users {
            match self.update_user_preferences(user).await {
                Ok(Some(_)) => updated += 1,
                Ok(None) => {}
                Err(error) => warn!(
                    event_name = "maintenance.preferences.failed",
                    user_id = %user,
                    error = %error,
                    "preference refresh failed for user"
                ),
            }
        }
        Ok(updated)
    }

    pub async fn calculate_product_similarities(
        &self,
        product_id: ProductId,
    ) -> RecommendResult<SimilarityRun> {
        let target = self
            .stores
            .catalog
            .product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", product_id))?;
        let catalog = self.stores.catalog.all_products().await?;

        let run = self.store_similarities(&target, &catalog, Utc::now()).await;
        info!(
            event_name = "maintenance.similarities.calculated",
            product_id = %product_id,
            pairs_stored = run.pairs_stored,
            failed_writes = run.failed_writes,
            "product similarities calculated"
        );
        run.into_result()
    }

    /// Runs the similarity pass for every catalog product. Each unordered
    /// pair is scored once.
    pub async fn calculate_all_similarities(&self) -> RecommendResult<SimilarityRun> {
        let mut catalog = self.stores.catalog.all_products().await?;
        catalog.sort_by_key(|product| product.id);

        let now = Utc::now();
        let mut total = SimilarityRun::default();
        for (position, target) in catalog.iter().enumerate() {
            let run = self.store_similarities(target, &catalog[position + 1..], now).await;
            total.absorb(run);
        }

        info!(
            event_name = "maintenance.similarities.calculated_all",
            products = total.products,
            pairs_stored = total.pairs_stored,
            failed_writes = total.failed_writes,
            "catalog similarities calculated"
        );
        total.into_result()
    }

    async fn store_similarities(
        &self,
        target: &Product,
        others: &[Product],
        now: DateTime<Utc>,
    ) -> SimilarityRun {
        let mut run = SimilarityRun { products: 1, ..SimilarityRun::default() };
        for similarity in score_against_catalog(target, others, self.settings.min_similarity, now)
        {
            match self.stores.recommendations.upsert_similarity(&similarity).await {
                Ok(()) => run.pairs_stored += 1,
                Err(error) => {
                    run.failed_writes += 1;
                    warn!(
                        event_name = "maintenance.similarities.write_failed",
                        product_a = %similarity.product_a,
                        product_b = %similarity.product_b,
                        error = %error,
                        "similarity write failed; continuing"
                    );
                }
            }
        }
        run
    }

    /// Recomputes and replaces the trend rows of one period.
    pub async fn update_trending_period(
        &self,
        period: TrendPeriod,
    ) -> RecommendResult<TrendRefresh> {
        let catalog = self.stores.catalog.all_products().await?;
        self.refresh_period(&catalog, period, Utc::now()).await
    }

    /// Recomputes daily, weekly and monthly trend rows.
    pub async fn update_trending_products(&self) -> RecommendResult<Vec<TrendRefresh>> {
        let catalog = self.stores.catalog.all_products().await?;
        let now = Utc::now();
        let mut refreshed = Vec::with_capacity(TrendPeriod::ALL.len());
        for period in TrendPeriod::ALL {
            refreshed.push(self.refresh_period(&catalog, period, now).await?);
        }
        Ok(refreshed)
    }

    async fn refresh_period(
        &self,
        catalog: &[Product],
        period: TrendPeriod,
        now: DateTime<Utc>,
    ) -> RecommendResult<TrendRefresh> {
        let activity = self.stores.interactions.period_activity(period.window_start(now)).await?;
        let rows = score_period(catalog, &activity, period, self.settings.trend_threshold, now);
        self.stores.recommendations.replace_trending_products(period, &rows).await?;
        info!(
            event_name = "maintenance.trending.refreshed",
            period = period.as_str(),
            rows = rows.len(),
            "trending products refreshed"
        );
        Ok(TrendRefresh { period, rows: rows.len() })
    }

    /// Validates and appends one feedback event.
    pub async fn record_feedback(
        &self,
        input: FeedbackInput,
    ) -> RecommendResult<RecommendationFeedback> {
        let recommendation_type = input.recommendation_type.parse::<RecommendationType>()?;
        let action = input.action.parse::<FeedbackAction>()?;
        let user_id = input
            .user_id
            .filter(|user| !user.as_str().trim().is_empty())
            .unwrap_or_else(|| UserId::new(ANONYMOUS_USER));

        let feedback = RecommendationFeedback {
            id: Uuid::new_v4(),
            user_id,
            session_id: input.session_id,
            product_id: input.product_id,
            recommendation_type,
            action,
            created_at: Utc::now(),
        };
        self.stores.feedback.append_feedback(&feedback).await?;
        debug!(
            event_name = "recommendation.feedback.recorded",
            feedback_id = %feedback.id,
            recommendation_type = recommendation_type.as_str(),
            action = action.as_str(),
            "recommendation feedback recorded"
        );
        Ok(feedback)
    }

    pub async fn recommendation_stats(
        &self,
        window: TrendPeriod,
    ) -> RecommendResult<RecommendationStats> {
        let tallies = self.stores.feedback.feedback_tallies(window.window_start(Utc::now())).await?;
        Ok(summarize_feedback(window, &tallies))
    }
}
