use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use bloom_core::domain::feedback::{FeedbackTally, RecommendationFeedback};
use bloom_core::domain::interaction::{
    InteractionCounts, InteractionEvent, InteractionKind, PeriodActivity, UserId,
};
use bloom_core::domain::preference::UserPreferenceProfile;
use bloom_core::domain::pricing::{PricingRule, SpecialDayId};
use bloom_core::domain::product::{FlowerTypeDirectory, FlowerTypeId, Product, ProductId};
use bloom_core::domain::similarity::ProductSimilarity;
use bloom_core::domain::trending::{TrendPeriod, TrendingProduct};
use bloom_core::store::{
    CatalogStore, FeedbackStore, InteractionStore, PricingRuleStore, RecommendationStore,
    StoreResult,
};

#[derive(Clone, Debug)]
struct OrderRecord {
    user: UserId,
    completed: bool,
    ordered_at: DateTime<Utc>,
    lines: Vec<(ProductId, u32)>,
}

#[derive(Clone, Debug)]
struct ReviewRecord {
    user: UserId,
    product: ProductId,
    rating: u32,
}

#[derive(Default)]
struct MemoryState {
    products: BTreeMap<ProductId, Product>,
    flower_types: BTreeMap<String, FlowerTypeId>,
    interactions: Vec<InteractionEvent>,
    orders: Vec<OrderRecord>,
    reviews: Vec<ReviewRecord>,
    profiles: HashMap<UserId, UserPreferenceProfile>,
    similarities: BTreeMap<(ProductId, ProductId), ProductSimilarity>,
    trending: HashMap<TrendPeriod, Vec<TrendingProduct>>,
    rules: Vec<PricingRule>,
    special_days: Vec<(SpecialDayId, NaiveDate)>,
    feedback: Vec<RecommendationFeedback>,
}

/// Store implementing every engine seam over process memory. Product
/// snapshots keep the aggregate fields (rating, review count, sales rank)
/// they were inserted with; recorded reviews and orders only feed the
/// per-user interaction queries.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product, registering its flower type.
    pub async fn insert_product(&self, product: Product) {
        let mut state = self.state.write().await;
        let next_id = FlowerTypeId(state.flower_types.len() as i64 + 1);
        state.flower_types.entry(product.flower_type.clone()).or_insert(next_id);
        state.products.insert(product.id, product);
    }

    pub async fn remove_product(&self, id: ProductId) {
        self.state.write().await.products.remove(&id);
    }

    pub async fn flower_type_id(&self, name: &str) -> Option<FlowerTypeId> {
        self.state.read().await.flower_types.get(name).copied()
    }

    pub async fn record_interaction(&self, event: InteractionEvent) {
        self.state.write().await.interactions.push(event);
    }

    /// Records an order; only `completed` orders count as purchases.
    pub async fn record_order(
        &self,
        user: &UserId,
        completed: bool,
        ordered_at: DateTime<Utc>,
        lines: &[(ProductId, u32)],
    ) {
        self.state.write().await.orders.push(OrderRecord {
            user: user.clone(),
            completed,
            ordered_at,
            lines: lines.to_vec(),
        });
    }

    pub async fn record_review(&self, user: &UserId, product: ProductId, rating: u32) {
        self.state.write().await.reviews.push(ReviewRecord {
            user: user.clone(),
            product,
            rating,
        });
    }

    pub async fn insert_rule(&self, rule: PricingRule) {
        let mut state = self.state.write().await;
        state.rules.retain(|existing| existing.id != rule.id);
        state.rules.push(rule);
    }

    pub async fn insert_special_day(&self, id: SpecialDayId, date: NaiveDate) {
        self.state.write().await.special_days.push((id, date));
    }

    pub async fn similarity_count(&self) -> usize {
        self.state.read().await.similarities.len()
    }

    pub async fn feedback_events(&self) -> Vec<RecommendationFeedback> {
        self.state.read().await.feedback.clone()
    }
}

impl MemoryState {
    fn completed_orders<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a OrderRecord> {
        self.orders.iter().filter(move |order| order.completed && &order.user == user)
    }

    fn purchased_products(&self, user: &UserId) -> BTreeSet<ProductId> {
        self.completed_orders(user)
            .flat_map(|order| order.lines.iter().map(|(product, _)| *product))
            .collect()
    }

    fn newest_in_stock<F>(&self, exclude: &[ProductId], limit: usize, keep: F) -> Vec<Product>
    where
        F: Fn(&Product) -> bool,
    {
        let mut found: Vec<Product> = self
            .products
            .values()
            .filter(|product| product.in_stock() && !exclude.contains(&product.id))
            .filter(|product| keep(product))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        found.truncate(limit);
        found
    }
}

fn counts_entry(
    counts: &mut BTreeMap<ProductId, InteractionCounts>,
    product: ProductId,
) -> &mut InteractionCounts {
    counts
        .entry(product)
        .or_insert_with(|| InteractionCounts { product_id: product, ..Default::default() })
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn all_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.state.read().await.products.values().cloned().collect())
    }

    async fn products_by_flower_type(
        &self,
        flower_type: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        Ok(state.newest_in_stock(exclude, limit, |product| product.flower_type == flower_type))
    }

    async fn products_by_occasion(
        &self,
        occasion: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        Ok(state.newest_in_stock(exclude, limit, |product| product.has_occasion(occasion)))
    }

    async fn products_in_price_range(
        &self,
        min: Decimal,
        max: Decimal,
        exclude: &[ProductId],
        limit: usize,
    ) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        Ok(state.newest_in_stock(exclude, limit, |product| {
            product.base_price >= min && product.base_price <= max
        }))
    }

    async fn flower_type_directory(&self) -> StoreResult<FlowerTypeDirectory> {
        let state = self.state.read().await;
        Ok(FlowerTypeDirectory::new(
            state.flower_types.iter().map(|(name, id)| (name.clone(), *id)),
        ))
    }
}

#[async_trait::async_trait]
impl InteractionStore for InMemoryStore {
    async fn interaction_counts(&self, user: &UserId) -> StoreResult<Vec<InteractionCounts>> {
        let state = self.state.read().await;
        let mut counts: BTreeMap<ProductId, InteractionCounts> = BTreeMap::new();

        for event in state.interactions.iter().filter(|event| &event.user_id == user) {
            let row = counts_entry(&mut counts, event.product_id);
            match event.kind {
                InteractionKind::View => row.view_count += 1,
                InteractionKind::AddToCart => row.cart_adds += 1,
                InteractionKind::WishlistAdd => row.wishlist_adds += 1,
            }
        }
        for order in state.completed_orders(user) {
            for (product, _) in &order.lines {
                counts_entry(&mut counts, *product).purchase_count += 1;
            }
        }
        for review in state.reviews.iter().filter(|review| &review.user == user) {
            let row = counts_entry(&mut counts, review.product);
            row.review_count += 1;
            row.total_rating += review.rating;
        }

        Ok(counts.into_values().collect())
    }

    async fn purchase_history(&self, user: &UserId) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut last_ordered: HashMap<ProductId, DateTime<Utc>> = HashMap::new();
        for order in state.completed_orders(user) {
            for (product, _) in &order.lines {
                let seen = last_ordered.entry(*product).or_insert(order.ordered_at);
                if order.ordered_at > *seen {
                    *seen = order.ordered_at;
                }
            }
        }

        let mut history: Vec<(DateTime<Utc>, Product)> = last_ordered
            .into_iter()
            .filter_map(|(id, at)| state.products.get(&id).map(|product| (at, product.clone())))
            .collect();
        history.sort_by(|(at_a, a), (at_b, b)| at_b.cmp(at_a).then(a.id.cmp(&b.id)));
        Ok(history.into_iter().map(|(_, product)| product).collect())
    }

    async fn similar_users(&self, user: &UserId, limit: usize) -> StoreResult<Vec<UserId>> {
        let state = self.state.read().await;
        let owned = state.purchased_products(user);

        let mut overlap: BTreeMap<UserId, BTreeSet<ProductId>> = BTreeMap::new();
        for order in state.orders.iter().filter(|order| order.completed && &order.user != user) {
            for (product, _) in &order.lines {
                if owned.contains(product) {
                    overlap.entry(order.user.clone()).or_default().insert(*product);
                }
            }
        }

        let mut ranked: Vec<(UserId, usize)> =
            overlap.into_iter().map(|(peer, shared)| (peer, shared.len())).collect();
        ranked.sort_by(|(user_a, a), (user_b, b)| b.cmp(a).then(user_a.cmp(user_b)));
        ranked.truncate(limit);
        Ok(ranked.into_iter().map(|(peer, _)| peer).collect())
    }

    async fn period_activity(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<HashMap<ProductId, PeriodActivity>> {
        let state = self.state.read().await;
        let mut activity: HashMap<ProductId, PeriodActivity> = HashMap::new();

        for event in &state.interactions {
            if event.kind == InteractionKind::View && event.occurred_at >= since {
                activity.entry(event.product_id).or_default().view_count += 1;
            }
        }
        let recent = state.orders.iter().filter(|order| order.completed && order.ordered_at >= since);
        for order in recent {
            for (product, quantity) in &order.lines {
                activity.entry(*product).or_default().purchase_count += quantity;
            }
        }

        Ok(activity)
    }

    async fn recently_active_users(&self, since: DateTime<Utc>) -> StoreResult<Vec<UserId>> {
        let state = self.state.read().await;
        let users: BTreeSet<UserId> = state
            .interactions
            .iter()
            .filter(|event| event.occurred_at >= since)
            .map(|event| event.user_id.clone())
            .chain(
                state
                    .orders
                    .iter()
                    .filter(|order| order.ordered_at >= since)
                    .map(|order| order.user.clone()),
            )
            .collect();
        Ok(users.into_iter().collect())
    }
}

#[async_trait::async_trait]
impl RecommendationStore for InMemoryStore {
    async fn preference_profile(
        &self,
        user: &UserId,
    ) -> StoreResult<Option<UserPreferenceProfile>> {
        Ok(self.state.read().await.profiles.get(user).cloned())
    }

    async fn upsert_preference_profile(&self, profile: &UserPreferenceProfile) -> StoreResult<()> {
        self.state.write().await.profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn similarities_for(
        &self,
        product: ProductId,
        limit: usize,
    ) -> StoreResult<Vec<ProductSimilarity>> {
        let state = self.state.read().await;
        let mut found: Vec<ProductSimilarity> = state
            .similarities
            .values()
            .filter(|pair| pair.product_a == product || pair.product_b == product)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.product_a.cmp(&b.product_a))
                .then(a.product_b.cmp(&b.product_b))
        });
        found.truncate(limit);
        Ok(found)
    }

    async fn upsert_similarity(&self, similarity: &ProductSimilarity) -> StoreResult<()> {
        self.state
            .write()
            .await
            .similarities
            .insert((similarity.product_a, similarity.product_b), similarity.clone());
        Ok(())
    }

    async fn trending_products(
        &self,
        period: TrendPeriod,
        limit: usize,
    ) -> StoreResult<Vec<TrendingProduct>> {
        let state = self.state.read().await;
        let mut rows = state.trending.get(&period).cloned().unwrap_or_default();
        rows.sort_by(|a, b| {
            b.trend_score.total_cmp(&a.trend_score).then(a.product_id.cmp(&b.product_id))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn replace_trending_products(
        &self,
        period: TrendPeriod,
        rows: &[TrendingProduct],
    ) -> StoreResult<()> {
        self.state.write().await.trending.insert(period, rows.to_vec());
        Ok(())
    }
}

#[async_trait::async_trait]
impl PricingRuleStore for InMemoryStore {
    async fn active_rules(&self) -> StoreResult<Vec<PricingRule>> {
        let state = self.state.read().await;
        let mut rules: Vec<PricingRule> =
            state.rules.iter().filter(|rule| rule.is_active).cloned().collect();
        rules.sort_by_key(|rule| rule.id);
        Ok(rules)
    }

    async fn active_special_days(&self, date: NaiveDate) -> StoreResult<HashSet<SpecialDayId>> {
        let state = self.state.read().await;
        Ok(state.special_days.iter().filter(|(_, day)| *day == date).map(|(id, _)| *id).collect())
    }
}

#[async_trait::async_trait]
impl FeedbackStore for InMemoryStore {
    async fn append_feedback(&self, feedback: &RecommendationFeedback) -> StoreResult<()> {
        self.state.write().await.feedback.push(feedback.clone());
        Ok(())
    }

    async fn feedback_tallies(&self, since: DateTime<Utc>) -> StoreResult<Vec<FeedbackTally>> {
        let state = self.state.read().await;
        let mut grouped: BTreeMap<(&'static str, &'static str), FeedbackTally> = BTreeMap::new();
        for event in state.feedback.iter().filter(|event| event.created_at >= since) {
            grouped
                .entry((event.recommendation_type.as_str(), event.action.as_str()))
                .or_insert_with(|| FeedbackTally {
                    recommendation_type: event.recommendation_type,
                    action: event.action,
                    count: 0,
                })
                .count += 1;
        }
        Ok(grouped.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use bloom_core::domain::interaction::{InteractionEvent, InteractionKind, UserId};
    use bloom_core::domain::product::{Product, ProductId, ProductStatus};
    use bloom_core::store::{CatalogStore, InteractionStore};

    use super::InMemoryStore;

    fn product(id: i64, flower_type: &str, price: i64, age_days: i64) -> Product {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single().expect("valid timestamp");
        Product {
            id: ProductId(id),
            name: format!("bouquet {id}"),
            flower_type: flower_type.to_string(),
            base_price: Decimal::new(price, 0),
            status: ProductStatus::NewFlower,
            stock_quantity: 3,
            occasions: vec![],
            average_rating: 0.0,
            review_count: 0,
            sales_rank: None,
            created_at: base - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn catalog_queries_match_sql_ordering() {
        let store = InMemoryStore::new();
        store.insert_product(product(1, "Rose", 20, 3)).await;
        store.insert_product(product(2, "Rose", 30, 1)).await;
        store.insert_product(product(3, "Tulip", 25, 0)).await;
        let mut sold_out = product(4, "Rose", 22, 0);
        sold_out.stock_quantity = 0;
        store.insert_product(sold_out).await;

        let roses = store.products_by_flower_type("Rose", &[], 10).await.expect("roses");
        let ids: Vec<i64> = roses.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![2, 1]);

        let priced = store
            .products_in_price_range(Decimal::new(20, 0), Decimal::new(25, 0), &[ProductId(3)], 10)
            .await
            .expect("priced");
        assert_eq!(priced.len(), 1);
        assert_eq!(priced[0].id, ProductId(1));

        let directory = store.flower_type_directory().await.expect("directory");
        assert_eq!(directory.len(), 2);
    }

    #[tokio::test]
    async fn interaction_counts_merge_every_source() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single().expect("valid timestamp");
        store
            .record_interaction(InteractionEvent {
                user_id: user.clone(),
                product_id: ProductId(1),
                kind: InteractionKind::WishlistAdd,
                occurred_at: at,
            })
            .await;
        store.record_order(&user, true, at, &[(ProductId(1), 2), (ProductId(2), 1)]).await;
        store.record_order(&user, false, at, &[(ProductId(3), 1)]).await;
        store.record_review(&user, ProductId(2), 5).await;

        let counts = store.interaction_counts(&user).await.expect("counts");
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].wishlist_adds, 1);
        assert_eq!(counts[0].purchase_count, 1);
        assert_eq!(counts[1].total_rating, 5);

        let activity = store.period_activity(at).await.expect("activity");
        assert_eq!(activity[&ProductId(1)].purchase_count, 2);
    }
}
