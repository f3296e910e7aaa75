use std::collections::BTreeMap;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use bloom_core::domain::interaction::UserId;
use bloom_core::domain::preference::{PriceBand, UserPreferenceProfile};
use bloom_core::domain::product::ProductId;
use bloom_core::domain::similarity::{ProductSimilarity, SimilarityKind};
use bloom_core::domain::trending::{TrendPeriod, TrendingProduct};
use bloom_core::store::{RecommendationStore, StoreError, StoreResult};

use super::catalog::sql_limit;
use super::{
    decode_count, decode_decimal, decode_error, decode_timestamp, encode_timestamp,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlRecommendationRepository {
    pool: DbPool,
}

impl SqlRecommendationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_profile(
        &self,
        user: &UserId,
    ) -> Result<Option<UserPreferenceProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, flower_preferences, occasion_preferences, price_min, price_max,
                    average_spent, last_updated
             FROM user_preference WHERE user_id = ?",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_profile(r)?)),
            None => Ok(None),
        }
    }

    async fn save_profile(&self, profile: &UserPreferenceProfile) -> Result<(), RepositoryError> {
        let flowers = serde_json::to_string(&profile.flower_weights).map_err(decode_error)?;
        let occasions = serde_json::to_string(&profile.occasion_weights).map_err(decode_error)?;

        sqlx::query(
            "INSERT INTO user_preference (user_id, flower_preferences, occasion_preferences,
                                          price_min, price_max, average_spent, last_updated)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 flower_preferences = excluded.flower_preferences,
                 occasion_preferences = excluded.occasion_preferences,
                 price_min = excluded.price_min,
                 price_max = excluded.price_max,
                 average_spent = excluded.average_spent,
                 last_updated = excluded.last_updated",
        )
        .bind(profile.user_id.as_str())
        .bind(flowers)
        .bind(occasions)
        .bind(profile.price_band.min.map(|v| v.to_string()))
        .bind(profile.price_band.max.map(|v| v.to_string()))
        .bind(profile.price_band.average_spent.map(|v| v.to_string()))
        .bind(encode_timestamp(profile.last_updated))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_similarities(
        &self,
        product: ProductId,
        limit: usize,
    ) -> Result<Vec<ProductSimilarity>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_a, product_b, similarity_score, similarity_type, updated_at
             FROM product_similarity
             WHERE product_a = ? OR product_b = ?
             ORDER BY similarity_score DESC, product_a ASC, product_b ASC
             LIMIT ?",
        )
        .bind(product.0)
        .bind(product.0)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_similarity).collect()
    }

    async fn save_similarity(&self, similarity: &ProductSimilarity) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product_similarity (product_a, product_b, similarity_score,
                                             similarity_type, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(product_a, product_b) DO UPDATE SET
                 similarity_score = excluded.similarity_score,
                 similarity_type = excluded.similarity_type,
                 updated_at = excluded.updated_at",
        )
        .bind(similarity.product_a.0)
        .bind(similarity.product_b.0)
        .bind(similarity.score)
        .bind(similarity.kind.as_str())
        .bind(encode_timestamp(similarity.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_trending(
        &self,
        period: TrendPeriod,
        limit: usize,
    ) -> Result<Vec<TrendingProduct>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_id, period, trend_score, view_count, purchase_count, updated_at
             FROM trending_product
             WHERE period = ?
             ORDER BY trend_score DESC, product_id ASC
             LIMIT ?",
        )
        .bind(period.as_str())
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_trending).collect()
    }

    async fn replace_trending(
        &self,
        period: TrendPeriod,
        rows: &[TrendingProduct],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM trending_product WHERE period = ?")
            .bind(period.as_str())
            .execute(&mut *tx)
            .await?;

        for row in rows {
            sqlx::query(
                "INSERT INTO trending_product (product_id, period, trend_score, view_count,
                                               purchase_count, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(row.product_id.0)
            .bind(period.as_str())
            .bind(row.trend_score)
            .bind(i64::from(row.view_count))
            .bind(i64::from(row.purchase_count))
            .bind(encode_timestamp(row.updated_at))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn row_to_profile(row: &SqliteRow) -> Result<UserPreferenceProfile, RepositoryError> {
    let user_id: String = row.try_get("user_id").map_err(decode_error)?;
    let flowers: String = row.try_get("flower_preferences").map_err(decode_error)?;
    let occasions: String = row.try_get("occasion_preferences").map_err(decode_error)?;
    let price_min: Option<String> = row.try_get("price_min").map_err(decode_error)?;
    let price_max: Option<String> = row.try_get("price_max").map_err(decode_error)?;
    let average_spent: Option<String> = row.try_get("average_spent").map_err(decode_error)?;
    let last_updated: String = row.try_get("last_updated").map_err(decode_error)?;

    let flower_weights: BTreeMap<String, f64> = serde_json::from_str(&flowers)
        .map_err(|e| RepositoryError::Decode(format!("flower_preferences of {user_id}: {e}")))?;
    let occasion_weights: BTreeMap<String, f64> = serde_json::from_str(&occasions)
        .map_err(|e| RepositoryError::Decode(format!("occasion_preferences of {user_id}: {e}")))?;

    Ok(UserPreferenceProfile {
        flower_weights,
        occasion_weights,
        price_band: PriceBand {
            min: price_min.as_deref().map(|v| decode_decimal("price_min", v)).transpose()?,
            max: price_max.as_deref().map(|v| decode_decimal("price_max", v)).transpose()?,
            average_spent: average_spent
                .as_deref()
                .map(|v| decode_decimal("average_spent", v))
                .transpose()?,
        },
        last_updated: decode_timestamp("last_updated", &last_updated)?,
        user_id: UserId(user_id),
    })
}

fn row_to_similarity(row: &SqliteRow) -> Result<ProductSimilarity, RepositoryError> {
    let product_a: i64 = row.try_get("product_a").map_err(decode_error)?;
    let product_b: i64 = row.try_get("product_b").map_err(decode_error)?;
    let score: f64 = row.try_get("similarity_score").map_err(decode_error)?;
    let kind: String = row.try_get("similarity_type").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    let kind = match kind.as_str() {
        "content" => SimilarityKind::Content,
        other => return Err(RepositoryError::Decode(format!("unknown similarity type `{other}`"))),
    };

    Ok(ProductSimilarity::new(
        ProductId(product_a),
        ProductId(product_b),
        score,
        kind,
        decode_timestamp("updated_at", &updated_at)?,
    ))
}

fn row_to_trending(row: &SqliteRow) -> Result<TrendingProduct, RepositoryError> {
    let product_id: i64 = row.try_get("product_id").map_err(decode_error)?;
    let period: String = row.try_get("period").map_err(decode_error)?;
    let trend_score: f64 = row.try_get("trend_score").map_err(decode_error)?;
    let view_count: i64 = row.try_get("view_count").map_err(decode_error)?;
    let purchase_count: i64 = row.try_get("purchase_count").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;

    Ok(TrendingProduct {
        product_id: ProductId(product_id),
        period: TrendPeriod::from_str(&period).map_err(decode_error)?,
        trend_score,
        view_count: decode_count("view_count", view_count)?,
        purchase_count: decode_count("purchase_count", purchase_count)?,
        updated_at: decode_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl RecommendationStore for SqlRecommendationRepository {
    async fn preference_profile(
        &self,
        user: &UserId,
    ) -> StoreResult<Option<UserPreferenceProfile>> {
        self.find_profile(user).await.map_err(StoreError::from)
    }

    async fn upsert_preference_profile(&self, profile: &UserPreferenceProfile) -> StoreResult<()> {
        self.save_profile(profile).await.map_err(StoreError::from)
    }

    async fn similarities_for(
        &self,
        product: ProductId,
        limit: usize,
    ) -> StoreResult<Vec<ProductSimilarity>> {
        self.list_similarities(product, limit).await.map_err(StoreError::from)
    }

    async fn upsert_similarity(&self, similarity: &ProductSimilarity) -> StoreResult<()> {
        self.save_similarity(similarity).await.map_err(StoreError::from)
    }

    async fn trending_products(
        &self,
        period: TrendPeriod,
        limit: usize,
    ) -> StoreResult<Vec<TrendingProduct>> {
        self.list_trending(period, limit).await.map_err(StoreError::from)
    }

    async fn replace_trending_products(
        &self,
        period: TrendPeriod,
        rows: &[TrendingProduct],
    ) -> StoreResult<()> {
        self.replace_trending(period, rows).await.map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use bloom_core::domain::interaction::UserId;
    use bloom_core::domain::preference::{PriceBand, UserPreferenceProfile};
    use bloom_core::domain::product::ProductId;
    use bloom_core::domain::similarity::{ProductSimilarity, SimilarityKind};
    use bloom_core::domain::trending::{TrendPeriod, TrendingProduct};
    use bloom_core::store::RecommendationStore;

    use super::SqlRecommendationRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        sqlx::query(
            "INSERT INTO flower_type (flower_type_id, name) VALUES (1, 'Rose');
             INSERT INTO product (product_id, name, flower_type_id, base_price, status, stock_quantity, created_at) VALUES
                (1, 'Red Roses', 1, '40.00', 'NewFlower', 5, '2026-01-01T00:00:00Z'),
                (2, 'White Roses', 1, '35.00', 'NewFlower', 5, '2026-01-02T00:00:00Z'),
                (3, 'Pink Roses', 1, '30.00', 'OldFlower', 5, '2026-01-03T00:00:00Z');",
        )
        .execute(&pool)
        .await
        .expect("catalog");
        pool
    }

    #[tokio::test]
    async fn profile_upsert_overwrites_previous_row() {
        let repo = SqlRecommendationRepository::new(setup().await);
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).single().expect("valid timestamp");
        let mut profile = UserPreferenceProfile {
            user_id: UserId::new("u1"),
            flower_weights: BTreeMap::from([("Rose".to_string(), 1.0), ("Tulip".to_string(), 0.4)]),
            occasion_weights: BTreeMap::from([("Birthday".to_string(), 1.0)]),
            price_band: PriceBand {
                min: Some(Decimal::new(2000, 2)),
                max: Some(Decimal::new(4000, 2)),
                average_spent: Some(Decimal::new(3167, 2)),
            },
            last_updated: at,
        };
        repo.upsert_preference_profile(&profile).await.expect("save");

        profile.flower_weights = BTreeMap::from([("Lily".to_string(), 1.0)]);
        profile.price_band = PriceBand::default();
        repo.upsert_preference_profile(&profile).await.expect("overwrite");

        let stored =
            repo.preference_profile(&UserId::new("u1")).await.expect("load").expect("present");
        assert_eq!(stored, profile);
        assert!(repo.preference_profile(&UserId::new("u2")).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn similarities_are_found_from_either_side_of_the_pair() {
        let repo = SqlRecommendationRepository::new(setup().await);
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).single().expect("valid timestamp");
        repo.upsert_similarity(&ProductSimilarity::new(
            ProductId(2),
            ProductId(1),
            0.6,
            SimilarityKind::Content,
            at,
        ))
        .await
        .expect("save");
        repo.upsert_similarity(&ProductSimilarity::new(
            ProductId(2),
            ProductId(3),
            0.8,
            SimilarityKind::Content,
            at,
        ))
        .await
        .expect("save");
        repo.upsert_similarity(&ProductSimilarity::new(
            ProductId(1),
            ProductId(2),
            0.9,
            SimilarityKind::Content,
            at,
        ))
        .await
        .expect("upsert existing pair");

        let for_two = repo.similarities_for(ProductId(2), 10).await.expect("load");
        let partners: Vec<i64> = for_two.iter().map(|s| s.other(ProductId(2)).0).collect();
        assert_eq!(partners, vec![1, 3]);
        assert!((for_two[0].score - 0.9).abs() < 1e-9);

        let for_three = repo.similarities_for(ProductId(3), 10).await.expect("load");
        assert_eq!(for_three.len(), 1);
    }

    #[tokio::test]
    async fn trending_replace_only_touches_the_given_period() {
        let repo = SqlRecommendationRepository::new(setup().await);
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).single().expect("valid timestamp");
        let row = |product: i64, period: TrendPeriod, score: f64| TrendingProduct {
            product_id: ProductId(product),
            period,
            trend_score: score,
            view_count: 3,
            purchase_count: 1,
            updated_at: at,
        };

        repo.replace_trending_products(
            TrendPeriod::Weekly,
            &[row(1, TrendPeriod::Weekly, 0.4), row(2, TrendPeriod::Weekly, 0.7)],
        )
        .await
        .expect("weekly");
        repo.replace_trending_products(TrendPeriod::Daily, &[row(3, TrendPeriod::Daily, 0.5)])
            .await
            .expect("daily");
        repo.replace_trending_products(TrendPeriod::Weekly, &[row(1, TrendPeriod::Weekly, 0.9)])
            .await
            .expect("weekly again");

        let weekly = repo.trending_products(TrendPeriod::Weekly, 10).await.expect("load");
        assert_eq!(weekly, vec![row(1, TrendPeriod::Weekly, 0.9)]);
        let daily = repo.trending_products(TrendPeriod::Daily, 10).await.expect("load");
        assert_eq!(daily.len(), 1);
        assert!(repo.trending_products(TrendPeriod::Monthly, 10).await.expect("load").is_empty());
    }
}
