use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::Row;

use bloom_core::domain::interaction::{
    InteractionCounts, InteractionEvent, PeriodActivity, UserId,
};
use bloom_core::domain::product::{Product, ProductId};
use bloom_core::store::{InteractionStore, StoreError, StoreResult};

use super::catalog::{row_to_product, sql_limit, PRODUCT_SELECT};
use super::{
    decode_count, decode_error, encode_timestamp, RepositoryError, COMPLETED_ORDER_STATUS,
};
use crate::DbPool;

const INTERACTION_COUNTS_SQL: &str = "
    WITH events AS (
        SELECT product_id,
               SUM(CASE WHEN interaction_type = 'view' THEN 1 ELSE 0 END) AS view_count,
               SUM(CASE WHEN interaction_type = 'add_to_cart' THEN 1 ELSE 0 END) AS cart_adds,
               SUM(CASE WHEN interaction_type = 'wishlist_add' THEN 1 ELSE 0 END) AS wishlist_adds
          FROM user_product_interaction
         WHERE user_id = ?
         GROUP BY product_id
    ),
    purchases AS (
        SELECT oi.product_id, COUNT(*) AS purchase_count
          FROM order_item oi
          JOIN customer_order co ON co.order_id = oi.order_id
         WHERE co.user_id = ? AND co.status = ?
         GROUP BY oi.product_id
    ),
    reviews AS (
        SELECT product_id, COUNT(*) AS review_count, SUM(rating) AS total_rating
          FROM review
         WHERE user_id = ?
         GROUP BY product_id
    ),
    touched AS (
        SELECT product_id FROM events
        UNION SELECT product_id FROM purchases
        UNION SELECT product_id FROM reviews
    )
    SELECT t.product_id,
           COALESCE(e.view_count, 0) AS view_count,
           COALESCE(e.cart_adds, 0) AS cart_adds,
           COALESCE(e.wishlist_adds, 0) AS wishlist_adds,
           COALESCE(pu.purchase_count, 0) AS purchase_count,
           COALESCE(rv.review_count, 0) AS review_count,
           COALESCE(rv.total_rating, 0) AS total_rating
      FROM touched t
      LEFT JOIN events e ON e.product_id = t.product_id
      LEFT JOIN purchases pu ON pu.product_id = t.product_id
      LEFT JOIN reviews rv ON rv.product_id = t.product_id
     ORDER BY t.product_id ASC";

pub struct SqlInteractionRepository {
    pool: DbPool,
}

impl SqlInteractionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn record_interaction(
        &self,
        event: &InteractionEvent,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_product_interaction (user_id, product_id, interaction_type, occurred_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(event.user_id.as_str())
        .bind(event.product_id.0)
        .bind(event.kind.as_str())
        .bind(encode_timestamp(event.occurred_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_counts(&self, user: &UserId) -> Result<Vec<InteractionCounts>, RepositoryError> {
        let rows = sqlx::query(INTERACTION_COUNTS_SQL)
            .bind(user.as_str())
            .bind(user.as_str())
            .bind(COMPLETED_ORDER_STATUS)
            .bind(user.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in &rows {
            let product_id: i64 = row.try_get("product_id").map_err(decode_error)?;
            let view_count: i64 = row.try_get("view_count").map_err(decode_error)?;
            let cart_adds: i64 = row.try_get("cart_adds").map_err(decode_error)?;
            let wishlist_adds: i64 = row.try_get("wishlist_adds").map_err(decode_error)?;
            let purchase_count: i64 = row.try_get("purchase_count").map_err(decode_error)?;
            let review_count: i64 = row.try_get("review_count").map_err(decode_error)?;
            let total_rating: i64 = row.try_get("total_rating").map_err(decode_error)?;

            counts.push(InteractionCounts {
                product_id: ProductId(product_id),
                view_count: decode_count("view_count", view_count)?,
                cart_adds: decode_count("cart_adds", cart_adds)?,
                wishlist_adds: decode_count("wishlist_adds", wishlist_adds)?,
                purchase_count: decode_count("purchase_count", purchase_count)?,
                review_count: decode_count("review_count", review_count)?,
                total_rating: decode_count("total_rating", total_rating)?,
            });
        }
        Ok(counts)
    }

    async fn load_purchase_history(&self, user: &UserId) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "{PRODUCT_SELECT}
             JOIN (
                   SELECT oi.product_id, MAX(co.order_date) AS last_ordered
                     FROM order_item oi
                     JOIN customer_order co ON co.order_id = oi.order_id
                    WHERE co.user_id = ? AND co.status = ?
                    GROUP BY oi.product_id
             ) h ON h.product_id = p.product_id
             ORDER BY h.last_ordered DESC, p.product_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(COMPLETED_ORDER_STATUS)
            .bind(user.as_str())
            .bind(COMPLETED_ORDER_STATUS)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn load_similar_users(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT co2.user_id, COUNT(DISTINCT oi1.product_id) AS overlap
               FROM customer_order co1
               JOIN order_item oi1 ON oi1.order_id = co1.order_id
               JOIN order_item oi2 ON oi2.product_id = oi1.product_id
               JOIN customer_order co2 ON co2.order_id = oi2.order_id
              WHERE co1.user_id = ? AND co2.user_id != ?
                AND co1.status = ? AND co2.status = ?
              GROUP BY co2.user_id
              ORDER BY overlap DESC, co2.user_id ASC
              LIMIT ?",
        )
        .bind(user.as_str())
        .bind(user.as_str())
        .bind(COMPLETED_ORDER_STATUS)
        .bind(COMPLETED_ORDER_STATUS)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("user_id").map(UserId).map_err(decode_error))
            .collect()
    }

    async fn load_period_activity(
        &self,
        since: DateTime<Utc>,
    ) -> Result<HashMap<ProductId, PeriodActivity>, RepositoryError> {
        let since = encode_timestamp(since);
        let rows = sqlx::query(
            "SELECT product_id, SUM(views) AS view_count, SUM(purchases) AS purchase_count
               FROM (
                    SELECT product_id, 1 AS views, 0 AS purchases
                      FROM user_product_interaction
                     WHERE interaction_type = 'view' AND occurred_at >= ?
                    UNION ALL
                    SELECT oi.product_id, 0 AS views, oi.quantity AS purchases
                      FROM order_item oi
                      JOIN customer_order co ON co.order_id = oi.order_id
                     WHERE co.status = ? AND co.order_date >= ?
               )
              GROUP BY product_id",
        )
        .bind(&since)
        .bind(COMPLETED_ORDER_STATUS)
        .bind(&since)
        .fetch_all(&self.pool)
        .await?;

        let mut activity = HashMap::with_capacity(rows.len());
        for row in &rows {
            let product_id: i64 = row.try_get("product_id").map_err(decode_error)?;
            let view_count: i64 = row.try_get("view_count").map_err(decode_error)?;
            let purchase_count: i64 = row.try_get("purchase_count").map_err(decode_error)?;
            activity.insert(
                ProductId(product_id),
                PeriodActivity {
                    view_count: decode_count("view_count", view_count)?,
                    purchase_count: decode_count("purchase_count", purchase_count)?,
                },
            );
        }
        Ok(activity)
    }

    async fn load_recently_active(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let since = encode_timestamp(since);
        let rows = sqlx::query(
            "SELECT user_id FROM user_product_interaction WHERE occurred_at >= ?
             UNION
             SELECT user_id FROM customer_order WHERE order_date >= ?
             ORDER BY user_id ASC",
        )
        .bind(&since)
        .bind(&since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("user_id").map(UserId).map_err(decode_error))
            .collect()
    }
}

#[async_trait::async_trait]
impl InteractionStore for SqlInteractionRepository {
    async fn interaction_counts(&self, user: &UserId) -> StoreResult<Vec<InteractionCounts>> {
        self.load_counts(user).await.map_err(StoreError::from)
    }

    async fn purchase_history(&self, user: &UserId) -> StoreResult<Vec<Product>> {
        self.load_purchase_history(user).await.map_err(StoreError::from)
    }

    async fn similar_users(&self, user: &UserId, limit: usize) -> StoreResult<Vec<UserId>> {
        self.load_similar_users(user, limit).await.map_err(StoreError::from)
    }

    async fn period_activity(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<HashMap<ProductId, PeriodActivity>> {
        self.load_period_activity(since).await.map_err(StoreError::from)
    }

    async fn recently_active_users(&self, since: DateTime<Utc>) -> StoreResult<Vec<UserId>> {
        self.load_recently_active(since).await.map_err(StoreError::from)
    }
}
