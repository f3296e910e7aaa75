use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use bloom_core::domain::product::{
    FlowerTypeDirectory, FlowerTypeId, Product, ProductId, ProductStatus,
};
use bloom_core::store::{CatalogStore, StoreError, StoreResult};

use super::{
    decode_count, decode_decimal, decode_error, decode_timestamp, encode_timestamp,
    RepositoryError, COMPLETED_ORDER_STATUS,
};
use crate::DbPool;

/// Product projection with review aggregates, sales rank and occasion tags.
/// Callers append `WHERE`/`ORDER BY` clauses against alias `p` and bind
/// [`COMPLETED_ORDER_STATUS`] before their own parameters.
pub(crate) const PRODUCT_SELECT: &str = "
    SELECT p.product_id, p.name, ft.name AS flower_type, p.base_price, p.status,
           p.stock_quantity, p.created_at,
           COALESCE(r.average_rating, 0.0) AS average_rating,
           COALESCE(r.review_count, 0) AS review_count,
           s.sales_rank,
           (SELECT json_group_array(o.name)
              FROM product_occasion po
              JOIN occasion o ON o.occasion_id = po.occasion_id
             WHERE po.product_id = p.product_id) AS occasions
      FROM product p
      JOIN flower_type ft ON ft.flower_type_id = p.flower_type_id
      LEFT JOIN (
            SELECT product_id, AVG(rating) AS average_rating, COUNT(*) AS review_count
              FROM review
             GROUP BY product_id
      ) r ON r.product_id = p.product_id
      LEFT JOIN (
            SELECT oi.product_id,
                   RANK() OVER (ORDER BY SUM(oi.quantity) DESC) AS sales_rank
              FROM order_item oi
              JOIN customer_order co ON co.order_id = oi.order_id
             WHERE co.status = ?
             GROUP BY oi.product_id
      ) s ON s.product_id = p.product_id";

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces a catalog row. Unknown flower types and occasions
    /// are created on the fly.
    pub async fn save_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO flower_type (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(&product.flower_type)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO product (product_id, name, flower_type_id, base_price, status,
                                  stock_quantity, created_at)
             VALUES (?, ?, (SELECT flower_type_id FROM flower_type WHERE name = ?), ?, ?, ?, ?)
             ON CONFLICT(product_id) DO UPDATE SET
                 name = excluded.name,
                 flower_type_id = excluded.flower_type_id,
                 base_price = excluded.base_price,
                 status = excluded.status,
                 stock_quantity = excluded.stock_quantity",
        )
        .bind(product.id.0)
        .bind(&product.name)
        .bind(&product.flower_type)
        .bind(product.base_price.to_string())
        .bind(product.status.as_str())
        .bind(product.stock_quantity)
        .bind(encode_timestamp(product.created_at))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM product_occasion WHERE product_id = ?")
            .bind(product.id.0)
            .execute(&mut *tx)
            .await?;

        for occasion in &product.occasions {
            sqlx::query("INSERT INTO occasion (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
                .bind(occasion)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT OR IGNORE INTO product_occasion (product_id, occasion_id)
                 SELECT ?, occasion_id FROM occasion WHERE name = ?",
            )
            .bind(product.id.0)
            .bind(occasion)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.product_id = ?");
        let row = sqlx::query(&sql)
            .bind(COMPLETED_ORDER_STATUS)
            .bind(id.0)
            .fetch_optional(&self.pool).await?;

        match row {
            Some(ref r) => Ok(Some(row_to_product(r)?)),
            None => Ok(None),
        }
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} ORDER BY p.product_id ASC");
        let rows =
            sqlx::query(&sql).bind(COMPLETED_ORDER_STATUS).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn list_by_flower_type(
        &self,
        flower_type: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "{PRODUCT_SELECT}
             WHERE ft.name = ?
               AND p.stock_quantity > 0
               AND p.product_id NOT IN (SELECT value FROM json_each(?))
             ORDER BY p.created_at DESC, p.product_id ASC
             LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(COMPLETED_ORDER_STATUS)
            .bind(flower_type)
            .bind(exclusion_list(exclude)?)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn list_by_occasion(
        &self,
        occasion: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "{PRODUCT_SELECT}
             WHERE p.stock_quantity > 0
               AND EXISTS (
                    SELECT 1
                      FROM product_occasion po
                      JOIN occasion o ON o.occasion_id = po.occasion_id
                     WHERE po.product_id = p.product_id
                       AND o.name = ? COLLATE NOCASE
               )
               AND p.product_id NOT IN (SELECT value FROM json_each(?))
             ORDER BY p.created_at DESC, p.product_id ASC
             LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(COMPLETED_ORDER_STATUS)
            .bind(occasion.trim())
            .bind(exclusion_list(exclude)?)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn list_in_price_range(
        &self,
        min: Decimal,
        max: Decimal,
        exclude: &[ProductId],
        limit: usize,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "{PRODUCT_SELECT}
             WHERE p.stock_quantity > 0
               AND CAST(p.base_price AS REAL) BETWEEN ? AND ?
               AND p.product_id NOT IN (SELECT value FROM json_each(?))
             ORDER BY p.created_at DESC, p.product_id ASC
             LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(COMPLETED_ORDER_STATUS)
            .bind(min.to_f64().unwrap_or(0.0))
            .bind(max.to_f64().unwrap_or(f64::MAX))
            .bind(exclusion_list(exclude)?)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn load_directory(&self) -> Result<FlowerTypeDirectory, RepositoryError> {
        let rows = sqlx::query("SELECT flower_type_id, name FROM flower_type")
            .fetch_all(&self.pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("flower_type_id").map_err(decode_error)?;
            let name: String = row.try_get("name").map_err(decode_error)?;
            entries.push((name, FlowerTypeId(id)));
        }
        Ok(FlowerTypeDirectory::new(entries))
    }
}

pub(crate) fn row_to_product(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let id: i64 = row.try_get("product_id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let flower_type: String = row.try_get("flower_type").map_err(decode_error)?;
    let base_price: String = row.try_get("base_price").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let stock_quantity: i64 = row.try_get("stock_quantity").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let average_rating: f64 = row.try_get("average_rating").map_err(decode_error)?;
    let review_count: i64 = row.try_get("review_count").map_err(decode_error)?;
    let sales_rank: Option<i64> = row.try_get("sales_rank").map_err(decode_error)?;
    let occasions: String = row.try_get("occasions").map_err(decode_error)?;

    let mut occasions: Vec<String> = serde_json::from_str(&occasions)
        .map_err(|e| RepositoryError::Decode(format!("occasions of product {id}: {e}")))?;
    occasions.sort();

    Ok(Product {
        id: ProductId(id),
        name,
        flower_type,
        base_price: decode_decimal("base_price", &base_price)?,
        status: ProductStatus::from_str(&status).map_err(decode_error)?,
        stock_quantity,
        occasions,
        average_rating,
        review_count: decode_count("review_count", review_count)?,
        sales_rank: sales_rank.map(|rank| decode_count("sales_rank", rank)).transpose()?,
        created_at: decode_timestamp("created_at", &created_at)?,
    })
}

/// JSON array consumed by `json_each` in exclusion filters.
pub(crate) fn exclusion_list(exclude: &[ProductId]) -> Result<String, RepositoryError> {
    let ids: Vec<i64> = exclude.iter().map(|id| id.0).collect();
    serde_json::to_string(&ids).map_err(decode_error)
}

pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl CatalogStore for SqlCatalogRepository {
    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        self.find_product(id).await.map_err(StoreError::from)
    }

    async fn all_products(&self) -> StoreResult<Vec<Product>> {
        self.list_products().await.map_err(StoreError::from)
    }

    async fn products_by_flower_type(
        &self,
        flower_type: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> StoreResult<Vec<Product>> {
        self.list_by_flower_type(flower_type, exclude, limit).await.map_err(StoreError::from)
    }

    async fn products_by_occasion(
        &self,
        occasion: &str,
        exclude: &[ProductId],
        limit: usize,
    ) -> StoreResult<Vec<Product>> {
        self.list_by_occasion(occasion, exclude, limit).await.map_err(StoreError::from)
    }

    async fn products_in_price_range(
        &self,
        min: Decimal,
        max: Decimal,
        exclude: &[ProductId],
        limit: usize,
    ) -> StoreResult<Vec<Product>> {
        self.list_in_price_range(min, max, exclude, limit).await.map_err(StoreError::from)
    }

    async fn flower_type_directory(&self) -> StoreResult<FlowerTypeDirectory> {
        self.load_directory().await.map_err(StoreError::from)
    }
}
