use serde::Serialize;
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Row counts the demo dataset guarantees per table, in load order.
const SEED_TABLES: &[SeedTableContract] = &[
    SeedTableContract { table: "flower_type", expected_rows: 5, id_column: "flower_type_id" },
    SeedTableContract { table: "occasion", expected_rows: 6, id_column: "occasion_id" },
    SeedTableContract { table: "product", expected_rows: 10, id_column: "product_id" },
    SeedTableContract { table: "customer_order", expected_rows: 6, id_column: "order_id" },
    SeedTableContract { table: "order_item", expected_rows: 10, id_column: "order_item_id" },
    SeedTableContract { table: "review", expected_rows: 5, id_column: "review_id" },
    SeedTableContract {
        table: "user_product_interaction",
        expected_rows: 12,
        id_column: "interaction_id",
    },
    SeedTableContract { table: "special_day", expected_rows: 2, id_column: "special_day_id" },
    SeedTableContract { table: "pricing_rule", expected_rows: 4, id_column: "rule_id" },
];

const SEED_PRODUCT_OCCASION_LINKS: i64 = 17;

/// Demo shoppers with activity in the dataset.
pub const DEMO_USERS: &[&str] = &["alice", "bob", "carol", "dave"];

/// Deterministic flower shop catalog with shoppers, orders, reviews and
/// pricing rules.
pub struct DemoCatalogDataset;

impl DemoCatalogDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_catalog.sql");

    /// Loads the dataset. Rows that already exist are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let tables = SEED_TABLES
            .iter()
            .map(|contract| TableSeedInfo {
                table: contract.table,
                expected_rows: contract.expected_rows,
            })
            .collect();

        Ok(SeedResult { tables, users: DEMO_USERS.to_vec() })
    }

    /// Checks that every seeded row id is present.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(SEED_TABLES.len() + 2);

        for contract in SEED_TABLES {
            let present: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(1) FROM {} WHERE {} BETWEEN 1 AND ?",
                contract.table, contract.id_column
            ))
            .bind(contract.expected_rows)
            .fetch_one(pool)
            .await?;
            checks.push((contract.table, present == contract.expected_rows));
        }

        let links: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM product_occasion WHERE product_id BETWEEN 1 AND 10",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("product_occasion", links == SEED_PRODUCT_OCCASION_LINKS));

        let active_rules: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM pricing_rule WHERE is_active = 1")
                .fetch_one(pool)
                .await?;
        checks.push(("active-pricing-rules", active_rules == 3));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded rows, children first.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM product_occasion WHERE product_id BETWEEN 1 AND 10")
            .execute(&mut *tx)
            .await?;
        for contract in SEED_TABLES.iter().rev() {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE {} BETWEEN 1 AND ?",
                contract.table, contract.id_column
            ))
            .bind(contract.expected_rows)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedTableContract {
    table: &'static str,
    expected_rows: i64,
    id_column: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SeedResult {
    pub tables: Vec<TableSeedInfo>,
    pub users: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct TableSeedInfo {
    pub table: &'static str,
    pub expected_rows: i64,
}

#[derive(Debug, Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
