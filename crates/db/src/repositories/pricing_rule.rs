use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use bloom_core::domain::pricing::{
    PriceAdjustment, PricingRule, PricingRuleId, RuleScope, SpecialDayId,
};
use bloom_core::domain::product::{FlowerTypeId, ProductId, ProductStatus};
use bloom_core::store::{PricingRuleStore, StoreError, StoreResult};

use super::{decode_decimal, decode_error, decode_timestamp, encode_timestamp, RepositoryError};
use crate::DbPool;

const DAY_FORMAT: &str = "%Y-%m-%d";

pub struct SqlPricingRuleRepository {
    pool: DbPool,
}

impl SqlPricingRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save_rule(&self, rule: &PricingRule) -> Result<(), RepositoryError> {
        let scope = &rule.scope;
        sqlx::query(
            "INSERT INTO pricing_rule (rule_id, rule_name, priority, adjustment_type,
                                       adjustment_value, applicable_product_id,
                                       applicable_flower_type_id, applicable_product_status,
                                       time_of_day_start, time_of_day_end, special_day_id,
                                       valid_from, valid_to, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(rule_id) DO UPDATE SET
                 rule_name = excluded.rule_name,
                 priority = excluded.priority,
                 adjustment_type = excluded.adjustment_type,
                 adjustment_value = excluded.adjustment_value,
                 applicable_product_id = excluded.applicable_product_id,
                 applicable_flower_type_id = excluded.applicable_flower_type_id,
                 applicable_product_status = excluded.applicable_product_status,
                 time_of_day_start = excluded.time_of_day_start,
                 time_of_day_end = excluded.time_of_day_end,
                 special_day_id = excluded.special_day_id,
                 valid_from = excluded.valid_from,
                 valid_to = excluded.valid_to,
                 is_active = excluded.is_active",
        )
        .bind(rule.id.0)
        .bind(&rule.name)
        .bind(rule.priority)
        .bind(rule.adjustment.kind())
        .bind(rule.adjustment.value().to_string())
        .bind(scope.product_id.map(|id| id.0))
        .bind(scope.flower_type_id.map(|id| id.0))
        .bind(scope.product_status.map(ProductStatus::as_str))
        .bind(scope.time_of_day_start.as_deref())
        .bind(scope.time_of_day_end.as_deref())
        .bind(scope.special_day_id.map(|id| id.0))
        .bind(scope.valid_from.map(encode_timestamp))
        .bind(scope.valid_to.map(encode_timestamp))
        .bind(rule.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_special_day(
        &self,
        id: SpecialDayId,
        name: &str,
        date: NaiveDate,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO special_day (special_day_id, name, day_date) VALUES (?, ?, ?)
             ON CONFLICT(special_day_id) DO UPDATE SET
                 name = excluded.name,
                 day_date = excluded.day_date",
        )
        .bind(id.0)
        .bind(name)
        .bind(date.format(DAY_FORMAT).to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_active_rules(&self) -> Result<Vec<PricingRule>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT rule_id, rule_name, priority, adjustment_type, adjustment_value,
                    applicable_product_id, applicable_flower_type_id, applicable_product_status,
                    time_of_day_start, time_of_day_end, special_day_id, valid_from, valid_to,
                    is_active
             FROM pricing_rule
             WHERE is_active = 1
             ORDER BY rule_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rule).collect()
    }

    async fn list_special_days(
        &self,
        date: NaiveDate,
    ) -> Result<HashSet<SpecialDayId>, RepositoryError> {
        let rows = sqlx::query("SELECT special_day_id FROM special_day WHERE day_date = ?")
            .bind(date.format(DAY_FORMAT).to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<i64, _>("special_day_id").map(SpecialDayId).map_err(decode_error)
            })
            .collect()
    }
}

fn row_to_rule(row: &SqliteRow) -> Result<PricingRule, RepositoryError> {
    let id: i64 = row.try_get("rule_id").map_err(decode_error)?;
    let name: String = row.try_get("rule_name").map_err(decode_error)?;
    let priority: i32 = row.try_get("priority").map_err(decode_error)?;
    let adjustment_type: String = row.try_get("adjustment_type").map_err(decode_error)?;
    let adjustment_value: String = row.try_get("adjustment_value").map_err(decode_error)?;
    let product_id: Option<i64> = row.try_get("applicable_product_id").map_err(decode_error)?;
    let flower_type_id: Option<i64> =
        row.try_get("applicable_flower_type_id").map_err(decode_error)?;
    let product_status: Option<String> =
        row.try_get("applicable_product_status").map_err(decode_error)?;
    let time_of_day_start: Option<String> =
        row.try_get("time_of_day_start").map_err(decode_error)?;
    let time_of_day_end: Option<String> = row.try_get("time_of_day_end").map_err(decode_error)?;
    let special_day_id: Option<i64> = row.try_get("special_day_id").map_err(decode_error)?;
    let valid_from: Option<String> = row.try_get("valid_from").map_err(decode_error)?;
    let valid_to: Option<String> = row.try_get("valid_to").map_err(decode_error)?;
    let is_active: bool = row.try_get("is_active").map_err(decode_error)?;

    let value = decode_decimal("adjustment_value", &adjustment_value)?;
    let adjustment = PriceAdjustment::from_parts(&adjustment_type, value).map_err(decode_error)?;

    Ok(PricingRule {
        id: PricingRuleId(id),
        name,
        priority,
        is_active,
        adjustment,
        scope: RuleScope {
            product_id: product_id.map(ProductId),
            flower_type_id: flower_type_id.map(FlowerTypeId),
            product_status: product_status
                .as_deref()
                .map(ProductStatus::from_str)
                .transpose()
                .map_err(decode_error)?,
            time_of_day_start,
            time_of_day_end,
            special_day_id: special_day_id.map(SpecialDayId),
            valid_from: valid_from
                .as_deref()
                .map(|v| decode_timestamp("valid_from", v))
                .transpose()?,
            valid_to: valid_to.as_deref().map(|v| decode_timestamp("valid_to", v)).transpose()?,
        },
    })
}

#[async_trait::async_trait]
impl PricingRuleStore for SqlPricingRuleRepository {
    async fn active_rules(&self) -> StoreResult<Vec<PricingRule>> {
        self.list_active_rules().await.map_err(StoreError::from)
    }

    async fn active_special_days(&self, date: NaiveDate) -> StoreResult<HashSet<SpecialDayId>> {
        self.list_special_days(date).await.map_err(StoreError::from)
    }
}
