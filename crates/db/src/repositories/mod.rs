use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use bloom_core::store::{EngineStores, StoreError};

use crate::DbPool;

pub mod catalog;
pub mod feedback;
pub mod interaction;
pub mod memory;
pub mod pricing_rule;
pub mod recommendation;

pub use catalog::SqlCatalogRepository;
pub use feedback::SqlFeedbackRepository;
pub use interaction::SqlInteractionRepository;
pub use memory::InMemoryStore;
pub use pricing_rule::SqlPricingRuleRepository;
pub use recommendation::SqlRecommendationRepository;

/// Order status whose lines count as purchases.
pub const COMPLETED_ORDER_STATUS: &str = "Completed";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => StoreError::Unavailable(error.to_string()),
            RepositoryError::Decode(message) => StoreError::Decode(message),
        }
    }
}

/// SQLite-backed handles for every store seam, sharing one pool.
pub fn sql_stores(pool: DbPool) -> EngineStores {
    EngineStores {
        catalog: Arc::new(SqlCatalogRepository::new(pool.clone())),
        interactions: Arc::new(SqlInteractionRepository::new(pool.clone())),
        recommendations: Arc::new(SqlRecommendationRepository::new(pool.clone())),
        pricing_rules: Arc::new(SqlPricingRuleRepository::new(pool.clone())),
        feedback: Arc::new(SqlFeedbackRepository::new(pool)),
    }
}

pub(crate) fn decode_error(error: impl Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

pub(crate) fn decode_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

pub(crate) fn decode_count(column: &str, raw: i64) -> Result<u32, RepositoryError> {
    u32::try_from(raw)
        .map_err(|_| RepositoryError::Decode(format!("{column} out of range: {raw}")))
}
