use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowerTypeId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductStatus {
    NewFlower,
    OldFlower,
    LowStock,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewFlower => "NewFlower",
            Self::OldFlower => "OldFlower",
            Self::LowStock => "LowStock",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "NewFlower" => Ok(Self::NewFlower),
            "OldFlower" => Ok(Self::OldFlower),
            "LowStock" => Ok(Self::LowStock),
            other => Err(DomainError::invalid(format!(
                "unknown product status `{other}` (expected NewFlower|OldFlower|LowStock)"
            ))),
        }
    }
}

/// Catalog snapshot of a product together with the aggregate signals the
/// scorers read. `average_rating` is `0.0` when the product has no reviews.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub flower_type: String,
    pub base_price: Decimal,
    pub status: ProductStatus,
    pub stock_quantity: i64,
    pub occasions: Vec<String>,
    pub average_rating: f64,
    pub review_count: u32,
    /// Rank by completed sales volume, 1 = best seller; `None` when never sold.
    pub sales_rank: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn price_value(&self) -> f64 {
        self.base_price.to_f64().unwrap_or(0.0)
    }

    pub fn is_rated(&self) -> bool {
        self.average_rating > 0.0
    }

    pub fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    pub fn has_occasion(&self, occasion: &str) -> bool {
        self.occasions.iter().any(|tag| tag.eq_ignore_ascii_case(occasion.trim()))
    }
}

/// Flower type name to id lookup used by the pricing resolver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowerTypeDirectory {
    by_name: HashMap<String, FlowerTypeId>,
}

impl FlowerTypeDirectory {
    pub fn new(entries: impl IntoIterator<Item = (String, FlowerTypeId)>) -> Self {
        Self { by_name: entries.into_iter().collect() }
    }

    pub fn resolve(&self, name: &str) -> Option<FlowerTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
