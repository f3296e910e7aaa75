use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::interaction::UserId;

/// Observed purchase price band. All fields are `None` when the profile was
/// built from interactions without any purchase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub average_spent: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserPreferenceProfile {
    pub user_id: UserId,
    /// Flower type name to weight in `[0, 1]`, normalized by the maximum.
    pub flower_weights: BTreeMap<String, f64>,
    /// Occasion tag to weight in `[0, 1]`, normalized by the maximum.
    pub occasion_weights: BTreeMap<String, f64>,
    pub price_band: PriceBand,
    pub last_updated: DateTime<Utc>,
}

impl UserPreferenceProfile {
    /// Flower types whose weight is strictly above `threshold`, alphabetical.
    pub fn preferred_flower_types(&self, threshold: f64) -> Vec<(&str, f64)> {
        self.flower_weights
            .iter()
            .filter(|(_, weight)| **weight > threshold)
            .map(|(name, weight)| (name.as_str(), *weight))
            .collect()
    }
}
