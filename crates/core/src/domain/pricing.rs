use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::{FlowerTypeId, ProductId, ProductStatus};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PricingRuleId(pub i64);

impl fmt::Display for PricingRuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpecialDayId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PriceAdjustment {
    PercentageDiscount(Decimal),
    FixedDiscount(Decimal),
    OverridePrice(Decimal),
}

impl PriceAdjustment {
    pub fn from_parts(kind: &str, value: Decimal) -> Result<Self, DomainError> {
        match kind.trim() {
            "percentage_discount" => Ok(Self::PercentageDiscount(value)),
            "fixed_discount" => Ok(Self::FixedDiscount(value)),
            "override_price" => Ok(Self::OverridePrice(value)),
            other => Err(DomainError::invalid(format!(
                "unknown adjustment type `{other}` \
                 (expected percentage_discount|fixed_discount|override_price)"
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::PercentageDiscount(_) => "percentage_discount",
            Self::FixedDiscount(_) => "fixed_discount",
            Self::OverridePrice(_) => "override_price",
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            Self::PercentageDiscount(value)
            | Self::FixedDiscount(value)
            | Self::OverridePrice(value) => *value,
        }
    }

    /// Applies the adjustment without clamping; a large fixed discount can
    /// produce a negative price.
    pub fn apply(&self, price: Decimal) -> Decimal {
        match self {
            Self::PercentageDiscount(percent) => price - price * *percent / Decimal::ONE_HUNDRED,
            Self::FixedDiscount(amount) => price - *amount,
            Self::OverridePrice(target) => *target,
        }
    }
}

/// Scope predicates of a pricing rule. A `None` field does not constrain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleScope {
    pub product_id: Option<ProductId>,
    pub flower_type_id: Option<FlowerTypeId>,
    pub product_status: Option<ProductStatus>,
    /// `HH:MM:SS`; the window only applies when both ends are present.
    pub time_of_day_start: Option<String>,
    pub time_of_day_end: Option<String>,
    pub special_day_id: Option<SpecialDayId>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: PricingRuleId,
    pub name: String,
    pub priority: i32,
    pub is_active: bool,
    pub adjustment: PriceAdjustment,
    pub scope: RuleScope,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::PriceAdjustment;

    #[test]
    fn percentage_discount_of_twenty_on_one_hundred_is_eighty() {
        let adjusted = PriceAdjustment::PercentageDiscount(Decimal::from(20))
            .apply(Decimal::new(10000, 2));
        assert_eq!(adjusted, Decimal::new(8000, 2));
        assert_eq!(adjusted.to_string(), "80.00");
    }

    #[test]
    fn fixed_discount_is_not_clamped() {
        let adjusted = PriceAdjustment::FixedDiscount(Decimal::from(30)).apply(Decimal::from(20));
        assert_eq!(adjusted, Decimal::from(-10));
    }

    #[test]
    fn override_replaces_price_and_unknown_kind_is_rejected() {
        let adjustment = PriceAdjustment::from_parts("override_price", Decimal::from(15));
        assert_eq!(adjustment.map(|a| a.apply(Decimal::from(99))), Ok(Decimal::from(15)));
        assert!(PriceAdjustment::from_parts("bogo", Decimal::ONE).is_err());
    }
}
