use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::pricing::{PriceAdjustment, PricingRule, PricingRuleId, SpecialDayId};
use crate::domain::product::{FlowerTypeDirectory, Product, ProductId};

/// Everything a rule predicate may look at besides the product itself.
#[derive(Clone, Debug)]
pub struct PricingContext<'a> {
    pub directory: &'a FlowerTypeDirectory,
    /// Special days active on the local evaluation date
    pub special_days: &'a HashSet<SpecialDayId>,
    pub now: DateTime<Utc>,
    /// Offset used for the time-of-day window
    pub offset: FixedOffset,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRule {
    pub id: PricingRuleId,
    pub name: String,
    pub priority: i32,
    pub adjustment: PriceAdjustment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceResolution {
    pub product_id: ProductId,
    pub base_price: Decimal,
    pub effective_price: Decimal,
    pub applied_rule: Option<AppliedRule>,
}

pub trait RuleResolver: Send + Sync {
    fn resolve(
        &self,
        product: &Product,
        rules: &[PricingRule],
        context: &PricingContext<'_>,
    ) -> PriceResolution;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicRuleResolver;

impl RuleResolver for DeterministicRuleResolver {
    fn resolve(
        &self,
        product: &Product,
        rules: &[PricingRule],
        context: &PricingContext<'_>,
    ) -> PriceResolution {
        let winner = select_rule(rules, product, context);
        PriceResolution {
            product_id: product.id,
            base_price: product.base_price,
            effective_price: winner
                .map(|rule| rule.adjustment.apply(product.base_price))
                .unwrap_or(product.base_price),
            applied_rule: winner.map(|rule| AppliedRule {
                id: rule.id,
                name: rule.name.clone(),
                priority: rule.priority,
                adjustment: rule.adjustment,
            }),
        }
    }
}

/// Rules must beat this priority to be selected at all.
pub const PRIORITY_FLOOR: i32 = -1;

/// Highest-priority applicable rule. Among equal priorities the earliest
/// rule in `rules` wins; rules at or below [`PRIORITY_FLOOR`] never win.
pub fn select_rule<'r>(
    rules: &'r [PricingRule],
    product: &Product,
    context: &PricingContext<'_>,
) -> Option<&'r PricingRule> {
    let mut winner: Option<&PricingRule> = None;
    for rule in rules.iter().filter(|rule| is_rule_applicable(rule, product, context)) {
        if rule.priority > winner.map_or(PRIORITY_FLOOR, |best| best.priority) {
            winner = Some(rule);
        }
    }
    winner
}

pub fn is_rule_applicable(
    rule: &PricingRule,
    product: &Product,
    context: &PricingContext<'_>,
) -> bool {
    if !rule.is_active {
        return false;
    }

    let scope = &rule.scope;
    if scope.product_id.is_some_and(|id| id != product.id) {
        return false;
    }

    // Products whose flower type is unknown to the directory are never
    // eligible, whatever the rule scope.
    let Some(flower_type_id) = context.directory.resolve(&product.flower_type) else {
        return false;
    };
    if scope.flower_type_id.is_some_and(|id| id != flower_type_id) {
        return false;
    }

    if scope.product_status.is_some_and(|status| status != product.status) {
        return false;
    }

    if let (Some(start), Some(end)) = (&scope.time_of_day_start, &scope.time_of_day_end) {
        let local = context.now.with_timezone(&context.offset).format("%H:%M:%S").to_string();
        if local.as_str() < start.as_str() || local.as_str() > end.as_str() {
            return false;
        }
    }

    if scope.special_day_id.is_some_and(|day| !context.special_days.contains(&day)) {
        return false;
    }

    if scope.valid_from.is_some_and(|from| context.now < from) {
        return false;
    }
    if scope.valid_to.is_some_and(|to| context.now > to) {
        return false;
    }

    true
}

pub fn clamp_to_zero(price: Decimal) -> Decimal {
    price.max(Decimal::ZERO)
}
