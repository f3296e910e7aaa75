//! Dynamic pricing-rule resolution

mod resolver;
mod service;

pub use resolver::{
    clamp_to_zero, is_rule_applicable, select_rule, AppliedRule, DeterministicRuleResolver,
    PriceResolution, PricingContext, RuleResolver, PRIORITY_FLOOR,
};
pub use service::{PricedProduct, PricingService};
