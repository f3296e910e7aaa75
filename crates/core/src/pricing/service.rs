use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::product::{Product, ProductId};
use crate::errors::{ApplicationError, DomainError};
use crate::store::{CatalogStore, PricingRuleStore};

use super::resolver::{DeterministicRuleResolver, PriceResolution, PricingContext, RuleResolver};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricedProduct {
    pub product: Product,
    pub pricing: PriceResolution,
}

/// Loads rules, the flower-type directory and active special days from the
/// stores and resolves effective prices through a [`RuleResolver`].
#[derive(Clone)]
pub struct PricingService<R = DeterministicRuleResolver> {
    catalog: Arc<dyn CatalogStore>,
    rules: Arc<dyn PricingRuleStore>,
    resolver: R,
    offset: FixedOffset,
}

impl PricingService<DeterministicRuleResolver> {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        rules: Arc<dyn PricingRuleStore>,
        offset: FixedOffset,
    ) -> Self {
        Self::with_resolver(catalog, rules, DeterministicRuleResolver, offset)
    }
}

impl<R: RuleResolver> PricingService<R> {
    pub fn with_resolver(
        catalog: Arc<dyn CatalogStore>,
        rules: Arc<dyn PricingRuleStore>,
        resolver: R,
        offset: FixedOffset,
    ) -> Self {
        Self { catalog, rules, resolver, offset }
    }

    pub async fn effective_price(
        &self,
        product: &Product,
        now: DateTime<Utc>,
    ) -> Result<PriceResolution, ApplicationError> {
        let mut priced = self.price_products(std::slice::from_ref(product), now).await?;
        priced.pop().map(|entry| entry.pricing).ok_or_else(|| {
            ApplicationError::DependencyFailure("pricing produced no resolution".to_string())
        })
    }

    pub async fn effective_price_for(
        &self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<PricedProduct, ApplicationError> {
        let product = self
            .catalog
            .product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", product_id))?;
        let pricing = self.effective_price(&product, now).await?;
        Ok(PricedProduct { product, pricing })
    }

    /// Every catalog product paired with its current price.
    pub async fn price_catalog(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PricedProduct>, ApplicationError> {
        let products = self.catalog.all_products().await?;
        self.price_products(&products, now).await
    }

    async fn price_products(
        &self,
        products: &[Product],
        now: DateTime<Utc>,
    ) -> Result<Vec<PricedProduct>, ApplicationError> {
        let rules = self.rules.active_rules().await?;
        let directory = self.catalog.flower_type_directory().await?;
        let local_date = now.with_timezone(&self.offset).date_naive();
        let special_days = self.rules.active_special_days(local_date).await?;

        let context = PricingContext {
            directory: &directory,
            special_days: &special_days,
            now,
            offset: self.offset,
        };

        Ok(products
            .iter()
            .map(|product| {
                let pricing = self.resolver.resolve(product, &rules, &context);
                if let Some(applied) = &pricing.applied_rule {
                    debug!(
                        event_name = "pricing.rule.applied",
                        product_id = %product.id,
                        rule_id = %applied.id,
                        effective_price = %pricing.effective_price,
                        "pricing rule applied"
                    );
                }
                PricedProduct { product: product.clone(), pricing }
            })
            .collect())
    }
}
