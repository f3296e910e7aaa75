use bloom_core::domain::product::ProductId;
use bloom_core::pricing::{PricedProduct, PricingService};
use bloom_db::sql_stores;
use chrono::{DateTime, Utc};
use clap::Args;

use crate::commands::{
    application_failure, build_runtime, load_config, open_database, CommandResult, Failure,
};

const COMMAND: &str = "price";

#[derive(Debug, Clone, Default, Args)]
pub struct PriceArgs {
    /// Price a single product instead of the whole catalog
    #[arg(long)]
    pub product: Option<i64>,
    /// Evaluation instant; defaults to now
    #[arg(long, value_name = "RFC3339")]
    pub at: Option<String>,
}

pub fn run(args: PriceArgs) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let now = match parse_instant(args.at.as_deref()) {
        Ok(now) => now,
        Err(failure) => return CommandResult::from_failure(COMMAND, failure),
    };
    let offset = match config.pricing.offset() {
        Ok(offset) => offset,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2);
        }
    };
    let runtime = match build_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let stores = sql_stores(pool.clone());
        let pricing = PricingService::new(stores.catalog, stores.pricing_rules, offset);

        let outcome: Result<Vec<PricedProduct>, Failure> = match args.product {
            Some(id) => pricing
                .effective_price_for(ProductId(id), now)
                .await
                .map(|priced| vec![priced])
                .map_err(application_failure),
            None => pricing.price_catalog(now).await.map_err(application_failure),
        };
        pool.close().await;
        outcome
    });

    match result {
        Ok(priced) => {
            let discounted =
                priced.iter().filter(|entry| entry.pricing.applied_rule.is_some()).count();
            let message = format!(
                "priced {} products at {}, {discounted} with a pricing rule applied",
                priced.len(),
                now.to_rfc3339()
            );
            CommandResult::success_with_data(COMMAND, message, &priced)
        }
        Err(failure) => CommandResult::from_failure(COMMAND, failure),
    }
}

fn parse_instant(raw: Option<&str>) -> Result<DateTime<Utc>, Failure> {
    match raw {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .map(|instant| instant.with_timezone(&Utc))
            .map_err(|error| {
                ("invalid_argument", format!("--at must be an RFC3339 timestamp: {error}"), 2)
            }),
    }
}
