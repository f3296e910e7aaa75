use bloom_core::domain::interaction::UserId;
use bloom_core::domain::product::ProductId;
use bloom_core::domain::trending::TrendPeriod;
use bloom_core::errors::ApplicationError;
use bloom_core::recommend::{RecommendationEngine, RecommendationRequest};
use bloom_db::sql_stores;
use clap::Args;
use rust_decimal::Decimal;

use crate::commands::{
    application_failure, build_runtime, load_config, open_database, CommandResult,
};

const COMMAND: &str = "recommend";

#[derive(Debug, Clone, Args)]
pub struct RecommendArgs {
    /// personalized, similar, trending, occasion_based or price_based
    #[arg(long = "type", value_name = "TYPE", default_value = "personalized")]
    pub recommendation_type: String,
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub session: Option<String>,
    /// Reference product for `similar`
    #[arg(long)]
    pub product: Option<i64>,
    #[arg(long)]
    pub occasion: Option<String>,
    #[arg(long)]
    pub min_price: Option<Decimal>,
    #[arg(long)]
    pub max_price: Option<Decimal>,
    /// daily, weekly or monthly
    #[arg(long)]
    pub period: Option<String>,
    #[arg(long)]
    pub limit: Option<usize>,
}

impl RecommendArgs {
    pub fn new(recommendation_type: impl Into<String>) -> Self {
        Self {
            recommendation_type: recommendation_type.into(),
            user: None,
            session: None,
            product: None,
            occasion: None,
            min_price: None,
            max_price: None,
            period: None,
            limit: None,
        }
    }

    fn to_request(&self) -> Result<RecommendationRequest, ApplicationError> {
        let period = self.period.as_deref().map(str::parse::<TrendPeriod>).transpose()?;

        Ok(RecommendationRequest {
            user_id: self.user.clone().map(UserId::new),
            session_id: self.session.clone(),
            recommendation_type: self.recommendation_type.clone(),
            product_id: self.product.map(ProductId),
            occasion: self.occasion.clone(),
            price_min: self.min_price,
            price_max: self.max_price,
            period,
            limit: self.limit,
        })
    }
}

pub fn run(args: RecommendArgs) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let request = match args.to_request() {
        Ok(request) => request,
        Err(error) => return CommandResult::from_failure(COMMAND, application_failure(error)),
    };
    let runtime = match build_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let engine =
            RecommendationEngine::new(sql_stores(pool.clone()), config.recommendation.settings());

        let outcome = engine.recommend(request).await.map_err(application_failure);
        pool.close().await;
        outcome
    });

    match result {
        Ok(response) => {
            let message = format!(
                "{} {} recommendations",
                response.total,
                response.recommendation_type.as_str()
            );
            CommandResult::success_with_data(COMMAND, message, &response)
        }
        Err(failure) => CommandResult::from_failure(COMMAND, failure),
    }
}
