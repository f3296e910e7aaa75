use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use bloom_core::domain::product::ProductId;
use bloom_core::domain::recommendation::{CandidateCategory, RecommendationType};
use bloom_core::domain::trending::TrendPeriod;
use bloom_core::pricing::PricingService;
use bloom_core::recommend::{
    FeedbackInput, RecommendationEngine, RecommendationRequest, DEFAULT_SETTINGS,
};
use bloom_db::{connect_with_settings, migrations, sql_stores, DbPool, DemoCatalogDataset};

type DemoTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

async fn seeded_pool() -> DemoTestResult<DbPool> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    DemoCatalogDataset::load(&pool).await.map_err(|error| format!("seed: {error}"))?;
    Ok(pool)
}

fn valentines_at(hour: u32) -> DemoTestResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2026, 2, 14, hour, 0, 0)
        .single()
        .ok_or_else(|| "valentine's timestamp should be valid".to_string())
}

#[tokio::test]
async fn verification_report_lists_every_seeded_table() -> DemoTestResult {
    let pool = seeded_pool().await?;
    let report = DemoCatalogDataset::verify(&pool).await.map_err(|error| error.to_string())?;
    let json: Value = serde_json::to_value(&report).map_err(|error| error.to_string())?;

    require_eq!(json.get("all_present").and_then(Value::as_bool), Some(true));
    let checks = json
        .get("checks")
        .and_then(Value::as_array)
        .ok_or_else(|| "checks should be an array".to_string())?;
    let names: Vec<&str> =
        checks.iter().filter_map(|check| check.get(0).and_then(Value::as_str)).collect();
    for table in ["product", "pricing_rule", "product_occasion", "active-pricing-rules"] {
        require!(names.contains(&table), "verification should cover `{table}`");
    }
    Ok(())
}

#[tokio::test]
async fn catalog_prices_follow_rule_priority_on_valentines_evening() -> DemoTestResult {
    let pool = seeded_pool().await?;
    let stores = sql_stores(pool);
    let offset = FixedOffset::east_opt(0).ok_or_else(|| "utc offset".to_string())?;
    let pricing = PricingService::new(stores.catalog.clone(), stores.pricing_rules.clone(), offset);

    let evening = pricing.price_catalog(valentines_at(19)?).await.map_err(|e| e.to_string())?;
    let prices: HashMap<ProductId, (Decimal, Option<i64>)> = evening
        .iter()
        .map(|entry| {
            let rule = entry.pricing.applied_rule.as_ref().map(|rule| rule.id.0);
            (entry.product.id, (entry.pricing.effective_price, rule))
        })
        .collect();

    let expected = [
        (1, Decimal::new(4499, 2), Some(3)),
        (2, Decimal::new(4499, 2), Some(3)),
        (3, Decimal::new(4499, 2), Some(3)),
        (4, Decimal::new(2900, 2), None),
        (5, Decimal::new(2450, 2), None),
        (6, Decimal::new(4200, 2), None),
        (7, Decimal::new(5200, 2), Some(1)),
        (8, Decimal::new(5000, 2), Some(2)),
        (10, Decimal::new(3040, 2), Some(1)),
    ];
    for (id, price, rule) in expected {
        require_eq!(
            prices.get(&ProductId(id)).copied(),
            Some((price, rule)),
            "product {id} should cost {price} via rule {rule:?}, got {:?}",
            prices.get(&ProductId(id))
        );
    }

    let noon = pricing.effective_price_for(ProductId(8), valentines_at(12)?).await;
    let noon = noon.map_err(|error| error.to_string())?;
    require_eq!(noon.pricing.effective_price, Decimal::new(5500, 2));
    require!(noon.pricing.applied_rule.is_none(), "orchid discount is evening-only");

    let next_day = valentines_at(19)? + Duration::days(1);
    let roses = pricing.effective_price_for(ProductId(1), next_day).await;
    let roses = roses.map_err(|error| error.to_string())?;
    require_eq!(roses.pricing.effective_price, Decimal::new(4990, 2));
    Ok(())
}

#[tokio::test]
async fn maintenance_jobs_feed_personalized_results() -> DemoTestResult {
    let pool = seeded_pool().await?;
    let engine = RecommendationEngine::new(sql_stores(pool), DEFAULT_SETTINGS);

    let refreshed = engine.update_trending_products().await.map_err(|e| e.to_string())?;
    require_eq!(refreshed.len(), TrendPeriod::ALL.len());
    let similarities = engine.calculate_all_similarities().await.map_err(|e| e.to_string())?;
    require_eq!(similarities.products, 10);
    require!(similarities.pairs_stored > 0, "similarity pass should store pairs");
    let profiles = engine
        .refresh_active_user_preferences(Utc::now() - Duration::days(30))
        .await
        .map_err(|e| e.to_string())?;
    require_eq!(profiles, 3, "dave has too few completed interactions for a profile");

    let response = engine
        .recommend(RecommendationRequest::new("personalized").with_user("alice").with_limit(8))
        .await
        .map_err(|e| e.to_string())?;
    require_eq!(response.recommendation_type, RecommendationType::Personalized);
    require!(!response.candidates.is_empty() && response.candidates.len() <= 8);

    let collaborative: Vec<ProductId> = response
        .candidates
        .iter()
        .filter(|candidate| candidate.category == CandidateCategory::Collaborative)
        .map(|candidate| candidate.product_id())
        .collect();
    require!(!collaborative.is_empty(), "alice's peers should contribute candidates");
    for owned in [1, 2, 6] {
        require!(
            !collaborative.contains(&ProductId(owned)),
            "collaborative candidates must exclude alice's purchase {owned}"
        );
    }

    let similar = engine.similar_products(ProductId(1), 3).await.map_err(|e| e.to_string())?;
    require!(!similar.product_ids().contains(&ProductId(1)));
    require_eq!(
        similar.candidates.first().map(|candidate| candidate.category),
        Some(CandidateCategory::SimilarProducts)
    );

    let trending = engine.trending_products(TrendPeriod::Weekly, 5).await;
    let trending = trending.map_err(|e| e.to_string())?;
    require!(trending
        .candidates
        .iter()
        .all(|candidate| candidate.category == CandidateCategory::Trending));
    Ok(())
}

#[tokio::test]
async fn feedback_round_trips_through_sqlite_stats() -> DemoTestResult {
    let pool = seeded_pool().await?;
    let engine = RecommendationEngine::new(sql_stores(pool), DEFAULT_SETTINGS);

    for (recommendation_type, action) in
        [("occasion_based", "purchased"), ("price_based", "clicked"), ("price_based", "clicked")]
    {
        engine
            .record_feedback(FeedbackInput {
                user_id: None,
                session_id: None,
                product_id: ProductId(4),
                recommendation_type: recommendation_type.to_string(),
                action: action.to_string(),
            })
            .await
            .map_err(|e| e.to_string())?;
    }

    let stats = engine.recommendation_stats(TrendPeriod::Daily).await.map_err(|e| e.to_string())?;
    require_eq!(stats.total_events, 3);
    require_eq!(stats.top_performing_type, Some(RecommendationType::PriceBased));
    require!((stats.conversion_rate - 1.0 / 3.0).abs() < 1e-9);
    Ok(())
}
