use std::env;
use std::sync::{Mutex, OnceLock};

use bloom_cli::commands::price::PriceArgs;
use bloom_cli::commands::recommend::RecommendArgs;
use bloom_cli::commands::refresh::{RefreshArgs, RefreshJob};
use bloom_cli::commands::{config, migrate, price, recommend, refresh, seed};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_in_memory_database() {
    with_env(&[("BLOOM_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_unknown_log_format() {
    with_env(&[("BLOOM_DATABASE_URL", "sqlite::memory:"), ("BLOOM_LOGGING_FORMAT", "xml")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let database = TempDatabase::new();
    with_env(&[("BLOOM_DATABASE_URL", database.url())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["command"], "seed");
        assert_eq!(first_payload["status"], "ok");
        assert_eq!(
            first_payload["data"]["users"],
            serde_json::json!(["alice", "bob", "carol", "dave"])
        );

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn recommend_rejects_unknown_type_with_invalid_argument() {
    with_env(&[("BLOOM_DATABASE_URL", "sqlite::memory:")], || {
        let result = recommend::run(RecommendArgs::new("bestsellers"));
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "recommend");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_argument");
    });
}

#[test]
fn trending_falls_back_to_popular_products_before_any_refresh() {
    let database = TempDatabase::new();
    with_env(&[("BLOOM_DATABASE_URL", database.url())], || {
        assert_eq!(seed::run().exit_code, 0);

        let mut args = RecommendArgs::new("trending");
        args.limit = Some(3);
        let result = recommend::run(args);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["recommendation_type"], "trending");
        let candidates = payload["data"]["candidates"].as_array().expect("candidates array");
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|candidate| candidate["category"] == "popular"));
    });
}

#[test]
fn refresh_enables_personalized_recommendations() {
    let database = TempDatabase::new();
    with_env(&[("BLOOM_DATABASE_URL", database.url())], || {
        assert_eq!(seed::run().exit_code, 0);

        let refreshed = refresh::run(RefreshArgs { job: RefreshJob::All, active_days: 30 });
        assert_eq!(refreshed.exit_code, 0, "{}", refreshed.output);
        let report = parse_payload(&refreshed.output);
        assert_eq!(report["data"]["trending"].as_array().map(Vec::len), Some(3));
        assert_eq!(report["data"]["preferences_updated"], 3);

        let mut args = RecommendArgs::new("personalized");
        args.user = Some("alice".to_string());
        let result = recommend::run(args);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["recommendation_type"], "personalized");
        assert!(payload["data"]["total"].as_u64().unwrap_or_default() > 0);
    });
}

#[test]
fn price_applies_the_orchid_evening_rule() {
    let database = TempDatabase::new();
    with_env(&[("BLOOM_DATABASE_URL", database.url())], || {
        assert_eq!(seed::run().exit_code, 0);

        let result = price::run(PriceArgs {
            product: Some(8),
            at: Some("2026-02-14T19:00:00Z".to_string()),
        });
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        let pricing = &payload["data"][0]["pricing"];
        assert_eq!(pricing["applied_rule"]["id"], 2);
        let effective = pricing["effective_price"]
            .as_str()
            .and_then(|raw| raw.parse::<Decimal>().ok())
            .expect("decimal effective price");
        assert_eq!(effective, Decimal::new(5000, 2));

        let missing = price::run(PriceArgs { product: Some(404), at: None });
        assert_eq!(missing.exit_code, 7);
        assert_eq!(parse_payload(&missing.output)["error_class"], "not_found");
    });
}

#[test]
fn config_reports_env_and_default_sources() {
    with_env(&[("BLOOM_DATABASE_URL", "sqlite::memory:")], || {
        let output = config::run();

        assert!(output.contains(
            "- database.url = sqlite::memory: (source: env (BLOOM_DATABASE_URL))"
        ));
        assert!(output.contains("- recommendation.default_limit = 10 (source: default)"));
        assert!(output.contains("- maintenance.enabled = true (source: default)"));
    });
}

struct TempDatabase {
    _dir: TempDir,
    url: String,
}

impl TempDatabase {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("bloom.db").display());
        Self { _dir: dir, url }
    }

    fn url(&self) -> &str {
        &self.url
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|e| e.into_inner());

    let keys = [
        "BLOOM_DATABASE_URL",
        "BLOOM_DATABASE_MAX_CONNECTIONS",
        "BLOOM_DATABASE_TIMEOUT_SECS",
        "BLOOM_SERVER_BIND_ADDRESS",
        "BLOOM_SERVER_HEALTH_CHECK_PORT",
        "BLOOM_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "BLOOM_LOGGING_LEVEL",
        "BLOOM_LOGGING_FORMAT",
        "BLOOM_LOG_LEVEL",
        "BLOOM_LOG_FORMAT",
        "BLOOM_RECOMMENDATION_MIN_INTERACTIONS",
        "BLOOM_RECOMMENDATION_DEFAULT_LIMIT",
        "BLOOM_RECOMMENDATION_MAX_LIMIT",
        "BLOOM_PRICING_UTC_OFFSET_MINUTES",
        "BLOOM_MAINTENANCE_ENABLED",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
