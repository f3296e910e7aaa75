use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bloom_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// One reported setting: dotted key, rendered value and env override name.
struct Field {
    key: &'static str,
    value: String,
    env_key: &'static str,
}

impl Field {
    fn new(key: &'static str, value: impl ToString, env_key: &'static str) -> Self {
        Self { key, value: value.to_string(), env_key }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            Some(field.env_key),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let recommendation = &config.recommendation;
    vec![
        Field::new("database.url", &config.database.url, "BLOOM_DATABASE_URL"),
        Field::new(
            "database.max_connections",
            config.database.max_connections,
            "BLOOM_DATABASE_MAX_CONNECTIONS",
        ),
        Field::new(
            "database.timeout_secs",
            config.database.timeout_secs,
            "BLOOM_DATABASE_TIMEOUT_SECS",
        ),
        Field::new("server.bind_address", &config.server.bind_address, "BLOOM_SERVER_BIND_ADDRESS"),
        Field::new(
            "server.health_check_port",
            config.server.health_check_port,
            "BLOOM_SERVER_HEALTH_CHECK_PORT",
        ),
        Field::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs,
            "BLOOM_SERVER_GRACEFUL_SHUTDOWN_SECS",
        ),
        Field::new("logging.level", &config.logging.level, "BLOOM_LOGGING_LEVEL"),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            "BLOOM_LOGGING_FORMAT",
        ),
        Field::new(
            "recommendation.collaborative_weight",
            recommendation.collaborative_weight,
            "BLOOM_RECOMMENDATION_COLLABORATIVE_WEIGHT",
        ),
        Field::new(
            "recommendation.content_weight",
            recommendation.content_weight,
            "BLOOM_RECOMMENDATION_CONTENT_WEIGHT",
        ),
        Field::new(
            "recommendation.popularity_weight",
            recommendation.popularity_weight,
            "BLOOM_RECOMMENDATION_POPULARITY_WEIGHT",
        ),
        Field::new(
            "recommendation.trending_weight",
            recommendation.trending_weight,
            "BLOOM_RECOMMENDATION_TRENDING_WEIGHT",
        ),
        Field::new(
            "recommendation.min_similarity",
            recommendation.min_similarity,
            "BLOOM_RECOMMENDATION_MIN_SIMILARITY",
        ),
        Field::new(
            "recommendation.min_interactions",
            recommendation.min_interactions,
            "BLOOM_RECOMMENDATION_MIN_INTERACTIONS",
        ),
        Field::new(
            "recommendation.default_limit",
            recommendation.default_limit,
            "BLOOM_RECOMMENDATION_DEFAULT_LIMIT",
        ),
        Field::new(
            "recommendation.max_limit",
            recommendation.max_limit,
            "BLOOM_RECOMMENDATION_MAX_LIMIT",
        ),
        Field::new(
            "pricing.utc_offset_minutes",
            config.pricing.utc_offset_minutes,
            "BLOOM_PRICING_UTC_OFFSET_MINUTES",
        ),
        Field::new(
            "maintenance.enabled",
            config.maintenance.enabled,
            "BLOOM_MAINTENANCE_ENABLED",
        ),
        Field::new(
            "maintenance.refresh_interval_secs",
            config.maintenance.refresh_interval_secs,
            "BLOOM_MAINTENANCE_REFRESH_INTERVAL_SECS",
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("bloom.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/bloom.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
