use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recommend::{
    RecommendationSettings, StrategyWeights, DEFAULT_SETTINGS, HARD_RESULT_LIMIT,
};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub recommendation: RecommendationConfig,
    pub pricing: PricingConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub collaborative_weight: f64,
    pub content_weight: f64,
    pub popularity_weight: f64,
    pub trending_weight: f64,
    pub min_similarity: f64,
    pub min_interactions: usize,
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    /// Offset applied to the evaluation instant before time-of-day and
    /// special-day predicates are checked.
    pub utc_offset_minutes: i32,
}

#[derive(Clone, Debug)]
pub struct MaintenanceConfig {
    pub enabled: bool,
    pub refresh_interval_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub maintenance_enabled: Option<bool>,
    pub pricing_utc_offset_minutes: Option<i32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let weights = DEFAULT_SETTINGS.strategy_weights;
        Self {
            database: DatabaseConfig {
                url: "sqlite://bloom.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            recommendation: RecommendationConfig {
                collaborative_weight: weights.collaborative,
                content_weight: weights.content,
                popularity_weight: weights.popularity,
                trending_weight: weights.trending,
                min_similarity: DEFAULT_SETTINGS.min_similarity,
                min_interactions: DEFAULT_SETTINGS.min_interactions,
                default_limit: DEFAULT_SETTINGS.default_limit,
                max_limit: DEFAULT_SETTINGS.max_limit,
            },
            pricing: PricingConfig { utc_offset_minutes: 0 },
            maintenance: MaintenanceConfig { enabled: true, refresh_interval_secs: 3600 },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl RecommendationConfig {
    pub fn settings(&self) -> RecommendationSettings {
        RecommendationSettings {
            strategy_weights: StrategyWeights {
                collaborative: self.collaborative_weight,
                content: self.content_weight,
                popularity: self.popularity_weight,
                trending: self.trending_weight,
            },
            min_similarity: self.min_similarity,
            min_interactions: self.min_interactions,
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            ..DEFAULT_SETTINGS
        }
    }
}

impl PricingConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        let out_of_range = || {
            ConfigError::Validation(
                "pricing.utc_offset_minutes must be in range -720..=840".to_string(),
            )
        };
        if !(-720..=840).contains(&self.utc_offset_minutes) {
            return Err(out_of_range());
        }
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(out_of_range)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bloom.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(weight) = recommendation.collaborative_weight {
                self.recommendation.collaborative_weight = weight;
            }
            if let Some(weight) = recommendation.content_weight {
                self.recommendation.content_weight = weight;
            }
            if let Some(weight) = recommendation.popularity_weight {
                self.recommendation.popularity_weight = weight;
            }
            if let Some(weight) = recommendation.trending_weight {
                self.recommendation.trending_weight = weight;
            }
            if let Some(min_similarity) = recommendation.min_similarity {
                self.recommendation.min_similarity = min_similarity;
            }
            if let Some(min_interactions) = recommendation.min_interactions {
                self.recommendation.min_interactions = min_interactions;
            }
            if let Some(default_limit) = recommendation.default_limit {
                self.recommendation.default_limit = default_limit;
            }
            if let Some(max_limit) = recommendation.max_limit {
                self.recommendation.max_limit = max_limit;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(utc_offset_minutes) = pricing.utc_offset_minutes {
                self.pricing.utc_offset_minutes = utc_offset_minutes;
            }
        }

        if let Some(maintenance) = patch.maintenance {
            if let Some(enabled) = maintenance.enabled {
                self.maintenance.enabled = enabled;
            }
            if let Some(refresh_interval_secs) = maintenance.refresh_interval_secs {
                self.maintenance.refresh_interval_secs = refresh_interval_secs;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BLOOM_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BLOOM_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("BLOOM_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BLOOM_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("BLOOM_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BLOOM_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BLOOM_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("BLOOM_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("BLOOM_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("BLOOM_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("BLOOM_LOGGING_LEVEL").or_else(|| read_env("BLOOM_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("BLOOM_LOGGING_FORMAT").or_else(|| read_env("BLOOM_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("BLOOM_RECOMMENDATION_COLLABORATIVE_WEIGHT") {
            self.recommendation.collaborative_weight =
                parse_f64("BLOOM_RECOMMENDATION_COLLABORATIVE_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("BLOOM_RECOMMENDATION_CONTENT_WEIGHT") {
            self.recommendation.content_weight =
                parse_f64("BLOOM_RECOMMENDATION_CONTENT_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("BLOOM_RECOMMENDATION_POPULARITY_WEIGHT") {
            self.recommendation.popularity_weight =
                parse_f64("BLOOM_RECOMMENDATION_POPULARITY_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("BLOOM_RECOMMENDATION_TRENDING_WEIGHT") {
            self.recommendation.trending_weight =
                parse_f64("BLOOM_RECOMMENDATION_TRENDING_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("BLOOM_RECOMMENDATION_MIN_SIMILARITY") {
            self.recommendation.min_similarity =
                parse_f64("BLOOM_RECOMMENDATION_MIN_SIMILARITY", &value)?;
        }
        if let Some(value) = read_env("BLOOM_RECOMMENDATION_MIN_INTERACTIONS") {
            self.recommendation.min_interactions =
                parse_usize("BLOOM_RECOMMENDATION_MIN_INTERACTIONS", &value)?;
        }
        if let Some(value) = read_env("BLOOM_RECOMMENDATION_DEFAULT_LIMIT") {
            self.recommendation.default_limit =
                parse_usize("BLOOM_RECOMMENDATION_DEFAULT_LIMIT", &value)?;
        }
        if let Some(value) = read_env("BLOOM_RECOMMENDATION_MAX_LIMIT") {
            self.recommendation.max_limit = parse_usize("BLOOM_RECOMMENDATION_MAX_LIMIT", &value)?;
        }

        if let Some(value) = read_env("BLOOM_PRICING_UTC_OFFSET_MINUTES") {
            self.pricing.utc_offset_minutes =
                parse_i32("BLOOM_PRICING_UTC_OFFSET_MINUTES", &value)?;
        }

        if let Some(value) = read_env("BLOOM_MAINTENANCE_ENABLED") {
            self.maintenance.enabled = parse_bool("BLOOM_MAINTENANCE_ENABLED", &value)?;
        }
        if let Some(value) = read_env("BLOOM_MAINTENANCE_REFRESH_INTERVAL_SECS") {
            self.maintenance.refresh_interval_secs =
                parse_u64("BLOOM_MAINTENANCE_REFRESH_INTERVAL_SECS", &value)?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(enabled) = overrides.maintenance_enabled {
            self.maintenance.enabled = enabled;
        }
        if let Some(offset) = overrides.pricing_utc_offset_minutes {
            self.pricing.utc_offset_minutes = offset;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        validate_recommendation(&self.recommendation)?;
        self.pricing.offset()?;
        validate_maintenance(&self.maintenance)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bloom.toml"), PathBuf::from("config/bloom.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    let weights = [
        ("collaborative_weight", recommendation.collaborative_weight),
        ("content_weight", recommendation.content_weight),
        ("popularity_weight", recommendation.popularity_weight),
        ("trending_weight", recommendation.trending_weight),
    ];
    for (name, weight) in weights {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConfigError::Validation(format!(
                "recommendation.{name} must be a non-negative number"
            )));
        }
    }

    if !(0.0..=1.0).contains(&recommendation.min_similarity) {
        return Err(ConfigError::Validation(
            "recommendation.min_similarity must be in range 0.0..=1.0".to_string(),
        ));
    }

    if recommendation.max_limit == 0 || recommendation.max_limit > HARD_RESULT_LIMIT {
        return Err(ConfigError::Validation(format!(
            "recommendation.max_limit must be in range 1..={HARD_RESULT_LIMIT}"
        )));
    }

    if recommendation.default_limit == 0
        || recommendation.default_limit > recommendation.max_limit
    {
        return Err(ConfigError::Validation(
            "recommendation.default_limit must be in range 1..=recommendation.max_limit"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_maintenance(maintenance: &MaintenanceConfig) -> Result<(), ConfigError> {
    if maintenance.enabled && maintenance.refresh_interval_secs < 60 {
        return Err(ConfigError::Validation(
            "maintenance.refresh_interval_secs must be at least 60 when maintenance is enabled"
                .to_string(),
        ));
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_i32(key: &str, value: &str) -> Result<i32, ConfigError> {
    value.parse::<i32>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
    recommendation: Option<RecommendationPatch>,
    pricing: Option<PricingPatch>,
    maintenance: Option<MaintenancePatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    collaborative_weight: Option<f64>,
    content_weight: Option<f64>,
    popularity_weight: Option<f64>,
    trending_weight: Option<f64>,
    min_similarity: Option<f64>,
    min_interactions: Option<usize>,
    default_limit: Option<usize>,
    max_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct MaintenancePatch {
    enabled: Option<bool>,
    refresh_interval_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_documented_recommendation_settings() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        let settings = config.recommendation.settings();

        ensure(settings.strategy_weights.collaborative == 0.4, "collaborative weight is 0.4")?;
        ensure(settings.strategy_weights.content == 0.3, "content weight is 0.3")?;
        ensure(settings.strategy_weights.popularity == 0.2, "popularity weight is 0.2")?;
        ensure(settings.strategy_weights.trending == 0.1, "trending weight is 0.1")?;
        ensure(settings.min_similarity == 0.1, "min similarity is 0.1")?;
        ensure(settings.min_interactions == 3, "min interactions is 3")?;
        ensure(settings.default_limit == 10, "default limit is 10")?;
        ensure(settings.max_limit == 50, "max limit is 50")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_BLOOM_DB_PATH", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("bloom.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_BLOOM_DB_PATH}"

[recommendation]
default_limit = 12
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from the environment",
            )?;
            ensure(config.recommendation.default_limit == 12, "file default limit should apply")
        })();

        clear_vars(&["TEST_BLOOM_DB_PATH"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BLOOM_LOG_LEVEL", "warn");
        env::set_var("BLOOM_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )
        })();

        clear_vars(&["BLOOM_LOG_LEVEL", "BLOOM_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BLOOM_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("BLOOM_PRICING_UTC_OFFSET_MINUTES", "60");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("bloom.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[pricing]
utc_offset_minutes = 120

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.pricing.utc_offset_minutes == 60,
                "env pricing offset should win over file and defaults",
            )
        })();

        clear_vars(&["BLOOM_DATABASE_URL", "BLOOM_PRICING_UTC_OFFSET_MINUTES"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BLOOM_RECOMMENDATION_DEFAULT_LIMIT", "80");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("recommendation.default_limit")
            );
            ensure(has_message, "validation failure should mention recommendation.default_limit")
        })();

        clear_vars(&["BLOOM_RECOMMENDATION_DEFAULT_LIMIT"]);
        result
    }

    #[test]
    fn max_limit_above_hard_limit_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BLOOM_RECOMMENDATION_MAX_LIMIT", "200");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected max_limit above 50 to be rejected".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::Validation(ref message)
                        if message.contains("recommendation.max_limit")
                ),
                "validation failure should mention recommendation.max_limit",
            )
        })();

        clear_vars(&["BLOOM_RECOMMENDATION_MAX_LIMIT"]);
        result
    }

    #[test]
    fn invalid_env_value_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BLOOM_MAINTENANCE_ENABLED", "sometimes");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. } if key == "BLOOM_MAINTENANCE_ENABLED"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["BLOOM_MAINTENANCE_ENABLED"]);
        result
    }

    #[test]
    fn out_of_range_pricing_offset_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                pricing_utc_offset_minutes: Some(24 * 60),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::Validation(ref message)) if message.contains("pricing.utc_offset_minutes")),
            "offset beyond a day should fail validation",
        )
    }
}
