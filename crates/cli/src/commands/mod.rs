pub mod config;
pub mod migrate;
pub mod price;
pub mod recommend;
pub mod refresh;
pub mod seed;

use bloom_core::config::{AppConfig, LoadOptions};
use bloom_core::errors::ApplicationError;
use bloom_db::{connect_from_config, migrations, DbPool};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

/// Error class, message and process exit code of a failed command.
pub(crate) type Failure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Success outcome carrying a JSON rendering of `data`.
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(
                    command,
                    "serialization",
                    format!("could not render command output: {error}"),
                    9,
                );
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Connects and applies pending migrations so every command sees the
/// current schema.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_from_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

pub(crate) fn application_failure(error: ApplicationError) -> Failure {
    let exit_code = match error.class() {
        "invalid_argument" | "configuration" => 2,
        "not_found" => 7,
        _ => 8,
    };
    (error.class(), error.to_string(), exit_code)
}

#[cfg(test)]
mod tests {
    use bloom_core::errors::{ApplicationError, DomainError};
    use serde_json::Value;

    use super::{application_failure, CommandResult};

    #[test]
    fn failures_keep_the_application_error_class() {
        let (class, message, code) =
            application_failure(DomainError::invalid("unknown type `x`").into());
        assert_eq!((class, code), ("invalid_argument", 2));
        assert!(message.contains("unknown type"));

        let (class, _, code) = application_failure(DomainError::not_found("product", 9).into());
        assert_eq!((class, code), ("not_found", 7));

        let (class, _, code) =
            application_failure(ApplicationError::DependencyFailure("locked".into()));
        assert_eq!((class, code), ("dependency_failure", 8));
    }

    #[test]
    fn data_is_only_rendered_when_present() {
        let plain: Value = serde_json::from_str(&CommandResult::success("migrate", "done").output)
            .expect("valid json");
        assert!(plain.get("data").is_none());

        let with_data = CommandResult::success_with_data("price", "priced", &vec![1, 2]);
        let payload: Value = serde_json::from_str(&with_data.output).expect("valid json");
        assert_eq!(payload["data"], serde_json::json!([1, 2]));
        assert_eq!(payload["error_class"], Value::Null);
    }
}
