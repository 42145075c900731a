pub mod ask;
pub mod chat;
pub mod classify;
pub mod config;
pub mod doctor;
pub mod seed;

use serde::Serialize;
use tablechat_core::config::{AppConfig, LoadOptions};
use tablechat_core::ApplicationError;

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
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(&payload) }
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
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    /// Plain text output for interactive use.
    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    /// Maps a collaborator failure to its exit code and a user-safe message
    /// carrying the correlation id.
    pub fn from_application_error(
        command: &str,
        error: ApplicationError,
        correlation_id: &str,
    ) -> Self {
        let error_class = error.error_class();
        let exit_code = exit_code_for(&error);
        let detail = error.to_string();
        let interface = error.into_interface(correlation_id);
        Self::failure(
            command,
            error_class,
            format!(
                "{} ({detail}; correlation id {})",
                interface.user_message(),
                interface.correlation_id()
            ),
            exit_code,
        )
    }
}

pub fn exit_code_for(error: &ApplicationError) -> u8 {
    match error {
        ApplicationError::Configuration(_) => 2,
        ApplicationError::DataSource(_) => 3,
        ApplicationError::Model(_) | ApplicationError::Authentication(_) => 4,
    }
}

pub(crate) fn load_config(command: &str, options: &LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    })
}

pub(crate) fn async_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            1,
        )
    })
}

pub(crate) fn serialize_json<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

fn serialize_payload(payload: &CommandOutcome) -> String {
    serialize_json(payload)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tablechat_core::ApplicationError;

    use super::{exit_code_for, CommandResult};

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(exit_code_for(&ApplicationError::Configuration("x".into())), 2);
        assert_eq!(exit_code_for(&ApplicationError::DataSource("x".into())), 3);
        assert_eq!(exit_code_for(&ApplicationError::Model("x".into())), 4);
        assert_eq!(exit_code_for(&ApplicationError::Authentication("x".into())), 4);
    }

    #[test]
    fn application_failure_carries_class_and_correlation_id() {
        let result = CommandResult::from_application_error(
            "ask",
            ApplicationError::DataSource("sheet `Employees` was not found".into()),
            "req-7",
        );
        assert_eq!(result.exit_code, 3);

        let payload: Value = serde_json::from_str(&result.output).expect("valid json");
        assert_eq!(payload["error_class"], "data_source");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("could not reach the data source"));
        assert!(message.contains("req-7"));
    }
}
