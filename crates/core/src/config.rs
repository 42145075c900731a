use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intent::ClassifierConfig;
use crate::table::{RangeError, RangeSpec};

const DEFAULT_MODEL: &str = "llama3.1";
/// Used when the Gemini provider is selected and no model was configured.
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub sheet: SheetConfig,
    pub llm: LlmConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SheetConfig {
    pub data_dir: PathBuf,
    pub name: String,
    pub columns: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct QueryConfig {
    pub default_salary_above: i64,
    pub default_salary_below: i64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    OpenAi,
    Anthropic,
    Ollama,
    Offline,
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
    pub data_dir: Option<PathBuf>,
    pub sheet_name: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
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
        Self {
            sheet: SheetConfig {
                data_dir: PathBuf::from("data"),
                name: "Employees".to_string(),
                columns: "A:E".to_string(),
            },
            llm: LlmConfig {
                provider: LlmProvider::Offline,
                api_key: None,
                base_url: None,
                model: DEFAULT_MODEL.to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            query: QueryConfig { default_salary_above: 90_000, default_salary_below: 80_000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl SheetConfig {
    /// The range fetched for every question, e.g. `Employees!A:E`.
    pub fn query_range(&self) -> Result<RangeSpec, RangeError> {
        RangeSpec::parse(&format!("{}!{}", self.name, self.columns))
    }
}

impl QueryConfig {
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            default_salary_above: self.default_salary_above,
            default_salary_below: self.default_salary_below,
            ..ClassifierConfig::default()
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "offline" => Ok(Self::Offline),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|openai|anthropic|ollama|offline)"
            ))),
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tablechat.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        if config.llm.provider == LlmProvider::Gemini && config.llm.model == DEFAULT_MODEL {
            config.llm.model = GEMINI_DEFAULT_MODEL.to_string();
        }
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(sheet) = patch.sheet {
            if let Some(data_dir) = sheet.data_dir {
                self.sheet.data_dir = data_dir;
            }
            if let Some(name) = sheet.name {
                self.sheet.name = name;
            }
            if let Some(columns) = sheet.columns {
                self.sheet.columns = columns;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(query) = patch.query {
            if let Some(above) = query.default_salary_above {
                self.query.default_salary_above = above;
            }
            if let Some(below) = query.default_salary_below {
                self.query.default_salary_below = below;
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
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TABLECHAT_SHEET_DATA_DIR") {
            self.sheet.data_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("TABLECHAT_SHEET_NAME") {
            self.sheet.name = value;
        }
        if let Some(value) = read_env("TABLECHAT_SHEET_COLUMNS") {
            self.sheet.columns = value;
        }

        if let Some(value) = read_env("TABLECHAT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) =
            read_env("TABLECHAT_LLM_API_KEY").or_else(|| read_env("GEMINI_API_KEY"))
        {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TABLECHAT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("TABLECHAT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("TABLECHAT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("TABLECHAT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TABLECHAT_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("TABLECHAT_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("TABLECHAT_QUERY_DEFAULT_SALARY_ABOVE") {
            self.query.default_salary_above =
                parse_i64("TABLECHAT_QUERY_DEFAULT_SALARY_ABOVE", &value)?;
        }
        if let Some(value) = read_env("TABLECHAT_QUERY_DEFAULT_SALARY_BELOW") {
            self.query.default_salary_below =
                parse_i64("TABLECHAT_QUERY_DEFAULT_SALARY_BELOW", &value)?;
        }

        let log_level =
            read_env("TABLECHAT_LOGGING_LEVEL").or_else(|| read_env("TABLECHAT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TABLECHAT_LOGGING_FORMAT").or_else(|| read_env("TABLECHAT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.sheet.data_dir = data_dir;
        }
        if let Some(sheet_name) = overrides.sheet_name {
            self.sheet.name = sheet_name;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_sheet(&self.sheet)?;
        validate_llm(&self.llm)?;
        validate_query(&self.query)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Config file locations checked when no explicit path is given.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["tablechat.toml", "config/tablechat.toml"];

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists())
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

fn validate_sheet(sheet: &SheetConfig) -> Result<(), ConfigError> {
    if sheet.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("sheet.data_dir must not be empty".to_string()));
    }

    let name = sheet.name.trim();
    if name.is_empty() {
        return Err(ConfigError::Validation("sheet.name must not be empty".to_string()));
    }
    if name.contains(['!', '/', '\\']) {
        return Err(ConfigError::Validation(
            "sheet.name must not contain `!`, `/`, or `\\`".to_string(),
        ));
    }

    sheet.query_range().map_err(|error| {
        ConfigError::Validation(format!(
            "sheet.columns must be an A1 column span such as `A:E` ({error})"
        ))
    })?;

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::Gemini | LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for gemini/openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
        LlmProvider::Offline => {}
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_query(query: &QueryConfig) -> Result<(), ConfigError> {
    if query.default_salary_above < 0 || query.default_salary_below < 0 {
        return Err(ConfigError::Validation(
            "query default salary thresholds must not be negative".to_string(),
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

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    sheet: Option<SheetPatch>,
    llm: Option<LlmPatch>,
    query: Option<QueryPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetPatch {
    data_dir: Option<PathBuf>,
    name: Option<String>,
    columns: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryPatch {
    default_salary_above: Option<i64>,
    default_salary_below: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat,
        GEMINI_DEFAULT_MODEL,
    };
    use crate::table::RangeSpec;

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
    fn defaults_are_valid_and_offline() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        ensure(config.llm.provider == LlmProvider::Offline, "default provider should be offline")?;
        ensure(config.sheet.name == "Employees", "default sheet should be Employees")?;
        ensure(
            config.sheet.query_range().ok() == Some(RangeSpec::columns("Employees", 0, 4)),
            "default range should be Employees!A:E",
        )?;
        ensure(
            config.query.classifier_config().default_salary_above == 90_000,
            "default above threshold should be 90000",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_TABLECHAT_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tablechat.toml");
            fs::write(
                &path,
                r#"
[llm]
provider = "open_ai"
api_key = "${TEST_TABLECHAT_API_KEY}"
model = "gpt-4o-mini"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret().to_string())
                    == Some("sk-from-env".to_string()),
                "api key should be loaded from environment",
            )?;
            ensure(config.llm.model == "gpt-4o-mini", "model should come from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_TABLECHAT_API_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TABLECHAT_LOG_LEVEL", "warn");
        env::set_var("TABLECHAT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["TABLECHAT_LOG_LEVEL", "TABLECHAT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TABLECHAT_SHEET_NAME", "FromEnv");
        env::set_var("TABLECHAT_QUERY_DEFAULT_SALARY_BELOW", "70000");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tablechat.toml");
            fs::write(
                &path,
                r#"
[sheet]
name = "FromFile"
data_dir = "from-file"

[query]
default_salary_above = 100000
default_salary_below = 60000

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    data_dir: Some(PathBuf::from("from-override")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.sheet.data_dir == PathBuf::from("from-override"),
                "override data dir should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.sheet.name == "FromEnv", "env sheet name should win over file")?;
            ensure(
                config.query.default_salary_above == 100_000,
                "file threshold should win over default",
            )?;
            ensure(
                config.query.default_salary_below == 70_000,
                "env threshold should win over file",
            )?;
            Ok(())
        })();

        clear_vars(&["TABLECHAT_SHEET_NAME", "TABLECHAT_QUERY_DEFAULT_SALARY_BELOW"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        clear_vars(&["GEMINI_API_KEY", "TABLECHAT_LLM_API_KEY"]);
        env::set_var("TABLECHAT_LLM_PROVIDER", "anthropic");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(&["TABLECHAT_LLM_PROVIDER"]);
        result
    }

    #[test]
    fn invalid_columns_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TABLECHAT_SHEET_COLUMNS", "E:A");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("inverted columns should not validate".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::Validation(ref message) if message.contains("sheet.columns")),
                "validation failure should mention sheet.columns",
            )
        })();

        clear_vars(&["TABLECHAT_SHEET_COLUMNS"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TABLECHAT_LLM_TIMEOUT_SECS", "soon");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("non-numeric timeout should not load".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "TABLECHAT_LLM_TIMEOUT_SECS"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["TABLECHAT_LLM_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TABLECHAT_LLM_PROVIDER", "openai");
        env::set_var("TABLECHAT_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["TABLECHAT_LLM_PROVIDER", "TABLECHAT_LLM_API_KEY"]);
        result
    }

    #[test]
    fn gemini_takes_key_from_gemini_api_key_and_defaults_model() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        clear_vars(&["TABLECHAT_LLM_API_KEY", "TABLECHAT_LLM_MODEL"]);
        env::set_var("TABLECHAT_LLM_PROVIDER", "gemini");
        env::set_var("GEMINI_API_KEY", "gemini-key-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.llm.provider == LlmProvider::Gemini, "provider should be gemini")?;
            ensure(config.llm.model == GEMINI_DEFAULT_MODEL, "gemini model should be defaulted")?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret().to_string())
                    == Some("gemini-key-value".to_string()),
                "GEMINI_API_KEY should supply the key",
            )
        })();

        clear_vars(&["TABLECHAT_LLM_PROVIDER", "GEMINI_API_KEY"]);
        result
    }

    #[test]
    fn gemini_without_key_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        clear_vars(&["TABLECHAT_LLM_API_KEY", "GEMINI_API_KEY"]);
        env::set_var("TABLECHAT_LLM_PROVIDER", "gemini");

        let result = (|| -> Result<(), String> {
            match AppConfig::load(LoadOptions::default()) {
                Ok(_) => Err("gemini without a key should not validate".to_string()),
                Err(error) => ensure(
                    matches!(error, ConfigError::Validation(ref message) if message.contains("llm.api_key")),
                    "validation failure should mention llm.api_key",
                ),
            }
        })();

        clear_vars(&["TABLECHAT_LLM_PROVIDER"]);
        result
    }
}
