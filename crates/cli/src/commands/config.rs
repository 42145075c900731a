use std::env;
use std::fs;
use std::path::Path;

use secrecy::ExposeSecret;
use tablechat_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

/// One reported setting: dotted key, optional env var, and whether a CLI flag
/// can set it.
struct Field<'a> {
    key: &'static str,
    value: String,
    env_keys: &'a [&'static str],
    flag: Option<(&'static str, bool)>,
}

pub fn run(options: &LoadOptions) -> String {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let overrides = &options.overrides;

    let api_key = match &config.llm.api_key {
        Some(key) => redact_key(key.expose_secret()),
        None => "<unset>".to_string(),
    };

    let fields = [
        Field {
            key: "sheet.data_dir",
            value: config.sheet.data_dir.display().to_string(),
            env_keys: &["TABLECHAT_SHEET_DATA_DIR"],
            flag: Some(("--data-dir", overrides.data_dir.is_some())),
        },
        Field {
            key: "sheet.name",
            value: config.sheet.name.clone(),
            env_keys: &["TABLECHAT_SHEET_NAME"],
            flag: Some(("--sheet", overrides.sheet_name.is_some())),
        },
        Field {
            key: "sheet.columns",
            value: config.sheet.columns.clone(),
            env_keys: &["TABLECHAT_SHEET_COLUMNS"],
            flag: None,
        },
        Field {
            key: "llm.provider",
            value: format!("{:?}", config.llm.provider),
            env_keys: &["TABLECHAT_LLM_PROVIDER"],
            flag: None,
        },
        Field {
            key: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["TABLECHAT_LLM_MODEL"],
            flag: None,
        },
        Field {
            key: "llm.base_url",
            value: config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["TABLECHAT_LLM_BASE_URL"],
            flag: None,
        },
        Field {
            key: "llm.api_key",
            value: api_key,
            env_keys: &["TABLECHAT_LLM_API_KEY", "GEMINI_API_KEY"],
            flag: None,
        },
        Field {
            key: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["TABLECHAT_LLM_TIMEOUT_SECS"],
            flag: None,
        },
        Field {
            key: "llm.max_retries",
            value: config.llm.max_retries.to_string(),
            env_keys: &["TABLECHAT_LLM_MAX_RETRIES"],
            flag: None,
        },
        Field {
            key: "query.default_salary_above",
            value: config.query.default_salary_above.to_string(),
            env_keys: &["TABLECHAT_QUERY_DEFAULT_SALARY_ABOVE"],
            flag: None,
        },
        Field {
            key: "query.default_salary_below",
            value: config.query.default_salary_below.to_string(),
            env_keys: &["TABLECHAT_QUERY_DEFAULT_SALARY_BELOW"],
            flag: None,
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["TABLECHAT_LOGGING_LEVEL", "TABLECHAT_LOG_LEVEL"],
            flag: None,
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["TABLECHAT_LOGGING_FORMAT", "TABLECHAT_LOG_FORMAT"],
            flag: None,
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field<'_>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some((flag, true)) = field.flag {
        return format!("flag ({flag})");
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
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

/// Keeps a recognisable prefix such as `sk-` and hides the rest.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_key};

    #[test]
    fn redaction_keeps_only_the_prefix() {
        assert_eq!(redact_key("sk-live-abcdef"), "sk-***");
        assert_eq!(redact_key("abcdef"), "<redacted>");
        assert_eq!(redact_key("   "), "<empty>");
    }

    #[test]
    fn dotted_paths_resolve_in_toml() {
        let doc: toml::Value = "[sheet]\nname = \"Staff\"\n".parse().expect("valid toml");
        assert!(contains_path(&doc, "sheet.name"));
        assert!(!contains_path(&doc, "sheet.columns"));
        assert!(!contains_path(&doc, "llm.model"));
    }
}
