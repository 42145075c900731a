use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tablechat_core::config::{LlmConfig, LlmProvider};
use thiserror::Error;
use tracing::warn;

use crate::prompts::DATA_FENCE;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model endpoint rejected credentials ({0})")]
    Unauthorized(StatusCode),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model response had no completion text")]
    EmptyCompletion,
}

impl LlmError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Unauthorized(_) | Self::EmptyCompletion => false,
        }
    }
}

/// Builds the client for the configured provider.
pub fn client_from_config(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider {
        LlmProvider::Offline => Ok(Box::new(OfflineLlm)),
        LlmProvider::Gemini
        | LlmProvider::OpenAi
        | LlmProvider::Anthropic
        | LlmProvider::Ollama => {
            Ok(Box::new(HttpLlmClient::from_config(config)?))
        }
    }
}

pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build http client for language model")?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            provider: config.provider,
            base_url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    fn request(&self, prompt: &str, temperature: f32) -> RequestBuilder {
        match self.provider {
            LlmProvider::Gemini => {
                let mut request = self.client.post(format!(
                    "{}/v1beta/models/{}:generateContent",
                    self.base_url, self.model
                ));
                if let Some(key) = &self.api_key {
                    request = request.query(&[("key", key.expose_secret())]);
                }
                request.json(&json!({
                    "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                    "generationConfig": { "temperature": temperature },
                }))
            }
            LlmProvider::OpenAi => {
                let mut request = self.client.post(format!("{}/v1/chat/completions", self.base_url));
                if let Some(key) = &self.api_key {
                    request = request.bearer_auth(key.expose_secret());
                }
                request.json(&json!({
                    "model": self.model,
                    "temperature": temperature,
                    "messages": [{ "role": "user", "content": prompt }],
                }))
            }
            LlmProvider::Anthropic => {
                let mut request = self
                    .client
                    .post(format!("{}/v1/messages", self.base_url))
                    .header("anthropic-version", "2023-06-01");
                if let Some(key) = &self.api_key {
                    request = request.header("x-api-key", key.expose_secret());
                }
                request.json(&json!({
                    "model": self.model,
                    "max_tokens": 1024,
                    "temperature": temperature,
                    "messages": [{ "role": "user", "content": prompt }],
                }))
            }
            LlmProvider::Ollama | LlmProvider::Offline => {
                self.client.post(format!("{}/api/generate", self.base_url)).json(&json!({
                    "model": self.model,
                    "prompt": prompt,
                    "stream": false,
                    "options": { "temperature": temperature },
                }))
            }
        }
    }

    async fn send_once(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        let response = self.request(prompt, temperature).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::Unauthorized(status));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let payload: Value = response.json().await?;
        completion_text(self.provider, &payload).ok_or(LlmError::EmptyCompletion)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.send_once(prompt, temperature).await {
                Ok(text) => return Ok(text),
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "llm.request.retry",
                        attempt,
                        error = %error,
                        "retrying language model request"
                    );
                    tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Gemini => "https://generativelanguage.googleapis.com",
        LlmProvider::OpenAi => "https://api.openai.com",
        LlmProvider::Anthropic => "https://api.anthropic.com",
        LlmProvider::Ollama | LlmProvider::Offline => "http://localhost:11434",
    }
}

fn completion_text(provider: LlmProvider, payload: &Value) -> Option<String> {
    let text = match provider {
        LlmProvider::Gemini => payload.pointer("/candidates/0/content/parts/0/text"),
        LlmProvider::OpenAi => payload.pointer("/choices/0/message/content"),
        LlmProvider::Anthropic => payload.pointer("/content/0/text"),
        LlmProvider::Ollama | LlmProvider::Offline => payload.get("response"),
    }?;
    text.as_str().map(str::to_string)
}

/// Runs without a model. The description call yields nothing, so
/// classification relies on the question alone, and the answer call echoes
/// the filtered rows.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineLlm;

#[async_trait]
impl LlmClient for OfflineLlm {
    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
        let Some(start) = prompt.find(DATA_FENCE) else {
            return Ok(String::new());
        };
        let data = &prompt[start + DATA_FENCE.len()..];
        let data = data.split("\n---").next().unwrap_or_default().trim_matches('\n');
        Ok(format!("Here is what the sheet shows:\n{data}"))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;
    use tablechat_core::config::{LlmConfig, LlmProvider};

    use super::{completion_text, HttpLlmClient, LlmClient, OfflineLlm};
    use crate::prompts::{final_answer_prompt, text_to_query_prompt};

    #[tokio::test]
    async fn offline_description_is_empty() {
        let prompt = text_to_query_prompt("Sheet Name: Employees", "Who are the engineers?")
            .expect("prompt should render");
        let description = OfflineLlm.complete(&prompt, 0.0).await.expect("offline never fails");
        assert!(description.is_empty());
    }

    #[tokio::test]
    async fn offline_answer_echoes_data() {
        let prompt = final_answer_prompt("Who are the engineers?", "Id\tName\n1\tAlice\n")
            .expect("prompt should render");
        let answer = OfflineLlm.complete(&prompt, 0.2).await.expect("offline never fails");
        assert_eq!(answer, "Here is what the sheet shows:\nId\tName\n1\tAlice");
    }

    #[test]
    fn extracts_completion_text_per_provider() {
        let openai = json!({ "choices": [{ "message": { "content": "filter by dept" } }] });
        let anthropic = json!({ "content": [{ "type": "text", "text": "rows over 90k" }] });
        let ollama = json!({ "response": "all employees", "done": true });
        let gemini = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "rows in sales" }] },
                "finishReason": "STOP"
            }]
        });

        assert_eq!(
            completion_text(LlmProvider::OpenAi, &openai).as_deref(),
            Some("filter by dept")
        );
        assert_eq!(
            completion_text(LlmProvider::Anthropic, &anthropic).as_deref(),
            Some("rows over 90k")
        );
        assert_eq!(completion_text(LlmProvider::Ollama, &ollama).as_deref(), Some("all employees"));
        assert_eq!(completion_text(LlmProvider::Gemini, &gemini).as_deref(), Some("rows in sales"));
        assert_eq!(completion_text(LlmProvider::OpenAi, &json!({})), None);
        assert_eq!(completion_text(LlmProvider::Gemini, &json!({ "candidates": [] })), None);
    }

    #[test]
    fn gemini_request_targets_generate_content_with_key_and_temperature() {
        let config = LlmConfig {
            provider: LlmProvider::Gemini,
            api_key: Some(SecretString::from("test-key".to_string())),
            base_url: Some("http://localhost:9999/".to_string()),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 5,
            max_retries: 0,
        };
        let client = HttpLlmClient::from_config(&config).expect("client should build");
        let request =
            client.request("Who are the engineers?", 0.2).build().expect("request should build");

        assert_eq!(
            request.url().as_str(),
            "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent?key=test-key"
        );
        let body: serde_json::Value = request
            .body()
            .and_then(|body| body.as_bytes())
            .map(|bytes| serde_json::from_slice(bytes).expect("json body"))
            .expect("request should carry a body");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Who are the engineers?");
        let temperature = body["generationConfig"]["temperature"].as_f64().expect("temperature");
        assert!((temperature - 0.2).abs() < 1e-6);
    }
}
