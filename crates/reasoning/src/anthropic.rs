//! Anthropic native reasoning backend.
//!
//! Uses the Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System instructions as a top-level field
//!
//! One instance is bound to one model; the engine holds separate handles
//! for fast routing calls and deeper advisor-facing synthesis.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use wealthdesk_core::error::ReasoningError;
use wealthdesk_core::reasoning::Reasoning;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Anthropic Messages API reasoning backend.
pub struct AnthropicReasoning {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl AnthropicReasoning {
    /// Create a backend bound to the given model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            client,
        }
    }

    /// Use a custom base URL (testing, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [ApiMessage<'a>; 1],
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Reasoning for AnthropicReasoning {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        instructions: &str,
        payload: &str,
    ) -> Result<String, ReasoningError> {
        if self.api_key.is_empty() {
            return Err(ReasoningError::NotConfigured(
                "No API key set for the anthropic backend".into(),
            ));
        }

        let url = format!("{}/v1/messages", self.base_url);
        let body = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: instructions,
            messages: [ApiMessage {
                role: "user",
                content: payload,
            }],
        };

        debug!(model = %self.model, payload_len = payload.len(), "Reasoning call");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReasoningError::Timeout(e.to_string())
                } else {
                    ReasoningError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, "Reasoning call rejected");
            return Err(ReasoningError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::Malformed(format!("Response decode: {e}")))?;

        // Concatenate text blocks; skip thinking/tool blocks if present.
        let text: Vec<&str> = parsed
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(ReasoningError::Malformed("Response had no text blocks".into()));
        }

        Ok(text.join("\n"))
    }
}
