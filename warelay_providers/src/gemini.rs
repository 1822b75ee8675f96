use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use warelay_core::{ChatMessage, CompletionError, CompletionProvider};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Sampling parameters forwarded to the completion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_k: 20,
            top_p: 0.7,
            max_output_tokens: 150,
        }
    }
}

/// Client for the Gemini `generateContent` endpoint, bound to one credential.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    generation: GenerationConfig,
}

impl GeminiProvider {
    #[must_use]
    pub fn new(api_key: String, model: String, generation: GenerationConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            generation,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn request_body(&self, history: &[ChatMessage]) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = history
            .iter()
            .map(|m| {
                json!({
                    "role": m.role.as_str(),
                    "parts": [{ "text": m.text }],
                })
            })
            .collect();

        json!({
            "contents": contents,
            "generationConfig": self.generation,
        })
    }
}

/// Map an HTTP status to the retry taxonomy: rate limits and server-side
/// unavailability are transient, everything else is permanent.
fn classify_status(status: StatusCode, body: &str) -> CompletionError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        CompletionError::Transient(format!("HTTP {status}"))
    } else {
        let detail: String = body.chars().take(200).collect();
        CompletionError::Permanent(anyhow!("completion API returned {status}: {detail}"))
    }
}

fn classify_request_error(err: reqwest::Error) -> CompletionError {
    if err.is_connect() || err.is_timeout() {
        CompletionError::Transient(err.to_string())
    } else {
        CompletionError::Permanent(err.into())
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn generate(&self, history: &[ChatMessage]) -> Result<String, CompletionError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        debug!(
            "Requesting completion: model={}, history_len={}",
            self.model,
            history.len()
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(history))
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Permanent(anyhow!("invalid response body: {e}")))?;

        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                CompletionError::Permanent(anyhow!("invalid response format: missing text"))
            })?;

        Ok(text.to_string())
    }
}
