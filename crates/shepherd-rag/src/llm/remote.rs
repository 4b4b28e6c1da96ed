//! Remote chat backend: OpenAI-compatible chat completions over HTTPS with a
//! bounded per-request timeout and a small retry budget on transient failures
//! (network errors, 429/5xx). Exhausted retries surface as the empty-string
//! sentinel, never as an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::config::RemoteConfig;

use super::{GenerationBackend, PERSONA_SYSTEM_PROMPT};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP_MS: u64 = 4_000;

pub struct RemoteChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl RemoteChatClient {
    pub fn new(config: &RemoteConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// One chat completion with bounded retry. Returns the assistant text or
    /// an empty string once the retry budget is spent.
    pub async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: usize,
    ) -> String {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "max_tokens": max_tokens,
            "temperature": self.temperature,
            "stream": false,
        });

        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_once(&body).await {
                Ok(text) => return text,
                Err(RemoteError::Retryable(reason)) => {
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = MAX_ATTEMPTS,
                        reason = %reason,
                        "Remote generation attempt failed"
                    );
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff_delay(attempt)).await;
                    }
                }
                Err(RemoteError::Fatal(reason)) => {
                    tracing::warn!(reason = %reason, "Remote generation failed permanently");
                    return String::new();
                }
            }
        }

        tracing::warn!(attempts = MAX_ATTEMPTS, "Remote generation retries exhausted");
        String::new()
    }

    async fn try_once(&self, body: &Value) -> Result<String, RemoteError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Retryable(format!("transport: {e}")))?;

        let status = response.status();
        if is_retryable_status(status) {
            return Err(RemoteError::Retryable(format!("status: {status}")));
        }
        if !status.is_success() {
            return Err(RemoteError::Fatal(format!("status: {status}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Fatal(format!("body: {e}")))?;

        extract_content(&payload)
            .ok_or_else(|| RemoteError::Fatal("malformed completion payload".to_string()))
    }
}

#[async_trait]
impl GenerationBackend for RemoteChatClient {
    async fn generate(&self, prompt: &str, max_tokens: usize) -> String {
        self.chat(PERSONA_SYSTEM_PROMPT, prompt, max_tokens).await
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

enum RemoteError {
    /// Transient: network failure or a 429/5xx status class.
    Retryable(String),
    /// Anything else; retrying would not help.
    Fatal(String),
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

fn backoff_delay(attempt: u32) -> Duration {
    let ms = BACKOFF_BASE_MS.saturating_mul(1 << (attempt - 1)).min(BACKOFF_CAP_MS);
    Duration::from_millis(ms)
}

/// Pull the assistant text out of an OpenAI-style completion payload.
fn extract_content(payload: &Value) -> Option<String> {
    payload
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.trim().to_string())
}
