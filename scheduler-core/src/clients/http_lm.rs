use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::errors::LmError;

use super::LmClient;

/// Thin reference implementation of [`LmClient`] against an
/// OpenAI-compatible chat-completions endpoint, in the style of the
/// provider adapters in the sibling `pierre_mcp_server` example
/// (`src/llm/openai_compatible.rs`) — a single POST, a timeout, and a
/// plain-text extraction, with no retry/fallback logic (that lives in
/// the LM Content Generator, C7).
pub struct HttpLmClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpLmClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client,
        }
    }
}

#[async_trait]
impl LmClient for HttpLmClient {
    async fn generate(&self, prompt: &str, model: &str, deadline: Duration) -> Result<String, LmError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&json!({
                "model": model,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .timeout(deadline);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::time::timeout(deadline, request.send())
            .await
            .map_err(|_| LmError::Timeout {
                model: model.to_string(),
                timeout_secs: deadline.as_secs(),
            })?
            .map_err(|e| {
                if e.is_timeout() {
                    LmError::Timeout {
                        model: model.to_string(),
                        timeout_secs: deadline.as_secs(),
                    }
                } else {
                    LmError::Network {
                        model: model.to_string(),
                        source: e,
                    }
                }
            })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LmError::Quota {
                model: model.to_string(),
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|e| LmError::Network {
            model: model.to_string(),
            source: e,
        })?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LmError::NonParseable {
                model: model.to_string(),
            })
    }
}
