//! Chat-completion client shared by the guard classifier and the answer
//! generator.
//!
//! [`ChatModel`] is the seam for test doubles. The HTTP implementation talks
//! to an OpenAI-compatible `/chat/completions` endpoint with a system+user
//! message pair and applies the same bounded retry/backoff discipline as the
//! embedding client: 429 and 5xx retry, other 4xx fail immediately.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ApiConfig;
use crate::error::{Error, Result};

/// A remote chat-completion model. Pure request/response; callers pick the
/// model id per call so one client serves both guard and generation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String>;
}

pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl OpenAiChat {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::InvalidConfig("OPENAI_API_KEY not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| Error::GenerationUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries: api.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let mut last_err = Error::GenerationUnavailable("no attempt made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(3));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| Error::GenerationUnavailable(e.to_string()))?;
                        return parse_completion(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 {
                        last_err = Error::RateLimited(body_text);
                        continue;
                    }
                    if status.is_server_error() {
                        last_err =
                            Error::GenerationUnavailable(format!("{}: {}", status, body_text));
                        continue;
                    }

                    return Err(Error::GenerationUnavailable(format!(
                        "{}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Error::GenerationUnavailable(e.to_string());
                    continue;
                }
            }
        }

        Err(last_err)
    }
}

fn parse_completion(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            Error::GenerationUnavailable("no completion content in response".to_string())
        })
}
