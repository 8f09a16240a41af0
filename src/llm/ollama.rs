//! Ollama text-generation client.
//!
//! The one retry policy in the whole search path lives here: when generation
//! reports a missing model (404), the model is pulled and the generation is
//! retried exactly once. Every other failure is surfaced to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OllamaConfig;

/// Generation-service failure modes callers need to tell apart.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("cannot reach generation service: {0}")]
    Connection(String),
    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model '{0}' is missing and could not be pulled")]
    MissingModel(String),
    #[error("generation service returned an empty response")]
    EmptyResponse,
    #[error("malformed generation response: {0}")]
    Malformed(String),
}

/// Prompt in, text out. Implemented by [`OllamaClient`]; test doubles stand
/// in for it where no service is running.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    config: OllamaConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

impl OllamaClient {
    pub fn new(client: reqwest::Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    fn pull_url(&self) -> String {
        format!("{}/api/pull", self.config.base_url.trim_end_matches('/'))
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Pull a model so it is available for generation. `None` pulls the
    /// configured model.
    pub async fn pull(&self, model: Option<&str>) -> Result<(), GenerateError> {
        let name = model.unwrap_or(&self.config.model);
        let req = PullRequest { name, stream: false };

        let resp = self
            .client
            .post(self.pull_url())
            .json(&req)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| GenerateError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn generate_once(&self, prompt: &str) -> Result<reqwest::Response, GenerateError> {
        let req = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            temperature: 0.4,
        };

        self.client
            .post(self.generate_url())
            .json(&req)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| GenerateError::Connection(e.to_string()))
    }

    async fn read_text(resp: reqwest::Response) -> Result<String, GenerateError> {
        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| GenerateError::Malformed(e.to_string()))?;
        let text = body.response.trim().to_string();
        if text.is_empty() {
            return Err(GenerateError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let resp = self.generate_once(prompt).await?;
        let status = resp.status();

        if status.is_success() {
            return Self::read_text(resp).await;
        }

        // 404 means the model is not present locally: pull it and retry once.
        if status.as_u16() == 404 {
            tracing::info!("Model {} not found, attempting to pull", self.config.model);
            if self.pull(None).await.is_err() {
                return Err(GenerateError::MissingModel(self.config.model.clone()));
            }
            let retry = self.generate_once(prompt).await?;
            let retry_status = retry.status();
            if retry_status.is_success() {
                return Self::read_text(retry).await;
            }
            let body = retry.text().await.unwrap_or_default();
            return Err(GenerateError::Status {
                status: retry_status.as_u16(),
                body,
            });
        }

        let body = resp.text().await.unwrap_or_default();
        Err(GenerateError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
