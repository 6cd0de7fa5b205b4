//! Generative service client.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::GenerationError;
use crate::storage::config::GeneratorSettings;

/// Anything that turns a prompt into free-form text.
pub trait ChallengeGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the generative service.
pub struct GenerativeClient {
    /// HTTP client
    http: reqwest::Client,
    /// Endpoint URL
    api_url: String,
    /// Model name
    model: String,
    /// API key for authentication
    api_key: Option<String>,
    /// Per-request timeout
    timeout: Duration,
}

impl GenerativeClient {
    /// Create a client from settings. The API key is read from the
    /// configured environment variable.
    pub fn new(settings: &GeneratorSettings) -> Result<Self, GenerationError> {
        Self::with_api_key(settings, settings.api_key())
    }

    pub fn with_api_key(
        settings: &GeneratorSettings,
        api_key: Option<String>,
    ) -> Result<Self, GenerationError> {
        if settings.api_url.trim().is_empty() {
            return Err(GenerationError::Config("generator api_url is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| GenerationError::Config(e.to_string()))?;

        Ok(Self {
            http,
            api_url: settings.api_url.clone(),
            model: settings.model.clone(),
            api_key,
            timeout: settings.timeout(),
        })
    }
}

impl ChallengeGenerator for GenerativeClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
        };

        let mut request = self.http.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout.as_secs())
            } else if e.is_connect() {
                GenerationError::Offline
            } else {
                GenerationError::Api(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GenerationError::Api("rate limited".to_string()));
        }
        if !status.is_success() {
            return Err(GenerationError::Api(format!("API returned status {}", status)));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        if let Some(error) = payload.error {
            return Err(GenerationError::Api(error));
        }
        payload
            .text
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::Malformed("empty response text".to_string()))
    }
}
