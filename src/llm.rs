//! Generative model access.
//!
//! The chat pipeline only needs `generate(prompt) -> text`, expressed as the
//! [`TextGenerator`] trait. [`GeminiClient`] implements it over the
//! `generateContent` REST endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{ExplorerError, Result};

/// Header carrying the API key; keeps the key out of request URLs
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Single-shot text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Gemini API client
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Create a client for `model` at `base_url`
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    /// Build a client from configuration; `None` when no API key is set
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        match config.api_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => Self::new(
                &config.base_url,
                &config.model,
                key,
                Duration::from_secs(config.timeout_secs),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, model = %self.model, "Model request failed");
            return Err(ExplorerError::Generation(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = first_candidate_text(parsed)
            .ok_or_else(|| ExplorerError::Generation("la respuesta del modelo no contiene texto".into()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis(),
            chars = text.len(),
            "Model call completed"
        );
        Ok(text)
    }
}

/// Joined text parts of the first candidate, if any text is present
fn first_candidate_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|part| part.text).collect();
    (!text.trim().is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_parts_of_first_candidate() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"SELECT "},{"text":"1"}]}},{"content":{"parts":[{"text":"x"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_candidate_text(response).as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn empty_candidates_yield_nothing() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(first_candidate_text(response).is_none());
        let response: GenerateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(first_candidate_text(response).is_none());
    }

    #[test]
    fn unconfigured_without_key() {
        let config = crate::config::AppConfig::default().llm;
        assert!(GeminiClient::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn transport_errors_do_not_carry_the_key() {
        let client = GeminiClient::new("http://127.0.0.1:9", "m", "SECRET_KEY_123", Duration::from_secs(2)).unwrap();
        let err = client.generate("hola").await.unwrap_err();
        assert!(matches!(err, ExplorerError::Generation(_)));
        assert!(!err.to_string().contains("SECRET_KEY_123"), "{err}");
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new("https://example.test/v1beta/", "gemini-1.5-flash", "k", Duration::from_secs(5))
            .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
