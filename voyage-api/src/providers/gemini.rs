use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use voyage_core::{Prompt, ProviderError, TextGenerator};
use voyage_store::app_config::ProvidersConfig;

const SERVICE: &str = "Gemini";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Single-turn text generation against the Gemini `generateContent` API
pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiGenerator {
    pub fn new(client: Client, config: &ProvidersConfig, timeout: Duration) -> Self {
        Self {
            client,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_key.clone(),
            timeout,
        }
    }

    fn request_body(prompt: &Prompt) -> GenerateRequest {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: prompt.role.clone() }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: format!("{}\n\n{}", prompt.instructions, prompt.context) }],
            }],
            generation_config: GenerationConfig {
                // Roughly four characters per token
                max_output_tokens: (prompt.max_output_chars / 4).max(64),
                temperature: 0.7,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::Unavailable("Gemini key not configured".to_string()));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(prompt))
            .send()
            .await
            .map_err(|e| super::transport_error(SERVICE, e, self.timeout))?;

        let body: GenerateResponse = super::check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", SERVICE, e)))?;

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse(format!("{}: no candidates", SERVICE)))?;

        let text: String = candidate.content.parts.into_iter().map(|p| p.text).collect();
        debug!("Gemini returned {} chars (finish reason {:?})", text.len(), candidate.finish_reason);
        Ok(text)
    }
}
