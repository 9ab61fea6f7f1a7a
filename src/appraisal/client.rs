//! Vision provider seam and the Gemini implementation.
//!
//! The dispatcher only sees [`VisionProvider`]; errors are returned as
//! plain `anyhow` errors and classified later by their text.

use crate::models::ImageHandle;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One appraisal call: a prompt, its images, and the credential to use.
#[derive(Debug, Clone, Copy)]
pub struct AppraisalRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub prompt: &'a str,
    pub images: &'a [ImageHandle],
}

/// A vision-capable language model.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Returns the model's free-form text.
    async fn appraise(&self, request: AppraisalRequest<'_>) -> Result<String>;
}

/// Settings for the Gemini REST client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.3,
            max_output_tokens: 4000,
            timeout_seconds: 300,
        }
    }
}

/// `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

/// `generateContent` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "empty response".to_string());
            return Err(anyhow::anyhow!("Gemini returned no text: {}", reason));
        }

        Ok(text)
    }
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            model
        )
    }

    fn build_request(&self, prompt: &str, images: &[ImageHandle]) -> GenerateContentRequest {
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part {
            text: Some(prompt.to_string()),
            inline_data: None,
        });
        parts.extend(images.iter().map(|image| Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.data),
            }),
        }));

        GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl VisionProvider for GeminiClient {
    async fn appraise(&self, request: AppraisalRequest<'_>) -> Result<String> {
        let url = self.endpoint(request.model);
        let body = self.build_request(request.prompt, request.images);

        debug!(
            "Sending {} images to {} ({} prompt chars)",
            request.images.len(),
            request.model,
            request.prompt.len()
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to Gemini API at {}", self.config.api_url)
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Gemini API error {}: {}", status, body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        parsed.into_text()
    }
}
