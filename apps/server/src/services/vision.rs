// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vision model client for OpenAI-compatible chat-completion APIs.
//!
//! One synchronous call per analyze request. A failed call is terminal for
//! that request: there are no retries.

use crate::config::ModelConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use cotizador_core::SYSTEM_PROMPT;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Vision model errors. The status and body of a rejected call are kept
/// for diagnostics.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Model API key not configured (OPENAI_API_KEY)")]
    NotConfigured,

    #[error("Model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Model API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model response parse failed: {0}")]
    InvalidResponse(String),
}

/// Image bytes plus the media type used for the inline data URL.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Bytes,
    pub media_type: String,
}

impl ImagePayload {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, STANDARD.encode(&self.bytes))
    }
}

/// A model that answers a text prompt about one image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Returns the raw assistant text.
    async fn complete(&self, prompt: &str, image: &ImagePayload) -> Result<String, VisionError>;
}

/// Chat-completions client.
pub struct OpenAiVisionClient {
    config: ModelConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiVisionClient {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            config: config.clone(),
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base)
    }

    /// Request body: system instruction, then the prompt and image as one
    /// user message.
    fn build_request(&self, prompt: &str, image: &ImagePayload) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt },
                        { "type": "image_url", "image_url": { "url": image.data_url() } }
                    ]
                }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        })
    }
}

/// Only `choices[0].message.content` is used; a missing content is empty text.
fn first_choice_content(body: &str) -> Result<String, VisionError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| VisionError::InvalidResponse(e.to_string()))?;
    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default())
}

#[async_trait]
impl VisionModel for OpenAiVisionClient {
    async fn complete(&self, prompt: &str, image: &ImagePayload) -> Result<String, VisionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(VisionError::NotConfigured)?;

        let payload = self.build_request(prompt, image);
        tracing::debug!(
            model = %self.config.model,
            image_bytes = image.bytes.len(),
            "Calling vision model"
        );

        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %body, "Vision model rejected request");
            return Err(VisionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        first_choice_content(&body)
    }
}
