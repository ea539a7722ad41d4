//! Anthropic messages API over reqwest.

use super::{classify_http_error, require_credential};
use crate::config::ProviderConfig;
use crate::error::{MuseError, Result};
use crate::gateway::{
    GenerationOptions, GenerationRequest, GenerationResult, Output, Provider, ProviderId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct AnthropicProvider {
    model: String,
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let credential = require_credential(config)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MuseError::Config(format!("failed to create HTTP client: {}", e)))?;

        let endpoint = config
            .base_url
            .as_ref()
            .map(|u| u.as_str().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        Ok(Self {
            model: config.model.clone(),
            api_key: credential.expose().to_string(),
            endpoint,
            client,
        })
    }

    fn body<'a>(&'a self, prompt: &'a str, options: &'a GenerationOptions) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: options.effective_max_tokens(DEFAULT_MAX_TOKENS),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            system: options.system.as_deref(),
            temperature: options.temperature.map(|t| t.min(1.0)),
        }
    }
}

/// Concatenate the text blocks of a response.
fn collect_text(response: MessagesResponse) -> String {
    response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text)
        .collect::<Vec<_>>()
        .join("")
}

/// Prefer the API's own error message over the raw body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!("HTTP {}: {}", status.as_u16(), envelope.error.message),
        Err(_) => format!("HTTP {}: {}", status.as_u16(), body.trim()),
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
    ) -> Result<GenerationResult> {
        let prompt = request
            .prompt()
            .ok_or_else(|| MuseError::InvalidRequest("text generation needs a prompt".to_string()))?;

        let url = format!("{}/v1/messages", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.body(prompt, options))
            .send()
            .await
            .map_err(|e| classify_http_error(ProviderId::Anthropic, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MuseError::provider(
                ProviderId::Anthropic,
                error_message(status, &body),
            ));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            MuseError::provider(ProviderId::Anthropic, format!("unreadable response: {}", e))
        })?;

        let text = collect_text(parsed);
        if text.trim().is_empty() {
            return Err(MuseError::provider(
                ProviderId::Anthropic,
                "empty response from model",
            ));
        }

        Ok(GenerationResult::new(
            request,
            ProviderId::Anthropic,
            &self.model,
            Output::Text(text.trim().to_string()),
        ))
    }
}
