//! Chat completions for OpenAI and OpenAI-compatible APIs (DeepSeek).

use super::{classify_openai_error, require_credential};
use crate::config::ProviderConfig;
use crate::error::{MuseError, Result};
use crate::gateway::{
    GenerationOptions, GenerationRequest, GenerationResult, Output, Provider, ProviderId,
};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

const DEFAULT_MAX_TOKENS: u32 = 2000;

pub struct ChatProvider {
    id: ProviderId,
    model: String,
    client: Client<OpenAIConfig>,
}

impl ChatProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let credential = require_credential(config)?;
        let client = create_client(credential, config.base_url.as_ref(), config.timeout)?;

        Ok(Self {
            id: config.provider,
            model: config.model.clone(),
            client,
        })
    }

    fn build_request(&self, prompt: &str, options: &GenerationOptions) -> Result<CreateChatCompletionRequest> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);

        if let Some(system) = options.system.as_deref() {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| classify_openai_error(self.id, e))?
                    .into(),
            );
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| classify_openai_error(self.id, e))?
                .into(),
        );

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages);
        #[allow(deprecated)]
        builder.max_tokens(options.effective_max_tokens(DEFAULT_MAX_TOKENS));
        if let Some(t) = options.temperature {
            builder.temperature(t);
        }

        builder.build().map_err(|e| classify_openai_error(self.id, e))
    }
}

#[async_trait]
impl Provider for ChatProvider {
    fn id(&self) -> ProviderId {
        self.id
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

        let chat_request = self.build_request(prompt, options)?;
        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| classify_openai_error(self.id, e))?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MuseError::provider(self.id, "empty response from model"))?;

        Ok(GenerationResult::new(request, self.id, &self.model, Output::Text(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::error::ErrorKind;
    use crate::gateway::testing::{closed_port_url, serve_stub};
    use crate::gateway::Length;
    use axum::http::StatusCode;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn provider_at(url: url::Url) -> ChatProvider {
        let config = ProviderConfig::new(ProviderId::DeepSeek, "deepseek-chat")
            .with_credential(Credential::new("ds-test"))
            .with_base_url(url)
            .with_timeout(Duration::from_secs(5));
        ChatProvider::new(&config).unwrap()
    }

    async fn call(provider: &ChatProvider) -> Result<GenerationResult> {
        provider
            .generate(&GenerationRequest::text("tide pools"), &GenerationOptions::default())
            .await
    }

    fn provider() -> ChatProvider {
        let config = ProviderConfig::new(ProviderId::DeepSeek, "deepseek-chat")
            .with_credential(Credential::new("ds-test"));
        ChatProvider::new(&config).unwrap()
    }

    #[test]
    #[allow(deprecated)]
    fn test_build_request_with_system_and_length() {
        let options = GenerationOptions::default()
            .with_system("be brief")
            .with_length(Length::Short)
            .with_temperature(0.3);
        let req = provider().build_request("hello", &options).unwrap();

        assert_eq!(req.model, "deepseek-chat");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.max_tokens, Some(1000));
        assert_eq!(req.temperature, Some(0.3));
    }

    #[test]
    #[allow(deprecated)]
    fn test_build_request_defaults() {
        let req = provider()
            .build_request("hello", &GenerationOptions::default())
            .unwrap();
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.max_tokens, Some(DEFAULT_MAX_TOKENS));
        assert_eq!(req.temperature, None);
    }

    #[tokio::test]
    async fn test_generate_over_http() {
        let router = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                let prompt = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
                Json(json!({
                    "id": "chatcmpl-1",
                    "object": "chat.completion",
                    "created": 1700000000,
                    "model": "deepseek-chat",
                    "choices": [{
                        "index": 0,
                        "message": { "role": "assistant", "content": format!(" about {} ", prompt) },
                        "finish_reason": "stop"
                    }]
                }))
            }),
        );
        let provider = provider_at(serve_stub(router).await);

        let result = call(&provider).await.unwrap();

        assert_eq!(result.text(), Some("about tide pools"));
        assert_eq!(result.metadata.provider, ProviderId::DeepSeek);
        assert_eq!(result.metadata.model, "deepseek-chat");
    }

    #[tokio::test]
    async fn test_api_error_is_provider_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": {
                        "message": "Model Not Exist",
                        "type": "invalid_request_error",
                        "param": null,
                        "code": "invalid_request_error"
                    } })),
                )
            }),
        );
        let provider = provider_at(serve_stub(router).await);

        let err = call(&provider).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ProviderError);
        assert!(err.to_string().contains("Model Not Exist"), "{err}");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        let provider = provider_at(closed_port_url().await);

        let err = call(&provider).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    }
}
