//! Concrete providers and the factory that selects them from configuration.

mod anthropic;
mod chat;
mod ffmpeg;
mod image;
mod whisper;

pub use anthropic::AnthropicProvider;
pub use chat::ChatProvider;
pub use ffmpeg::FfmpegRenderer;
pub use image::ImageProvider;
pub use whisper::WhisperProvider;

use super::{Provider, ProviderFactory, ProviderId, TaskKind};
use crate::config::{Credential, ProviderConfig};
use crate::error::{MuseError, Result};
use async_openai::error::OpenAIError;

/// Builds the real provider for a task kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFactory;

impl ProviderFactory for DefaultFactory {
    fn build(&self, kind: TaskKind, config: &ProviderConfig) -> Result<Box<dyn Provider>> {
        let provider: Box<dyn Provider> = match (config.provider, kind) {
            (ProviderId::OpenAi | ProviderId::DeepSeek, TaskKind::Text) => {
                Box::new(ChatProvider::new(config)?)
            }
            (ProviderId::Anthropic, TaskKind::Text) => Box::new(AnthropicProvider::new(config)?),
            (ProviderId::OpenAi, TaskKind::Transcription) => Box::new(WhisperProvider::new(config)?),
            (ProviderId::OpenAi, TaskKind::Image) => Box::new(ImageProvider::new(config)?),
            (ProviderId::Ffmpeg, TaskKind::Video) => Box::new(FfmpegRenderer::new(config)),
            (provider, kind) => {
                return Err(MuseError::Config(format!(
                    "provider '{}' cannot serve {} requests",
                    provider, kind
                )))
            }
        };
        Ok(provider)
    }
}

fn require_credential(config: &ProviderConfig) -> Result<&Credential> {
    config.credential.as_ref().ok_or_else(|| {
        MuseError::unavailable(
            config.provider,
            format!(
                "{} is not set",
                config.provider.credential_env().unwrap_or("credential")
            ),
        )
    })
}

/// Map an async-openai error onto the gateway error kinds.
fn classify_openai_error(provider: ProviderId, error: OpenAIError) -> MuseError {
    match error {
        OpenAIError::ApiError(api) => MuseError::provider(provider, api.message),
        OpenAIError::Reqwest(e) => classify_http_error(provider, e),
        OpenAIError::InvalidArgument(msg) => MuseError::InvalidRequest(msg),
        other => MuseError::provider(provider, other.to_string()),
    }
}

fn classify_http_error(provider: ProviderId, error: reqwest::Error) -> MuseError {
    if error.is_connect() {
        MuseError::unavailable(provider, format!("unreachable: {}", error))
    } else if error.is_timeout() {
        MuseError::provider(provider, format!("request timed out: {}", error))
    } else {
        MuseError::provider(provider, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_factory_rejects_unsupported_pairs() {
        let config = ProviderConfig::new(ProviderId::DeepSeek, "deepseek-chat");
        let err = DefaultFactory.build(TaskKind::Image, &config).err().unwrap();
        assert!(matches!(err, MuseError::Config(_)));
    }

    #[test]
    fn test_factory_builds_ffmpeg_without_credential() {
        let config = ProviderConfig::new(ProviderId::Ffmpeg, "libx264");
        let provider = DefaultFactory.build(TaskKind::Video, &config).unwrap();
        assert_eq!(provider.id(), ProviderId::Ffmpeg);
        assert_eq!(provider.model(), "libx264");
    }

    #[test]
    fn test_factory_needs_credential_for_hosted() {
        let config = ProviderConfig::new(ProviderId::OpenAi, "gpt-4o");
        let err = DefaultFactory.build(TaskKind::Text, &config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);

        let config = config.with_credential(Credential::new("sk-test"));
        let provider = DefaultFactory.build(TaskKind::Text, &config).unwrap();
        assert_eq!(provider.id(), ProviderId::OpenAi);
    }

    #[test]
    fn test_classify_openai_errors() {
        let err = classify_openai_error(
            ProviderId::OpenAi,
            OpenAIError::InvalidArgument("bad size".into()),
        );
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let err = classify_openai_error(
            ProviderId::DeepSeek,
            OpenAIError::StreamError("closed".into()),
        );
        assert_eq!(err.kind(), ErrorKind::ProviderError);
    }
}
