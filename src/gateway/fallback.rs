//! Explicit provider fallback.
//!
//! The gateway never switches providers on its own. A caller that wants to try
//! alternates passes a [`FallbackPolicy`] to [`generate_with_fallback`] and gets
//! back every failed attempt along with the result.

use super::{Gateway, GenerationRequest, GenerationResult, ProviderId, TaskKind};
use crate::config::{Credentials, ProviderConfig, Settings};
use crate::error::{MuseError, Result};

/// Alternate providers for one task kind, tried in order.
#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    alternates: Vec<ProviderConfig>,
}

impl FallbackPolicy {
    /// No fallback: exactly one gateway call.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(alternates: Vec<ProviderConfig>) -> Self {
        Self { alternates }
    }

    /// The `text.fallback` chain, without the primary provider and without repeats.
    pub fn for_text(settings: &Settings, credentials: &Credentials, primary: ProviderId) -> Result<Self> {
        let mut seen = vec![primary];
        let mut alternates = Vec::new();
        for provider in &settings.text.fallback {
            if seen.contains(provider) {
                continue;
            }
            seen.push(*provider);
            alternates.push(ProviderConfig::resolve(
                settings,
                credentials,
                *provider,
                TaskKind::Text,
            )?);
        }
        Ok(Self { alternates })
    }

    pub fn alternates(&self) -> &[ProviderConfig] {
        &self.alternates
    }

    pub fn is_empty(&self) -> bool {
        self.alternates.is_empty()
    }
}

/// A provider that was tried and failed.
#[derive(Debug)]
pub struct Attempt {
    pub provider: ProviderId,
    pub error: MuseError,
}

/// A successful result and the failures that preceded it.
#[derive(Debug)]
pub struct FallbackOutcome {
    pub result: GenerationResult,
    pub failed: Vec<Attempt>,
}

/// Try the configured provider, then each alternate.
///
/// Only `ProviderUnavailable` and `ProviderError` move on to the next provider;
/// any other error is returned at once. When every provider fails, the last
/// error is returned.
pub async fn generate_with_fallback(
    gateway: &Gateway,
    request: &GenerationRequest,
    policy: &FallbackPolicy,
) -> Result<FallbackOutcome> {
    let kind = request.kind();
    let mut failed = Vec::new();

    let primary = gateway.config().for_kind(kind).provider;
    let mut last = match gateway.generate(request).await {
        Ok(result) => return Ok(FallbackOutcome { result, failed }),
        Err(e) if !e.allows_fallback() => return Err(e),
        Err(e) => e,
    };

    for alternate in policy.alternates() {
        failed.push(Attempt {
            provider: primary_of(&last).unwrap_or(primary),
            error: last,
        });

        let next = gateway.with_provider(kind, alternate.clone())?;
        last = match next.generate(request).await {
            Ok(result) => return Ok(FallbackOutcome { result, failed }),
            Err(e) if !e.allows_fallback() => return Err(e),
            Err(e) => e,
        };
    }

    Err(last)
}

fn primary_of(error: &MuseError) -> Option<ProviderId> {
    match error {
        MuseError::ProviderUnavailable { provider, .. } | MuseError::ProviderError { provider, .. } => {
            Some(*provider)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::error::ErrorKind;
    use crate::gateway::testing::{fake_config, FakeFactory, Reply};
    use std::sync::Arc;

    fn openai() -> ProviderConfig {
        ProviderConfig::new(ProviderId::OpenAi, "gpt-4o").with_credential(Credential::new("sk-test"))
    }

    fn anthropic() -> ProviderConfig {
        ProviderConfig::new(ProviderId::Anthropic, "claude").with_credential(Credential::new("ant"))
    }

    #[tokio::test]
    async fn test_empty_policy_is_single_call() {
        let factory = Arc::new(
            FakeFactory::new().reply(ProviderId::DeepSeek, Reply::ProviderError("503".into())),
        );
        let gateway = Gateway::with_factory(fake_config(), factory.clone());

        let err = generate_with_fallback(&gateway, &GenerationRequest::text("x"), &FallbackPolicy::none())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ProviderError);
        assert_eq!(factory.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_and_reports_attempts() {
        let factory = Arc::new(
            FakeFactory::new()
                .reply(ProviderId::DeepSeek, Reply::ProviderError("HTTP 500".into()))
                .reply(ProviderId::OpenAi, Reply::Unavailable("unreachable".into()))
                .reply(ProviderId::Anthropic, Reply::text("from claude")),
        );
        let gateway = Gateway::with_factory(fake_config(), factory.clone());
        let policy = FallbackPolicy::new(vec![openai(), anthropic()]);

        let outcome = generate_with_fallback(&gateway, &GenerationRequest::text("x"), &policy)
            .await
            .unwrap();

        assert_eq!(outcome.result.metadata.provider, ProviderId::Anthropic);
        assert_eq!(outcome.result.text(), Some("from claude"));
        let tried: Vec<_> = outcome.failed.iter().map(|a| a.provider).collect();
        assert_eq!(tried, vec![ProviderId::DeepSeek, ProviderId::OpenAi]);
        assert_eq!(outcome.failed[1].error.kind(), ErrorKind::ProviderUnavailable);
    }

    #[tokio::test]
    async fn test_invalid_request_does_not_fall_back() {
        let factory = Arc::new(FakeFactory::new());
        let gateway = Gateway::with_factory(fake_config(), factory.clone());
        let policy = FallbackPolicy::new(vec![openai()]);

        let err = generate_with_fallback(&gateway, &GenerationRequest::text("  "), &policy)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(factory.builds(), 0);
    }

    #[tokio::test]
    async fn test_all_failures_return_last_error() {
        let factory = Arc::new(
            FakeFactory::new()
                .reply(ProviderId::DeepSeek, Reply::ProviderError("first".into()))
                .reply(ProviderId::OpenAi, Reply::ProviderError("second".into())),
        );
        let gateway = Gateway::with_factory(fake_config(), factory);

        let err = generate_with_fallback(
            &gateway,
            &GenerationRequest::text("x"),
            &FallbackPolicy::new(vec![openai()]),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("second"));
    }

    #[test]
    fn test_policy_from_settings_skips_primary_and_repeats() {
        let mut settings = Settings::default();
        settings.text.fallback = vec![
            ProviderId::DeepSeek,
            ProviderId::OpenAi,
            ProviderId::OpenAi,
            ProviderId::Anthropic,
        ];
        let policy = FallbackPolicy::for_text(&settings, &Credentials::default(), ProviderId::DeepSeek).unwrap();
        let ids: Vec<_> = policy.alternates().iter().map(|c| c.provider).collect();
        assert_eq!(ids, vec![ProviderId::OpenAi, ProviderId::Anthropic]);
    }

    #[test]
    fn test_policy_rejects_non_text_provider() {
        let mut settings = Settings::default();
        settings.text.fallback = vec![ProviderId::Ffmpeg];
        assert!(FallbackPolicy::for_text(&settings, &Credentials::default(), ProviderId::DeepSeek).is_err());
    }
}
