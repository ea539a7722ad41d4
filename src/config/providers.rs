//! Provider selection and credentials.
//!
//! A [`GatewayConfig`] holds exactly one [`ProviderConfig`] per task kind. It is
//! resolved once from [`Settings`] and [`Credentials`] and never mutated; changing
//! a provider produces a new value.

use super::Settings;
use crate::error::{MuseError, Result};
use crate::gateway::{GenerationOptions, ProviderId, TaskKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// An API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short masked form for diagnostics, e.g. `sk-12...abcd`.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 12 {
            return "****".to_string();
        }
        let head: String = chars[..5].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(****)")
    }
}

/// Credentials and endpoint overrides read from the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    keys: HashMap<ProviderId, Credential>,
    base_urls: HashMap<ProviderId, Url>,
    default_text_provider: Option<ProviderId>,
}

impl Credentials {
    /// Read `*_API_KEY`, `*_BASE_URL` and `DEFAULT_LLM_PROVIDER`.
    ///
    /// Empty variables count as unset. Malformed base URLs and unknown provider
    /// names are configuration errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut creds = Credentials::default();

        for (provider, key_var, url_var) in [
            (ProviderId::OpenAi, "OPENAI_API_KEY", "OPENAI_BASE_URL"),
            (ProviderId::DeepSeek, "DEEPSEEK_API_KEY", "DEEPSEEK_BASE_URL"),
            (ProviderId::Anthropic, "ANTHROPIC_API_KEY", "ANTHROPIC_BASE_URL"),
        ] {
            if let Some(key) = get(key_var) {
                creds.keys.insert(provider, Credential::new(key.trim()));
            }
            if let Some(raw) = get(url_var) {
                let url = Url::parse(raw.trim())
                    .map_err(|e| MuseError::Config(format!("{}: {}", url_var, e)))?;
                creds.base_urls.insert(provider, url);
            }
        }

        if let Some(name) = get("DEFAULT_LLM_PROVIDER") {
            let provider: ProviderId = name.parse().map_err(MuseError::Config)?;
            creds.default_text_provider = Some(provider);
        }

        Ok(creds)
    }

    pub fn with_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.keys.insert(provider, Credential::new(key));
        self
    }

    pub fn with_default_text_provider(mut self, provider: ProviderId) -> Self {
        self.default_text_provider = Some(provider);
        self
    }

    pub fn key(&self, provider: ProviderId) -> Option<&Credential> {
        self.keys.get(&provider)
    }

    pub fn base_url(&self, provider: ProviderId) -> Option<&Url> {
        self.base_urls.get(&provider)
    }

    pub fn default_text_provider(&self) -> Option<ProviderId> {
        self.default_text_provider
    }
}

/// Parameters for the local video renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub ffmpeg_path: PathBuf,
    pub fps: u32,
    pub font_size: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            fps: 24,
            font_size: 40,
        }
    }
}

/// The back-end selected for one task kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    pub model: String,
    pub credential: Option<Credential>,
    pub base_url: Option<Url>,
    pub timeout: Duration,
    /// Default options; request options take precedence.
    pub defaults: GenerationOptions,
    pub render: RenderSettings,
}

impl ProviderConfig {
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            credential: None,
            base_url: default_base_url(provider),
            timeout: Duration::from_secs(300),
            defaults: GenerationOptions::default(),
            render: RenderSettings::default(),
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_defaults(mut self, defaults: GenerationOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_render(mut self, render: RenderSettings) -> Self {
        self.render = render;
        self
    }

    /// True when a call could be attempted without a credential error.
    pub fn is_ready(&self) -> bool {
        !self.provider.requires_credential() || self.credential.is_some()
    }

    /// Request options layered over this provider's defaults.
    pub fn merged_options(&self, request: &GenerationOptions) -> GenerationOptions {
        let d = &self.defaults;
        GenerationOptions {
            style: request.style.clone().or_else(|| d.style.clone()),
            length: request.length.or(d.length),
            language: request.language.clone().or_else(|| d.language.clone()),
            duration_seconds: request.duration_seconds.or(d.duration_seconds),
            system: request.system.clone().or_else(|| d.system.clone()),
            // An explicit length outranks the provider's default token budget.
            max_tokens: request.max_tokens.or_else(|| {
                if request.length.is_some() {
                    None
                } else {
                    d.max_tokens
                }
            }),
            temperature: request.temperature.or(d.temperature),
            width: request.width.or(d.width),
            height: request.height.or(d.height),
            count: request.count.or(d.count),
        }
    }

    /// Resolve the configuration of `provider` for `kind` from settings and credentials.
    pub fn resolve(
        settings: &Settings,
        credentials: &Credentials,
        provider: ProviderId,
        kind: TaskKind,
    ) -> Result<Self> {
        if !provider.supports(kind) {
            return Err(MuseError::Config(format!(
                "provider '{}' cannot serve {} requests",
                provider, kind
            )));
        }

        let (model, defaults) = match kind {
            TaskKind::Text => (
                settings.text.model_for(provider).to_string(),
                GenerationOptions::default()
                    .with_max_tokens(settings.text.max_tokens)
                    .with_temperature(settings.text.temperature),
            ),
            TaskKind::Transcription => (
                settings.transcription.model.clone(),
                GenerationOptions::default().with_language(settings.transcription.language.clone()),
            ),
            TaskKind::Image => (
                settings.image.model.clone(),
                GenerationOptions::default()
                    .with_size(settings.image.width, settings.image.height)
                    .with_count(1),
            ),
            TaskKind::Video => (
                "libx264".to_string(),
                GenerationOptions::default()
                    .with_size(settings.video.width, settings.video.height)
                    .with_duration(settings.video.duration_seconds),
            ),
        };

        let mut config = ProviderConfig::new(provider, model)
            .with_timeout(settings.request_timeout())
            .with_defaults(defaults)
            .with_render(RenderSettings {
                ffmpeg_path: Settings::expand_path(&settings.video.ffmpeg_path),
                fps: settings.video.fps,
                font_size: settings.video.font_size,
            });

        if let Some(key) = credentials.key(provider) {
            config = config.with_credential(key.clone());
        }
        if let Some(url) = credentials.base_url(provider) {
            config = config.with_base_url(url.clone());
        }

        Ok(config)
    }
}

fn default_base_url(provider: ProviderId) -> Option<Url> {
    let raw = match provider {
        ProviderId::DeepSeek => DEEPSEEK_BASE_URL,
        ProviderId::Anthropic => ANTHROPIC_BASE_URL,
        _ => return None,
    };
    Url::parse(raw).ok()
}

/// One active provider per task kind.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    text: ProviderConfig,
    transcription: ProviderConfig,
    image: ProviderConfig,
    video: ProviderConfig,
}

impl GatewayConfig {
    /// Assemble a configuration, rejecting providers assigned to a kind they cannot serve.
    pub fn new(
        text: ProviderConfig,
        transcription: ProviderConfig,
        image: ProviderConfig,
        video: ProviderConfig,
    ) -> Result<Self> {
        for (kind, config) in [
            (TaskKind::Text, &text),
            (TaskKind::Transcription, &transcription),
            (TaskKind::Image, &image),
            (TaskKind::Video, &video),
        ] {
            check_supported(kind, config)?;
        }

        Ok(Self {
            text,
            transcription,
            image,
            video,
        })
    }

    /// Resolve every task kind from settings and credentials.
    ///
    /// `DEFAULT_LLM_PROVIDER` takes precedence over `text.provider`.
    pub fn from_settings(settings: &Settings, credentials: &Credentials) -> Result<Self> {
        let text_provider = credentials
            .default_text_provider()
            .unwrap_or(settings.text.provider);

        Self::new(
            ProviderConfig::resolve(settings, credentials, text_provider, TaskKind::Text)?,
            ProviderConfig::resolve(
                settings,
                credentials,
                settings.transcription.provider,
                TaskKind::Transcription,
            )?,
            ProviderConfig::resolve(settings, credentials, settings.image.provider, TaskKind::Image)?,
            ProviderConfig::resolve(settings, credentials, settings.video.provider, TaskKind::Video)?,
        )
    }

    pub fn for_kind(&self, kind: TaskKind) -> &ProviderConfig {
        match kind {
            TaskKind::Text => &self.text,
            TaskKind::Transcription => &self.transcription,
            TaskKind::Image => &self.image,
            TaskKind::Video => &self.video,
        }
    }

    /// A copy with `kind` re-pointed to `config`.
    pub fn with_provider(&self, kind: TaskKind, config: ProviderConfig) -> Result<Self> {
        check_supported(kind, &config)?;
        let mut next = self.clone();
        match kind {
            TaskKind::Text => next.text = config,
            TaskKind::Transcription => next.transcription = config,
            TaskKind::Image => next.image = config,
            TaskKind::Video => next.video = config,
        }
        Ok(next)
    }

    /// Task kinds whose selected provider has no credential.
    pub fn missing_credentials(&self) -> Vec<(TaskKind, ProviderId)> {
        TaskKind::ALL
            .iter()
            .map(|kind| (*kind, self.for_kind(*kind)))
            .filter(|(_, config)| !config.is_ready())
            .map(|(kind, config)| (kind, config.provider))
            .collect()
    }
}

fn check_supported(kind: TaskKind, config: &ProviderConfig) -> Result<()> {
    if config.provider.supports(kind) {
        Ok(())
    } else {
        Err(MuseError::Config(format!(
            "provider '{}' cannot serve {} requests",
            config.provider, kind
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Length;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = Credentials::from_lookup(env(&[
            ("OPENAI_API_KEY", "sk-openai-123456789"),
            ("DEEPSEEK_API_KEY", "  "),
            ("DEFAULT_LLM_PROVIDER", "openai"),
        ]))
        .unwrap();

        assert!(creds.key(ProviderId::OpenAi).is_some());
        assert!(creds.key(ProviderId::DeepSeek).is_none());
        assert_eq!(creds.default_text_provider(), Some(ProviderId::OpenAi));
    }

    #[test]
    fn test_unknown_default_provider_is_config_error() {
        let err = Credentials::from_lookup(env(&[("DEFAULT_LLM_PROVIDER", "gemini")])).unwrap_err();
        assert!(matches!(err, MuseError::Config(_)));
    }

    #[test]
    fn test_bad_base_url_is_config_error() {
        let err = Credentials::from_lookup(env(&[("OPENAI_BASE_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, MuseError::Config(_)));
    }

    #[test]
    fn test_credential_is_redacted() {
        let key = Credential::new("sk-abcdefghijklmnop");
        assert_eq!(format!("{:?}", key), "Credential(****)");
        assert_eq!(key.masked(), "sk-ab...mnop");
        assert_eq!(Credential::new("short").masked(), "****");
    }

    #[test]
    fn test_from_settings_resolves_each_kind() {
        let settings = Settings::default();
        let creds = Credentials::default().with_key(ProviderId::DeepSeek, "ds-key");
        let config = GatewayConfig::from_settings(&settings, &creds).unwrap();

        let text = config.for_kind(TaskKind::Text);
        assert_eq!(text.provider, ProviderId::DeepSeek);
        assert_eq!(text.model, "deepseek-chat");
        assert!(text.is_ready());
        assert_eq!(text.base_url.as_ref().map(|u| u.as_str()), Some("https://api.deepseek.com/"));

        assert_eq!(config.for_kind(TaskKind::Video).provider, ProviderId::Ffmpeg);
        assert_eq!(
            config.missing_credentials(),
            vec![
                (TaskKind::Transcription, ProviderId::OpenAi),
                (TaskKind::Image, ProviderId::OpenAi),
            ]
        );
    }

    #[test]
    fn test_env_default_provider_overrides_settings() {
        let settings = Settings::default();
        let creds = Credentials::default().with_default_text_provider(ProviderId::Anthropic);
        let config = GatewayConfig::from_settings(&settings, &creds).unwrap();
        let text = config.for_kind(TaskKind::Text);
        assert_eq!(text.provider, ProviderId::Anthropic);
        assert_eq!(text.model, "claude-3-haiku-20240307");
    }

    #[test]
    fn test_unsupported_assignment_rejected() {
        let mut settings = Settings::default();
        settings.transcription.provider = ProviderId::Anthropic;
        let err = GatewayConfig::from_settings(&settings, &Credentials::default()).unwrap_err();
        assert!(matches!(err, MuseError::Config(_)));
    }

    #[test]
    fn test_with_provider_leaves_original_untouched() {
        let config = GatewayConfig::from_settings(&Settings::default(), &Credentials::default()).unwrap();
        let swapped = config
            .with_provider(TaskKind::Text, ProviderConfig::new(ProviderId::OpenAi, "gpt-4o"))
            .unwrap();

        assert_eq!(config.for_kind(TaskKind::Text).provider, ProviderId::DeepSeek);
        assert_eq!(swapped.for_kind(TaskKind::Text).provider, ProviderId::OpenAi);
        assert!(config
            .with_provider(TaskKind::Video, ProviderConfig::new(ProviderId::OpenAi, "x"))
            .is_err());
    }

    #[test]
    fn test_merged_options_prefers_request() {
        let config = ProviderConfig::new(ProviderId::OpenAi, "gpt-4o").with_defaults(
            GenerationOptions::default()
                .with_max_tokens(2000)
                .with_temperature(0.7),
        );
        let merged = config.merged_options(&GenerationOptions::default().with_temperature(0.2));
        assert_eq!(merged.temperature, Some(0.2));
        assert_eq!(merged.max_tokens, Some(2000));

        let merged = config.merged_options(&GenerationOptions::default().with_length(Length::Long));
        assert_eq!(merged.max_tokens, None);
        assert_eq!(merged.effective_max_tokens(2000), 4000);
    }
}
