//! Content operations built on the gateway.
//!
//! The [`Studio`] turns user-level operations (write an article, summarise a
//! recording, render a video, ...) into gateway requests, and persists results
//! through the [`OutputStore`] once a call has succeeded. Text generation goes
//! through the configured fallback chain; every other kind is a single call.

mod article;
mod image;
mod prompt;
mod speech;
mod video;

pub use article::{Article, ArticleRequest, ArticleStyle, ChapterRequest, OutlineRequest};
pub use image::{ImageReport, ImageRequest, ImageStyle};
pub use prompt::{
    Domain, Improvement, OptimizationGoal, OptimizationReport, OptimizeRequest, OptimizedPrompt,
    PromptAnalysis, PromptScores, PromptVariation, PromptVariations, StructuredPrompt,
};
pub use speech::{AudioReport, AudioRequest, SummaryKind};
pub use video::{collect_images, SlideshowReport, VideoReport, VideoRequest, VideoStyle};

use crate::config::{Credentials, GatewayConfig, Prompts, Settings};
use crate::error::Result;
use crate::gateway::{
    generate_with_fallback, FallbackPolicy, Gateway, GenerationOptions, GenerationRequest,
    ResultMetadata, TaskKind, VideoLayout,
};
use crate::output_store::OutputStore;
use tracing::{debug, warn};

/// Prompt language used when the caller does not name one.
const DEFAULT_LANGUAGE: &str = "the same language as the input";

/// Text returned by the text provider, with the metadata of the call that produced it.
#[derive(Debug, Clone)]
pub struct GeneratedText {
    pub text: String,
    pub metadata: ResultMetadata,
}

/// Defaults taken from settings for options the caller leaves out.
#[derive(Debug, Clone)]
pub struct StudioDefaults {
    pub transcription_language: String,
    pub image_width: u32,
    pub image_height: u32,
    pub image_style: ImageStyle,
    pub optimize_image_prompt: bool,
    pub video_duration: u32,
    pub video_style: VideoStyle,
    pub video_layout: VideoLayout,
}

impl StudioDefaults {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            transcription_language: settings.transcription.language.clone(),
            image_width: settings.image.width,
            image_height: settings.image.height,
            image_style: settings.image.style.parse().unwrap_or_default(),
            optimize_image_prompt: settings.image.optimize_prompt,
            video_duration: settings.video.duration_seconds,
            video_style: settings.video.style.parse().unwrap_or_default(),
            video_layout: settings.video.layout,
        }
    }
}

impl Default for StudioDefaults {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Entry point for every content operation.
#[derive(Debug, Clone)]
pub struct Studio {
    gateway: Gateway,
    prompts: Prompts,
    store: OutputStore,
    text_fallback: FallbackPolicy,
    defaults: StudioDefaults,
}

impl Studio {
    pub fn new(gateway: Gateway, prompts: Prompts, store: OutputStore) -> Self {
        Self {
            gateway,
            prompts,
            store,
            text_fallback: FallbackPolicy::none(),
            defaults: StudioDefaults::default(),
        }
    }

    /// Wire up the real providers from settings and credentials.
    pub fn from_settings(settings: &Settings, credentials: &Credentials) -> Result<Self> {
        let config = GatewayConfig::from_settings(settings, credentials)?;
        let primary = config.for_kind(TaskKind::Text).provider;
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Ok(Self::new(
            Gateway::new(config),
            prompts,
            OutputStore::new(settings.output_dir()),
        )
        .with_text_fallback(FallbackPolicy::for_text(settings, credentials, primary)?)
        .with_defaults(StudioDefaults::from_settings(settings)))
    }

    pub fn with_text_fallback(mut self, policy: FallbackPolicy) -> Self {
        self.text_fallback = policy;
        self
    }

    pub fn with_defaults(mut self, defaults: StudioDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    pub fn defaults(&self) -> &StudioDefaults {
        &self.defaults
    }

    pub fn text_fallback(&self) -> &FallbackPolicy {
        &self.text_fallback
    }

    /// Run a text request through the fallback chain.
    pub async fn generate_text(&self, prompt: String, options: GenerationOptions) -> Result<GeneratedText> {
        let request = GenerationRequest::text(prompt).with_options(options);
        let outcome = generate_with_fallback(&self.gateway, &request, &self.text_fallback).await?;

        for attempt in &outcome.failed {
            warn!(
                provider = %attempt.provider,
                kind = %attempt.error.kind(),
                "Text provider failed, tried the next one: {}",
                attempt.error
            );
        }

        let metadata = outcome.result.metadata.clone();
        let text = outcome.result.into_text()?;
        debug!(provider = %metadata.provider, chars = text.chars().count(), "Generated text");

        Ok(GeneratedText { text, metadata })
    }
}

fn language_or_default(language: Option<&str>) -> String {
    language
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string()
}

/// Extract the first JSON object from model output, tolerating code fences and prose.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// First `max_chars` characters, with `...` when cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }
}
