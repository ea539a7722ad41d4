//! Image generation with optional prompt rewriting.

use super::Studio;
use crate::config::vars;
use crate::error::Result;
use crate::gateway::{GenerationOptions, GenerationRequest, ResultMetadata};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

const REWRITE_MAX_TOKENS: u32 = 300;

/// Visual style appended to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStyle {
    #[default]
    Realistic,
    Anime,
    OilPainting,
    Watercolor,
    Sketch,
    Cartoon,
    Scifi,
    Dreamy,
}

impl ImageStyle {
    pub fn suffix(&self) -> &'static str {
        match self {
            ImageStyle::Realistic => "photorealistic, highly detailed, professional photography",
            ImageStyle::Anime => "anime style, manga, cel shading, vibrant colors",
            ImageStyle::OilPainting => "oil painting, classical art style, brush strokes",
            ImageStyle::Watercolor => "watercolor painting, soft colors, artistic",
            ImageStyle::Sketch => "pencil sketch, black and white, detailed drawing",
            ImageStyle::Cartoon => "cartoon style, colorful, simple shapes",
            ImageStyle::Scifi => "sci-fi, futuristic, cyberpunk, neon lights",
            ImageStyle::Dreamy => "dreamy, surreal, ethereal, magical",
        }
    }
}

impl std::str::FromStr for ImageStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "realistic" => Ok(ImageStyle::Realistic),
            "anime" => Ok(ImageStyle::Anime),
            "oil_painting" | "oil" => Ok(ImageStyle::OilPainting),
            "watercolor" => Ok(ImageStyle::Watercolor),
            "sketch" => Ok(ImageStyle::Sketch),
            "cartoon" => Ok(ImageStyle::Cartoon),
            "scifi" | "sci_fi" => Ok(ImageStyle::Scifi),
            "dreamy" => Ok(ImageStyle::Dreamy),
            _ => Err(format!(
                "Unknown image style: {}. Use realistic, anime, oil_painting, watercolor, sketch, cartoon, scifi, or dreamy.",
                s
            )),
        }
    }
}

impl std::fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImageStyle::Realistic => "realistic",
            ImageStyle::Anime => "anime",
            ImageStyle::OilPainting => "oil_painting",
            ImageStyle::Watercolor => "watercolor",
            ImageStyle::Sketch => "sketch",
            ImageStyle::Cartoon => "cartoon",
            ImageStyle::Scifi => "scifi",
            ImageStyle::Dreamy => "dreamy",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    /// `None` follows settings.
    #[serde(default)]
    pub style: Option<ImageStyle>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default = "one")]
    pub count: u32,
    /// Rewrite the prompt first. `None` follows settings.
    #[serde(default)]
    pub optimize: Option<bool>,
}

fn one() -> u32 {
    1
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            style: None,
            width: None,
            height: None,
            count: 1,
            optimize: None,
        }
    }
}

/// Saved images and the prompt that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub original_prompt: String,
    /// Prompt sent to the image provider, style suffix included.
    pub final_prompt: String,
    pub prompt_optimized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize_error: Option<String>,
    /// Prompts as rewritten by the provider, one per image when reported.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub revised_prompts: Vec<String>,
    pub paths: Vec<PathBuf>,
    pub metadata: ResultMetadata,
}

impl Studio {
    /// Generate images and save them under `images/`.
    #[instrument(skip(self, request), fields(count = request.count))]
    pub async fn generate_image(&self, request: &ImageRequest) -> Result<ImageReport> {
        let style = request.style.unwrap_or(self.defaults.image_style);
        let mut base = request.prompt.trim().to_string();
        let mut prompt_optimized = false;
        let mut optimize_error = None;

        if request.optimize.unwrap_or(self.defaults.optimize_image_prompt) && !base.is_empty() {
            let rewrite = self.prompts.render_with_custom(
                &self.prompts.image.optimize,
                &vars([("prompt", base.clone())]),
            );
            match self
                .generate_text(rewrite, GenerationOptions::default().with_max_tokens(REWRITE_MAX_TOKENS))
                .await
            {
                Ok(rewritten) if !rewritten.text.trim().is_empty() => {
                    base = rewritten.text.trim().to_string();
                    prompt_optimized = true;
                }
                Ok(_) => optimize_error = Some("rewrite came back empty".to_string()),
                Err(e) => {
                    warn!("Prompt rewrite failed, using the original prompt: {}", e);
                    optimize_error = Some(e.to_string());
                }
            }
        }

        let final_prompt = if base.is_empty() {
            base
        } else {
            format!("{}, {}", base, style.suffix())
        };
        let options = GenerationOptions::default()
            .with_size(
                request.width.unwrap_or(self.defaults.image_width),
                request.height.unwrap_or(self.defaults.image_height),
            )
            .with_count(request.count);

        let result = self
            .gateway
            .generate(&GenerationRequest::image(final_prompt.clone()).with_options(options))
            .await?;
        let metadata = result.metadata.clone();
        let images = result.into_images()?;
        let revised_prompts = images.iter().filter_map(|i| i.revised_prompt.clone()).collect();

        let title = super::truncate_chars(request.prompt.trim(), 30);
        let paths = self.store.save_images(&title, images).await?;
        info!(images = paths.len(), "Saved images");

        Ok(ImageReport {
            original_prompt: request.prompt.clone(),
            final_prompt,
            prompt_optimized,
            optimize_error,
            revised_prompts,
            paths,
            metadata,
        })
    }
}
