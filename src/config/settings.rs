//! Configuration settings for Muse.

use crate::gateway::{ProviderId, VideoLayout};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub text: TextSettings,
    pub transcription: TranscriptionSettings,
    pub image: ImageSettings,
    pub video: VideoSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Root of the output tree (articles, audio, images, videos, prompts).
    pub output_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Upper bound for a single provider call, in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "./outputs".to_string(),
            log_level: "info".to_string(),
            request_timeout_seconds: 300,
        }
    }
}

/// Text generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    /// Default LLM provider. `DEFAULT_LLM_PROVIDER` overrides it.
    pub provider: ProviderId,
    pub deepseek_model: String,
    pub openai_model: String,
    pub anthropic_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Providers to try, in order, when the default one fails. Empty disables fallback.
    pub fallback: Vec<ProviderId>,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            provider: ProviderId::DeepSeek,
            deepseek_model: "deepseek-chat".to_string(),
            openai_model: "gpt-4o".to_string(),
            anthropic_model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            fallback: Vec::new(),
        }
    }
}

impl TextSettings {
    /// Model configured for a text provider.
    pub fn model_for(&self, provider: ProviderId) -> &str {
        match provider {
            ProviderId::DeepSeek => &self.deepseek_model,
            ProviderId::Anthropic => &self.anthropic_model,
            _ => &self.openai_model,
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub provider: ProviderId,
    pub model: String,
    /// Default spoken language (ISO-639-1).
    pub language: String,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: ProviderId::OpenAi,
            model: "whisper-1".to_string(),
            language: "zh".to_string(),
        }
    }
}

/// Image generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub provider: ProviderId,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub style: String,
    /// Rewrite prompts with the text provider before generating.
    pub optimize_prompt: bool,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            provider: ProviderId::OpenAi,
            model: "dall-e-3".to_string(),
            width: 1024,
            height: 1024,
            style: "realistic".to_string(),
            optimize_prompt: true,
        }
    }
}

/// Video rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub provider: ProviderId,
    /// Path or name of the ffmpeg binary.
    pub ffmpeg_path: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub font_size: u32,
    /// Default video length in seconds.
    pub duration_seconds: u32,
    pub style: String,
    pub layout: VideoLayout,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            provider: ProviderId::Ffmpeg,
            ffmpeg_path: "ffmpeg".to_string(),
            width: 1920,
            height: 1080,
            fps: 24,
            font_size: 40,
            duration_seconds: 30,
            style: "educational".to_string(),
            layout: VideoLayout::Text,
        }
    }
}

/// Browser UI server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::MuseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("muse")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Provider call timeout.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.general.request_timeout_seconds.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.text.provider, ProviderId::DeepSeek);
        assert_eq!(settings.transcription.model, "whisper-1");
        assert_eq!(settings.video.provider, ProviderId::Ffmpeg);
        assert!(settings.text.fallback.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [text]
            provider = "anthropic"
            fallback = ["openai", "deepseek"]

            [video]
            layout = "slideshow"
            "#,
        )
        .unwrap();
        assert_eq!(settings.text.provider, ProviderId::Anthropic);
        assert_eq!(settings.text.fallback, vec![ProviderId::OpenAi, ProviderId::DeepSeek]);
        assert_eq!(settings.text.deepseek_model, "deepseek-chat");
        assert_eq!(settings.video.layout, VideoLayout::Slideshow);
        assert_eq!(settings.server.port, 8501);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut settings = Settings::default();
        settings.general.output_dir = "/tmp/muse-out".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.general.output_dir, "/tmp/muse-out");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = PathBuf::from("/nonexistent/muse/config.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.general.output_dir, "./outputs");
    }
}
