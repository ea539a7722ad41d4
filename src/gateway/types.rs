//! Request, result and identity types shared by every provider.

use crate::error::{MuseError, Result};
use crate::transcription::Transcript;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Largest audio upload accepted by the hosted transcription APIs.
pub const MAX_AUDIO_BYTES: u64 = 25 * 1024 * 1024;

/// Maximum number of images per request.
pub const MAX_IMAGE_COUNT: u32 = 4;

/// Maximum rendered video length in seconds.
pub const MAX_VIDEO_SECONDS: u32 = 600;

/// Category of generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Text,
    Transcription,
    Image,
    Video,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Text,
        TaskKind::Transcription,
        TaskKind::Image,
        TaskKind::Video,
    ];
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Text => write!(f, "text"),
            TaskKind::Transcription => write!(f, "transcription"),
            TaskKind::Image => write!(f, "image"),
            TaskKind::Video => write!(f, "video"),
        }
    }
}

/// A generative back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    /// Local ffmpeg renderer.
    Ffmpeg,
}

impl ProviderId {
    /// Whether this provider can serve the given task kind.
    pub fn supports(&self, kind: TaskKind) -> bool {
        match self {
            ProviderId::DeepSeek | ProviderId::Anthropic => kind == TaskKind::Text,
            ProviderId::OpenAi => matches!(
                kind,
                TaskKind::Text | TaskKind::Transcription | TaskKind::Image
            ),
            ProviderId::Ffmpeg => kind == TaskKind::Video,
        }
    }

    /// Whether calls need an API credential.
    pub fn requires_credential(&self) -> bool {
        !matches!(self, ProviderId::Ffmpeg)
    }

    /// Environment variable holding this provider's credential.
    pub fn credential_env(&self) -> Option<&'static str> {
        match self {
            ProviderId::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ProviderId::OpenAi => Some("OPENAI_API_KEY"),
            ProviderId::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderId::Ffmpeg => None,
        }
    }
}

impl std::str::FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deepseek" => Ok(ProviderId::DeepSeek),
            "openai" => Ok(ProviderId::OpenAi),
            "anthropic" | "claude" => Ok(ProviderId::Anthropic),
            "ffmpeg" => Ok(ProviderId::Ffmpeg),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::DeepSeek => write!(f, "deepseek"),
            ProviderId::OpenAi => write!(f, "openai"),
            ProviderId::Anthropic => write!(f, "anthropic"),
            ProviderId::Ffmpeg => write!(f, "ffmpeg"),
        }
    }
}

/// Requested text length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Length {
    Short,
    Medium,
    Long,
}

impl Length {
    /// Token budget that comfortably fits this length.
    pub fn max_tokens(&self) -> u32 {
        match self {
            Length::Short => 1000,
            Length::Medium => 2000,
            Length::Long => 4000,
        }
    }

    /// Human description used inside prompts.
    pub fn describe(&self) -> &'static str {
        match self {
            Length::Short => "500-800 words",
            Length::Medium => "1000-1500 words",
            Length::Long => "2000-3000 words",
        }
    }
}

impl std::str::FromStr for Length {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(Length::Short),
            "medium" => Ok(Length::Medium),
            "long" => Ok(Length::Long),
            _ => Err(format!("Unknown length: {}. Use short, medium, or long.", s)),
        }
    }
}

impl std::fmt::Display for Length {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Length::Short => write!(f, "short"),
            Length::Medium => write!(f, "medium"),
            Length::Long => write!(f, "long"),
        }
    }
}

/// How a video script is laid out on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoLayout {
    /// Narration centred on a plain background.
    #[default]
    Text,
    /// One coloured card per scene with a label and a caption.
    Slideshow,
}

impl std::str::FromStr for VideoLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "text_video" => Ok(VideoLayout::Text),
            "slideshow" => Ok(VideoLayout::Slideshow),
            _ => Err(format!("Unknown layout: {}. Use text or slideshow.", s)),
        }
    }
}

impl std::fmt::Display for VideoLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoLayout::Text => write!(f, "text"),
            VideoLayout::Slideshow => write!(f, "slideshow"),
        }
    }
}

/// One scene of a video script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub visual_description: String,
    pub narration: String,
    #[serde(default)]
    pub transition: String,
}

impl Scene {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A narrated video script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoScript {
    pub title: String,
    #[serde(default)]
    pub duration: f64,
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub full_narration: String,
    #[serde(default)]
    pub music_style: String,
    #[serde(default)]
    pub visual_style: String,
}

impl VideoScript {
    /// Total length covered by the scenes.
    pub fn total_seconds(&self) -> f64 {
        self.scenes.iter().map(Scene::duration).sum()
    }
}

/// What the provider should work on.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A topic or prompt.
    Text(String),
    /// A local audio file.
    Audio(PathBuf),
    /// A script to render.
    Script {
        script: VideoScript,
        layout: VideoLayout,
    },
    /// Existing images to turn into a slideshow.
    Images {
        paths: Vec<PathBuf>,
        seconds_per_image: f64,
    },
}

impl Payload {
    fn fits(&self, kind: TaskKind) -> bool {
        matches!(
            (kind, self),
            (TaskKind::Text, Payload::Text(_))
                | (TaskKind::Image, Payload::Text(_))
                | (TaskKind::Transcription, Payload::Audio(_))
                | (TaskKind::Video, Payload::Script { .. })
                | (TaskKind::Video, Payload::Images { .. })
        )
    }
}

/// Named options. Providers ignore the ones that do not apply to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub style: Option<String>,
    pub length: Option<Length>,
    pub language: Option<String>,
    pub duration_seconds: Option<u32>,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub count: Option<u32>,
}

impl GenerationOptions {
    /// Explicit token budget, else the length's budget, else `default`.
    pub fn effective_max_tokens(&self, default: u32) -> u32 {
        self.max_tokens
            .or_else(|| self.length.map(|l| l.max_tokens()))
            .unwrap_or(default)
    }

    pub fn with_length(mut self, length: Length) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }
}

/// A single generation call. Carries no provider identity.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    id: Uuid,
    kind: TaskKind,
    payload: Payload,
    options: GenerationOptions,
    timeout: Option<Duration>,
}

impl GenerationRequest {
    fn new(kind: TaskKind, payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            payload,
            options: GenerationOptions::default(),
            timeout: None,
        }
    }

    /// Text generation from a prompt.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self::new(TaskKind::Text, Payload::Text(prompt.into()))
    }

    /// Speech-to-text for a local audio file.
    pub fn transcription(audio: impl Into<PathBuf>) -> Self {
        Self::new(TaskKind::Transcription, Payload::Audio(audio.into()))
    }

    /// Image generation from a prompt.
    pub fn image(prompt: impl Into<String>) -> Self {
        Self::new(TaskKind::Image, Payload::Text(prompt.into()))
    }

    /// Video rendering from a script.
    pub fn video(script: VideoScript, layout: VideoLayout) -> Self {
        Self::new(TaskKind::Video, Payload::Script { script, layout })
    }

    /// Video slideshow from existing images.
    pub fn slideshow(paths: Vec<PathBuf>, seconds_per_image: f64) -> Self {
        Self::new(
            TaskKind::Video,
            Payload::Images {
                paths,
                seconds_per_image,
            },
        )
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Upper bound for the provider call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The text payload, if this is a text or image request.
    pub fn prompt(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Check payload and options before any provider is involved.
    pub fn validate(&self) -> Result<()> {
        if !self.payload.fits(self.kind) {
            return Err(invalid(format!(
                "payload does not match task kind '{}'",
                self.kind
            )));
        }

        match &self.payload {
            Payload::Text(text) if text.trim().is_empty() => {
                return Err(invalid("prompt must not be empty"));
            }
            Payload::Text(_) => {}
            Payload::Audio(path) => {
                let meta = std::fs::metadata(path).map_err(|_| {
                    invalid(format!("audio file not found: {}", path.display()))
                })?;
                if !meta.is_file() {
                    return Err(invalid(format!("not a file: {}", path.display())));
                }
                if meta.len() == 0 {
                    return Err(invalid(format!("audio file is empty: {}", path.display())));
                }
                if meta.len() > MAX_AUDIO_BYTES {
                    return Err(invalid(format!(
                        "audio file exceeds the 25 MB upload limit ({:.1} MB)",
                        meta.len() as f64 / (1024.0 * 1024.0)
                    )));
                }
            }
            Payload::Script { script, .. } => validate_script(script)?,
            Payload::Images {
                paths,
                seconds_per_image,
            } => {
                if paths.is_empty() {
                    return Err(invalid("slideshow needs at least one image"));
                }
                if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
                    return Err(invalid(format!("image not found: {}", missing.display())));
                }
                if !(*seconds_per_image > 0.0 && *seconds_per_image <= 60.0) {
                    return Err(invalid("seconds per image must be in (0, 60]"));
                }
            }
        }

        let opts = &self.options;
        if let Some(t) = opts.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(invalid(format!("temperature {} outside 0..=2", t)));
            }
        }
        if let Some(n) = opts.count {
            if n == 0 || n > MAX_IMAGE_COUNT {
                return Err(invalid(format!(
                    "image count {} outside 1..={}",
                    n, MAX_IMAGE_COUNT
                )));
            }
        }
        if let Some(d) = opts.duration_seconds {
            if d == 0 || d > MAX_VIDEO_SECONDS {
                return Err(invalid(format!(
                    "duration {}s outside 1..={}",
                    d, MAX_VIDEO_SECONDS
                )));
            }
        }
        if opts.width == Some(0) || opts.height == Some(0) {
            return Err(invalid("width and height must be positive"));
        }
        if opts.max_tokens == Some(0) {
            return Err(invalid("max_tokens must be positive"));
        }

        Ok(())
    }
}

fn validate_script(script: &VideoScript) -> Result<()> {
    if script.scenes.is_empty() {
        return Err(invalid("video script has no scenes"));
    }
    let mut cursor = 0.0;
    for (i, scene) in script.scenes.iter().enumerate() {
        if scene.end_time <= scene.start_time {
            return Err(invalid(format!(
                "scene {} ends before it starts ({} -> {})",
                i + 1,
                scene.start_time,
                scene.end_time
            )));
        }
        if scene.start_time < cursor {
            return Err(invalid(format!("scene {} overlaps the previous one", i + 1)));
        }
        cursor = scene.end_time;
    }
    if script.total_seconds() > MAX_VIDEO_SECONDS as f64 {
        return Err(invalid(format!(
            "script runs longer than {} seconds",
            MAX_VIDEO_SECONDS
        )));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> MuseError {
    MuseError::InvalidRequest(msg.into())
}

/// Encoding of a media artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Png,
    Jpeg,
    Mp4,
}

impl MediaFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Png => "png",
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Mp4 => "mp4",
        }
    }
}

/// Where the media bytes live until persisted.
#[derive(Debug)]
pub enum MediaData {
    Bytes(Vec<u8>),
    /// Removed from disk when dropped.
    TempFile(tempfile::TempPath),
}

/// Binary output of an image or video provider.
#[derive(Debug)]
pub struct MediaAsset {
    pub format: MediaFormat,
    pub data: MediaData,
    /// Prompt as rewritten by the provider, when it reports one.
    pub revised_prompt: Option<String>,
}

impl MediaAsset {
    pub fn from_bytes(format: MediaFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            data: MediaData::Bytes(bytes),
            revised_prompt: None,
        }
    }

    pub fn from_temp_file(format: MediaFormat, path: tempfile::TempPath) -> Self {
        Self {
            format,
            data: MediaData::TempFile(path),
            revised_prompt: None,
        }
    }
}

/// Raw provider output.
#[derive(Debug)]
pub enum Output {
    Text(String),
    Transcript(Transcript),
    Images(Vec<MediaAsset>),
    Video(MediaAsset),
}

/// Who produced a result, and when.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultMetadata {
    pub request_id: Uuid,
    pub kind: TaskKind,
    pub provider: ProviderId,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

/// Provider output plus metadata.
#[derive(Debug)]
pub struct GenerationResult {
    pub output: Output,
    pub metadata: ResultMetadata,
}

impl GenerationResult {
    pub fn new(request: &GenerationRequest, provider: ProviderId, model: &str, output: Output) -> Self {
        Self {
            output,
            metadata: ResultMetadata {
                request_id: request.id(),
                kind: request.kind(),
                provider,
                model: model.to_string(),
                created_at: Utc::now(),
            },
        }
    }

    /// The generated text, if this is a text result.
    pub fn text(&self) -> Option<&str> {
        match &self.output {
            Output::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Consume into text; other outputs are a provider contract violation.
    pub fn into_text(self) -> Result<String> {
        let provider = self.metadata.provider;
        match self.output {
            Output::Text(text) => Ok(text),
            _ => Err(MuseError::provider(provider, "expected a text result")),
        }
    }

    pub fn into_transcript(self) -> Result<Transcript> {
        let provider = self.metadata.provider;
        match self.output {
            Output::Transcript(t) => Ok(t),
            _ => Err(MuseError::provider(provider, "expected a transcript result")),
        }
    }

    pub fn into_images(self) -> Result<Vec<MediaAsset>> {
        let provider = self.metadata.provider;
        match self.output {
            Output::Images(images) => Ok(images),
            _ => Err(MuseError::provider(provider, "expected an image result")),
        }
    }

    pub fn into_video(self) -> Result<MediaAsset> {
        let provider = self.metadata.provider;
        match self.output {
            Output::Video(video) => Ok(video),
            _ => Err(MuseError::provider(provider, "expected a video result")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn scene(start: f64, end: f64) -> Scene {
        Scene {
            start_time: start,
            end_time: end,
            visual_description: String::new(),
            narration: "hello".to_string(),
            transition: String::new(),
        }
    }

    fn script(scenes: Vec<Scene>) -> VideoScript {
        VideoScript {
            title: "t".to_string(),
            duration: 0.0,
            scenes,
            full_narration: String::new(),
            music_style: String::new(),
            visual_style: String::new(),
        }
    }

    #[test]
    fn test_provider_support_matrix() {
        assert!(ProviderId::DeepSeek.supports(TaskKind::Text));
        assert!(!ProviderId::DeepSeek.supports(TaskKind::Image));
        assert!(ProviderId::OpenAi.supports(TaskKind::Transcription));
        assert!(!ProviderId::OpenAi.supports(TaskKind::Video));
        assert!(ProviderId::Ffmpeg.supports(TaskKind::Video));
        assert!(!ProviderId::Ffmpeg.requires_credential());
    }

    #[test]
    fn test_provider_parse_and_display() {
        assert_eq!("DeepSeek".parse::<ProviderId>().unwrap(), ProviderId::DeepSeek);
        assert_eq!("claude".parse::<ProviderId>().unwrap(), ProviderId::Anthropic);
        assert!("gemini".parse::<ProviderId>().is_err());
        assert_eq!(ProviderId::OpenAi.to_string(), "openai");
    }

    #[test]
    fn test_effective_max_tokens() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.effective_max_tokens(1500), 1500);
        let opts = opts.with_length(Length::Long);
        assert_eq!(opts.effective_max_tokens(1500), 4000);
        let opts = opts.with_max_tokens(300);
        assert_eq!(opts.effective_max_tokens(1500), 300);
    }

    #[test]
    fn test_validate_rejects_empty_prompt() {
        let err = GenerationRequest::text("   ").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_validate_rejects_missing_audio() {
        let err = GenerationRequest::transcription("/definitely/not/here.mp3")
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_validate_accepts_existing_audio() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"ID3").unwrap();
        assert!(GenerationRequest::transcription(file.path()).validate().is_ok());
    }

    #[test]
    fn test_validate_options() {
        let req = GenerationRequest::text("hi")
            .with_options(GenerationOptions::default().with_temperature(3.5));
        assert!(req.validate().is_err());

        let req = GenerationRequest::image("a cat")
            .with_options(GenerationOptions::default().with_count(9));
        assert!(req.validate().is_err());

        let req = GenerationRequest::image("a cat")
            .with_options(GenerationOptions::default().with_count(2).with_size(1024, 1024));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_script_ordering() {
        let ok = GenerationRequest::video(script(vec![scene(0.0, 5.0), scene(5.0, 9.0)]), VideoLayout::Text);
        assert!(ok.validate().is_ok());

        let empty = GenerationRequest::video(script(vec![]), VideoLayout::Text);
        assert!(empty.validate().is_err());

        let backwards = GenerationRequest::video(script(vec![scene(5.0, 2.0)]), VideoLayout::Text);
        assert!(backwards.validate().is_err());

        let overlapping =
            GenerationRequest::video(script(vec![scene(0.0, 5.0), scene(3.0, 8.0)]), VideoLayout::Slideshow);
        assert!(overlapping.validate().is_err());
    }

    #[test]
    fn test_validate_slideshow_images() {
        let req = GenerationRequest::slideshow(vec![], 3.0);
        assert!(req.validate().is_err());

        let img = tempfile::NamedTempFile::new().unwrap();
        let req = GenerationRequest::slideshow(vec![img.path().to_path_buf()], 3.0);
        assert!(req.validate().is_ok());

        let req = GenerationRequest::slideshow(vec![img.path().to_path_buf()], 0.0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_requests_get_distinct_ids() {
        let a = GenerationRequest::text("x");
        let b = GenerationRequest::text("x");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_into_text_rejects_other_outputs() {
        let req = GenerationRequest::image("x");
        let result = GenerationResult::new(&req, ProviderId::OpenAi, "dall-e-3", Output::Images(vec![]));
        assert_eq!(result.into_text().unwrap_err().kind(), ErrorKind::ProviderError);
    }
}
