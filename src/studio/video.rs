//! Scripted videos and image slideshows.

use super::{extract_json_object, language_or_default, truncate_chars, Studio};
use crate::config::vars;
use crate::error::{MuseError, Result};
use crate::gateway::{
    GenerationOptions, GenerationRequest, ResultMetadata, Scene, VideoLayout, VideoScript,
    MAX_VIDEO_SECONDS,
};
use crate::output_store::OutputKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

const SCRIPT_MAX_TOKENS: u32 = 2000;
const FALLBACK_NARRATION_CHARS: usize = 500;
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStyle {
    #[default]
    Educational,
    Marketing,
    Story,
    Explainer,
    Social,
}

impl VideoStyle {
    pub fn describe(&self) -> &'static str {
        match self {
            VideoStyle::Educational => "educational, clear and informative",
            VideoStyle::Marketing => "marketing, persuasive with a call to action",
            VideoStyle::Story => "storytelling, emotional and narrative",
            VideoStyle::Explainer => "explainer, step by step and simple",
            VideoStyle::Social => "social media, short, punchy and lively",
        }
    }
}

impl std::str::FromStr for VideoStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "educational" => Ok(VideoStyle::Educational),
            "marketing" => Ok(VideoStyle::Marketing),
            "story" => Ok(VideoStyle::Story),
            "explainer" => Ok(VideoStyle::Explainer),
            "social" => Ok(VideoStyle::Social),
            _ => Err(format!(
                "Unknown video style: {}. Use educational, marketing, story, explainer, or social.",
                s
            )),
        }
    }
}

impl std::fmt::Display for VideoStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VideoStyle::Educational => "educational",
            VideoStyle::Marketing => "marketing",
            VideoStyle::Story => "story",
            VideoStyle::Explainer => "explainer",
            VideoStyle::Social => "social",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoRequest {
    pub prompt: String,
    #[serde(default)]
    pub style: Option<VideoStyle>,
    /// Seconds; the configured default when absent.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub layout: Option<VideoLayout>,
    #[serde(default)]
    pub language: Option<String>,
}

impl VideoRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoReport {
    pub script: VideoScript,
    /// False when the model's script was unusable and a single scene was built instead.
    pub script_parsed: bool,
    pub layout: VideoLayout,
    pub video_path: PathBuf,
    pub script_path: PathBuf,
    pub metadata: ResultMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideshowReport {
    pub images: usize,
    pub duration_seconds: f64,
    pub path: PathBuf,
    pub metadata: ResultMetadata,
}

impl Studio {
    /// Write a script with the text provider and render it.
    #[instrument(skip(self, request), fields(duration = ?request.duration))]
    pub async fn generate_video(&self, request: &VideoRequest) -> Result<VideoReport> {
        let topic = request.prompt.trim();
        if topic.is_empty() {
            return Err(MuseError::InvalidRequest("prompt must not be empty".to_string()));
        }
        let duration = request.duration.unwrap_or(self.defaults.video_duration);
        if duration == 0 || duration > MAX_VIDEO_SECONDS {
            return Err(MuseError::InvalidRequest(format!(
                "duration {}s outside 1..={}",
                duration, MAX_VIDEO_SECONDS
            )));
        }
        let style = request.style.unwrap_or(self.defaults.video_style);
        let layout = request.layout.unwrap_or(self.defaults.video_layout);

        let prompt = self.prompts.render_with_custom(
            &self.prompts.video.script,
            &vars([
                ("duration", duration.to_string()),
                ("prompt", topic.to_string()),
                ("style", style.describe().to_string()),
                ("language", language_or_default(request.language.as_deref())),
            ]),
        );
        let generated = self
            .generate_text(
                prompt,
                GenerationOptions::default().with_max_tokens(SCRIPT_MAX_TOKENS),
            )
            .await?;

        let (script, script_parsed) = match parse_script(&generated.text, duration as f64) {
            Some(script) => (script, true),
            None => {
                warn!("Script was not usable JSON, rendering the reply as one scene");
                (fallback_script(topic, &generated.text, duration as f64), false)
            }
        };
        info!(scenes = script.scenes.len(), title = %script.title, "Script ready");

        let result = self
            .gateway
            .generate(
                &GenerationRequest::video(script.clone(), layout)
                    .with_options(GenerationOptions::default().with_duration(duration)),
            )
            .await?;
        let metadata = result.metadata.clone();
        let video = result.into_video()?;

        let video_path = self
            .store
            .save_media(OutputKind::Videos, &script.title, video)
            .await?;
        let script_path = video_path.with_extension("json");
        if let Err(e) = write_script(&script_path, &script).await {
            let _ = tokio::fs::remove_file(&video_path).await;
            return Err(e);
        }
        info!("Saved {}", video_path.display());

        Ok(VideoReport {
            script,
            script_parsed,
            layout,
            video_path,
            script_path,
            metadata,
        })
    }

    /// Turn existing images into a video, `seconds_per_image` each.
    #[instrument(skip(self, images), fields(count = images.len()))]
    pub async fn create_slideshow(&self, images: Vec<PathBuf>, seconds_per_image: f64) -> Result<SlideshowReport> {
        let count = images.len();
        let result = self
            .gateway
            .generate(&GenerationRequest::slideshow(images, seconds_per_image))
            .await?;
        let metadata = result.metadata.clone();
        let video = result.into_video()?;

        let path = self
            .store
            .save_media(OutputKind::Videos, "slideshow", video)
            .await?;
        info!("Saved {}", path.display());

        Ok(SlideshowReport {
            images: count,
            duration_seconds: count as f64 * seconds_per_image,
            path,
            metadata,
        })
    }
}

/// Image files in `dir`, sorted by name.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MuseError::InvalidRequest(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    images.sort();
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Parse a script from model output and fit it into `[0, duration]`.
///
/// Scenes that end before they start are dropped, overlaps are clipped to the
/// previous scene's end. `None` when no usable scene is left.
fn parse_script(raw: &str, duration: f64) -> Option<VideoScript> {
    let mut script: VideoScript = serde_json::from_str(extract_json_object(raw)?).ok()?;
    let limit = duration.min(MAX_VIDEO_SECONDS as f64);

    let mut cursor = 0.0;
    let mut scenes = Vec::with_capacity(script.scenes.len());
    for mut scene in script.scenes {
        if !scene.start_time.is_finite() || !scene.end_time.is_finite() || scene.narration.trim().is_empty() {
            continue;
        }
        scene.start_time = scene.start_time.max(cursor);
        scene.end_time = scene.end_time.min(limit);
        if scene.end_time <= scene.start_time {
            continue;
        }
        cursor = scene.end_time;
        scenes.push(scene);
    }
    if scenes.is_empty() {
        return None;
    }

    script.scenes = scenes;
    script.duration = cursor;
    if script.title.trim().is_empty() {
        script.title = "video".to_string();
    }
    if script.full_narration.trim().is_empty() {
        script.full_narration = script
            .scenes
            .iter()
            .map(|s| s.narration.as_str())
            .collect::<Vec<_>>()
            .join(" ");
    }
    Some(script)
}

/// One scene spanning the whole video, narrating the start of the reply.
fn fallback_script(topic: &str, raw: &str, duration: f64) -> VideoScript {
    let narration = match raw.trim() {
        "" => topic.to_string(),
        text => truncate_chars(text, FALLBACK_NARRATION_CHARS),
    };
    VideoScript {
        title: truncate_chars(topic, 40),
        duration,
        scenes: vec![Scene {
            start_time: 0.0,
            end_time: duration,
            visual_description: topic.to_string(),
            narration: narration.clone(),
            transition: String::new(),
        }],
        full_narration: narration,
        music_style: String::new(),
        visual_style: "simple modern".to_string(),
    }
}

/// Write the script next to its video. Never replaces an existing file.
async fn write_script(path: &Path, script: &VideoScript) -> Result<()> {
    let json = serde_json::to_string_pretty(script)?;
    let written = async {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.flush().await
    }
    .await;
    written.map_err(|e| MuseError::Output(format!("cannot write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::gateway::testing::{FakeFactory, Reply};
    use crate::gateway::{Payload, ProviderId, TaskKind};
    use crate::studio::test_support::{files_in, studio};
    use std::sync::Arc;

    const SCRIPT: &str = r#"```json
{
  "title": "Rust in 20 seconds",
  "duration": 20,
  "scenes": [
    {"start_time": 0, "end_time": 5, "visual_description": "logo", "narration": "Meet Rust.", "transition": "fade in"},
    {"start_time": 4, "end_time": 12, "narration": "It is fast."},
    {"start_time": 12, "end_time": 10, "narration": "backwards"},
    {"start_time": 12, "end_time": 30, "narration": "And safe."}
  ],
  "visual_style": "modern"
}
```"#;

    #[test]
    fn test_parse_script_normalises_scenes() {
        let script = parse_script(SCRIPT, 20.0).unwrap();

        let spans: Vec<_> = script.scenes.iter().map(|s| (s.start_time, s.end_time)).collect();
        assert_eq!(spans, vec![(0.0, 5.0), (5.0, 12.0), (12.0, 20.0)]);
        assert_eq!(script.duration, 20.0);
        assert_eq!(script.full_narration, "Meet Rust. It is fast. And safe.");
    }

    #[test]
    fn test_parse_script_rejects_prose() {
        assert!(parse_script("Scene one: a cat walks in.", 30.0).is_none());
        assert!(parse_script(r#"{"title": "x", "scenes": []}"#, 30.0).is_none());
    }

    #[test]
    fn test_fallback_script_truncates_narration() {
        let raw = "x".repeat(800);
        let script = fallback_script("cats", &raw, 30.0);

        assert_eq!(script.scenes.len(), 1);
        assert_eq!(script.scenes[0].end_time, 30.0);
        assert_eq!(script.scenes[0].narration.chars().count(), FALLBACK_NARRATION_CHARS + 3);
        assert_eq!(script.visual_style, "simple modern");
    }

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "notes.txt", "c.webp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("d.png")).unwrap();

        let names: Vec<_> = collect_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.webp"]);

        let err = collect_images(&dir.path().join("a.jpg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_generate_video_saves_mp4_and_script() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(FakeFactory::new().reply(ProviderId::DeepSeek, Reply::text(SCRIPT)));
        let studio = studio(&factory, dir.path());

        let mut request = VideoRequest::new("why rust");
        request.duration = Some(20);
        request.layout = Some(VideoLayout::Slideshow);
        let report = studio.generate_video(&request).await.unwrap();

        assert!(report.script_parsed);
        assert_eq!(std::fs::read(&report.video_path).unwrap(), b"fake mp4");
        let saved: VideoScript =
            serde_json::from_str(&std::fs::read_to_string(&report.script_path).unwrap()).unwrap();
        assert_eq!(saved, report.script);
        assert_eq!(files_in(&dir.path().join("videos")).len(), 2);

        let calls = factory.calls();
        assert_eq!(calls[1].kind, TaskKind::Video);
        match &calls[1].payload {
            Payload::Script { layout, script } => {
                assert_eq!(*layout, VideoLayout::Slideshow);
                assert_eq!(script.scenes.len(), 3);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_script_write_removes_video() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(FakeFactory::new().reply(ProviderId::DeepSeek, Reply::text(SCRIPT)));
        let studio = studio(&factory, dir.path());

        // Occupy the script names for the next few seconds with directories.
        let videos = dir.path().join("videos");
        let now = chrono::Local::now();
        for offset in 0..5 {
            let stamp = (now + chrono::Duration::seconds(offset)).format("%Y%m%d_%H%M%S");
            std::fs::create_dir_all(videos.join(format!("{}_Rust_in_20_seconds.json", stamp))).unwrap();
        }

        let mut request = VideoRequest::new("why rust");
        request.duration = Some(20);
        let err = studio.generate_video(&request).await.unwrap_err();

        assert!(matches!(err, MuseError::Output(_)), "{err}");
        let leftovers: Vec<_> = files_in(&videos).into_iter().filter(|p| p.is_file()).collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[tokio::test]
    async fn test_unparseable_script_becomes_one_scene() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(
            FakeFactory::new().reply(ProviderId::DeepSeek, Reply::text("A calm voice explains tides.")),
        );
        let studio = studio(&factory, dir.path());

        let report = studio.generate_video(&VideoRequest::new("tides")).await.unwrap();

        assert!(!report.script_parsed);
        assert_eq!(report.script.scenes[0].narration, "A calm voice explains tides.");
        assert_eq!(report.script.scenes[0].end_time, 30.0);
    }

    #[tokio::test]
    async fn test_duration_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(FakeFactory::new());
        let studio = studio(&factory, dir.path());

        let mut request = VideoRequest::new("tides");
        request.duration = Some(601);
        let err = studio.generate_video(&request).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(factory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_slideshow_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let pictures = dir.path().join("pictures");
        std::fs::create_dir(&pictures).unwrap();
        std::fs::write(pictures.join("1.png"), b"png").unwrap();
        std::fs::write(pictures.join("2.jpg"), b"jpg").unwrap();
        let factory = Arc::new(FakeFactory::new());
        let studio = studio(&factory, &dir.path().join("out"));

        let images = collect_images(&pictures).unwrap();
        let report = studio.create_slideshow(images, 2.5).await.unwrap();

        assert_eq!(report.images, 2);
        assert_eq!(report.duration_seconds, 5.0);
        assert_eq!(report.metadata.provider, ProviderId::Ffmpeg);
        assert!(report.path.to_str().unwrap().ends_with("_slideshow.mp4"));
    }
}
