//! Local video rendering with ffmpeg.
//!
//! Every scene (or image) is rendered to its own H.264 clip in a scratch
//! directory, then the clips are joined with the concat demuxer into a temporary
//! mp4 that is deleted when the returned asset is dropped.

use crate::config::ProviderConfig;
use crate::error::{MuseError, Result};
use crate::gateway::{
    GenerationOptions, GenerationRequest, GenerationResult, MediaAsset, MediaFormat, Output,
    Payload, Provider, ProviderId, Scene, VideoLayout, VideoScript,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const TEXT_BACKGROUND: &str = "0x323232";
const LABEL_FONT_SIZE: u32 = 60;
const CAPTION_FONT_SIZE: u32 = 30;

/// Output frame geometry and text size.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Canvas {
    width: u32,
    height: u32,
    fps: u32,
    font_size: u32,
}

impl Canvas {
    fn from_options(options: &GenerationOptions, fps: u32, font_size: u32) -> Self {
        Self {
            // libx264 with yuv420p needs even dimensions.
            width: even(options.width.unwrap_or(1920)),
            height: even(options.height.unwrap_or(1080)),
            fps: fps.max(1),
            font_size: font_size.max(8),
        }
    }

    fn size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Characters per line for text at `font_size`, leaving a margin.
    fn line_units(&self, font_size: u32) -> usize {
        let unit = font_size as f32 * 0.55;
        ((self.width as f32 * 0.85) / unit).max(10.0) as usize
    }
}

fn even(n: u32) -> u32 {
    let n = n.max(2);
    n - n % 2
}

pub struct FfmpegRenderer {
    model: String,
    ffmpeg: PathBuf,
    fps: u32,
    font_size: u32,
}

impl FfmpegRenderer {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            model: config.model.clone(),
            ffmpeg: config.render.ffmpeg_path.clone(),
            fps: config.render.fps,
            font_size: config.render.font_size,
        }
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let result = Command::new(&self.ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                Err(MuseError::provider(
                    ProviderId::Ffmpeg,
                    format!("ffmpeg failed ({}): {}", out.status, tail(&stderr, 600)),
                ))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(MuseError::unavailable(
                ProviderId::Ffmpeg,
                format!(
                    "'{}' not found; install ffmpeg or set video.ffmpeg_path",
                    self.ffmpeg.display()
                ),
            )),
            Err(e) => Err(MuseError::provider(
                ProviderId::Ffmpeg,
                format!("could not run ffmpeg: {}", e),
            )),
        }
    }

    async fn render_script(
        &self,
        script: &VideoScript,
        layout: VideoLayout,
        canvas: Canvas,
        scratch: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut parts = Vec::with_capacity(script.scenes.len());
        for (i, scene) in script.scenes.iter().enumerate() {
            let caption = scratch.join(format!("scene_{:03}.txt", i));
            let wrap_size = match layout {
                VideoLayout::Text => canvas.font_size,
                VideoLayout::Slideshow => CAPTION_FONT_SIZE,
            };
            tokio::fs::write(&caption, wrap_text(&scene.narration, canvas.line_units(wrap_size))).await?;

            let filter = match layout {
                VideoLayout::Text => text_filter(&caption, canvas),
                VideoLayout::Slideshow => {
                    let label = scratch.join(format!("label_{:03}.txt", i));
                    tokio::fs::write(&label, format!("Scene {}", i + 1)).await?;
                    card_filter(&label, &caption)
                }
            };
            let background = match layout {
                VideoLayout::Text => TEXT_BACKGROUND.to_string(),
                VideoLayout::Slideshow => card_color(i),
            };

            let part = scratch.join(format!("part_{:03}.mp4", i));
            self.run(&scene_args(scene, &background, &filter, canvas, &part)).await?;
            parts.push(part);
        }
        Ok(parts)
    }

    async fn render_images(
        &self,
        images: &[PathBuf],
        seconds: f64,
        canvas: Canvas,
        scratch: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut parts = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let part = scratch.join(format!("part_{:03}.mp4", i));
            self.run(&image_args(image, seconds, canvas, &part)).await?;
            parts.push(part);
        }
        Ok(parts)
    }

    async fn concat(&self, parts: &[PathBuf], scratch: &Path) -> Result<tempfile::TempPath> {
        let list = scratch.join("parts.txt");
        tokio::fs::write(&list, concat_list(parts)).await?;

        let output = tempfile::Builder::new()
            .prefix("muse_video_")
            .suffix(".mp4")
            .tempfile()?
            .into_temp_path();

        let args = vec![
            "-y".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            path_arg(&list),
            "-c".to_string(),
            "copy".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            path_arg(&output),
        ];
        self.run(&args).await?;
        Ok(output)
    }
}

#[async_trait]
impl Provider for FfmpegRenderer {
    fn id(&self) -> ProviderId {
        ProviderId::Ffmpeg
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
    ) -> Result<GenerationResult> {
        let canvas = Canvas::from_options(options, self.fps, self.font_size);
        let scratch = tempfile::tempdir()?;

        let parts = match request.payload() {
            Payload::Script { script, layout } => {
                self.render_script(script, *layout, canvas, scratch.path()).await?
            }
            Payload::Images {
                paths,
                seconds_per_image,
            } => {
                self.render_images(paths, *seconds_per_image, canvas, scratch.path())
                    .await?
            }
            _ => {
                return Err(MuseError::InvalidRequest(
                    "video rendering needs a script or images".to_string(),
                ))
            }
        };

        let video = self.concat(&parts, scratch.path()).await?;

        Ok(GenerationResult::new(
            request,
            ProviderId::Ffmpeg,
            &self.model,
            Output::Video(MediaAsset::from_temp_file(MediaFormat::Mp4, video)),
        ))
    }
}

fn scene_args(scene: &Scene, background: &str, filter: &str, canvas: Canvas, out: &Path) -> Vec<String> {
    let duration = format!("{:.3}", scene.duration());
    vec![
        "-y".to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!(
            "color=c={}:s={}:d={}:r={}",
            background,
            canvas.size(),
            duration,
            canvas.fps
        ),
        "-vf".to_string(),
        filter.to_string(),
        "-t".to_string(),
        duration,
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        path_arg(out),
    ]
}

fn image_args(image: &Path, seconds: f64, canvas: Canvas, out: &Path) -> Vec<String> {
    let (w, h) = (canvas.width, canvas.height);
    vec![
        "-y".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-t".to_string(),
        format!("{:.3}", seconds),
        "-i".to_string(),
        path_arg(image),
        "-vf".to_string(),
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={}",
            canvas.fps
        ),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        path_arg(out),
    ]
}

/// Narration centred on the frame.
fn text_filter(caption: &Path, canvas: Canvas) -> String {
    format!(
        "drawtext=textfile='{}':fontcolor=white:fontsize={}:line_spacing=12:x=(w-text_w)/2:y=(h-text_h)/2",
        escape_filter_value(caption),
        canvas.font_size
    )
}

/// Scene label in the upper third, caption in a box near the bottom.
fn card_filter(label: &Path, caption: &Path) -> String {
    format!(
        "drawtext=textfile='{}':fontcolor=white:fontsize={}:x=(w-text_w)/2:y=h/3-text_h/2,\
         drawtext=textfile='{}':fontcolor=white:fontsize={}:line_spacing=8:box=1:boxcolor=black@0.45:boxborderw=16:x=(w-text_w)/2:y=h-text_h-80",
        escape_filter_value(label),
        LABEL_FONT_SIZE,
        escape_filter_value(caption),
        CAPTION_FONT_SIZE
    )
}

/// Card colour for scene `index`, cycling through a blue-ish palette.
fn card_color(index: usize) -> String {
    let i = index as u32;
    let r = (100 + i * 30) % 256;
    let g = (150 + i * 20) % 256;
    let b = (200 + i * 10) % 256;
    format!("0x{:02x}{:02x}{:02x}", r, g, b)
}

/// Escape a value placed inside single quotes in a filter graph.
fn escape_filter_value(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

/// Input list for the concat demuxer.
fn concat_list(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Display width of a character in half-width units.
fn char_units(c: char) -> usize {
    match c as u32 {
        0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60 | 0xFFE0..=0xFFE6 => 2,
        _ => 1,
    }
}

/// Wrap text into lines of at most `max_units` half-width units.
///
/// Breaks on whitespace where possible and inside words (or CJK runs) otherwise.
fn wrap_text(text: &str, max_units: usize) -> String {
    let max_units = max_units.max(1);
    let mut lines: Vec<String> = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut used = 0;

        for word in paragraph.split_whitespace() {
            let word_units: usize = word.chars().map(char_units).sum();
            let sep = usize::from(!line.is_empty());

            if used + sep + word_units <= max_units {
                if sep == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                used += sep + word_units;
                continue;
            }

            if word_units <= max_units {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
                used = word_units;
                continue;
            }

            // Longer than a line: split by character.
            if !line.is_empty() {
                line.push(' ');
                used += 1;
            }
            for c in word.chars() {
                let units = char_units(c);
                if used + units > max_units && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    used = 0;
                }
                line.push(c);
                used += units;
            }
        }

        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn tail(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        trimmed.to_string()
    } else {
        trimmed.chars().skip(count - max_chars).collect()
    }
}
