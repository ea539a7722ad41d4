//! Video and slideshow commands.

use crate::cli::{format_duration, Output};
use crate::studio::{collect_images, Studio, VideoRequest};
use anyhow::Result;
use std::path::Path;

/// Run the video command.
pub async fn run_video(request: VideoRequest, studio: &Studio) -> Result<()> {
    Output::info(&format!("Creating a video about '{}'", request.prompt));
    let spinner = Output::spinner("Writing the script and rendering...");
    let report = studio.generate_video(&request).await;
    spinner.finish_and_clear();
    let report = report?;

    if !report.script_parsed {
        Output::warning("The script was not valid JSON; rendered the reply as a single scene.");
    }

    Output::header(&report.script.title);
    Output::kv("Layout", &report.layout.to_string());
    Output::kv("Scenes", &report.script.scenes.len().to_string());
    Output::kv("Length", &format_duration(report.script.duration));
    for (i, scene) in report.script.scenes.iter().enumerate() {
        Output::list_item(&format!(
            "{} [{:.0}s - {:.0}s] {}",
            i + 1,
            scene.start_time,
            scene.end_time,
            scene.narration
        ));
    }
    Output::saved(&report.video_path);
    Output::saved(&report.script_path);
    Ok(())
}

/// Run the slideshow command.
pub async fn run_slideshow(dir: &str, seconds: f64, studio: &Studio) -> Result<()> {
    let images = collect_images(Path::new(dir))?;
    if images.is_empty() {
        Output::warning(&format!("No jpg, jpeg, png or webp files in {}", dir));
        return Ok(());
    }
    Output::info(&format!("Building a slideshow from {} images", images.len()));

    let spinner = Output::spinner("Rendering...");
    let report = studio.create_slideshow(images, seconds).await;
    spinner.finish_and_clear();
    let report = report?;

    Output::kv("Length", &format_duration(report.duration_seconds));
    Output::saved(&report.path);
    Ok(())
}
