//! Interactive menu.

use super::{run_article, run_audio, run_image, run_novel, run_optimize, run_outline, run_slideshow, run_video};
use crate::cli::Output;
use crate::error::MuseError;
use crate::studio::{
    ArticleRequest, AudioRequest, ChapterRequest, ImageRequest, OptimizeRequest, OutlineRequest,
    Studio, StructuredPrompt, VideoRequest,
};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Article,
    Chapter,
    Outline,
    Audio,
    Video,
    Slideshow,
    Image,
    Optimize,
    Structured,
    Exit,
}

const MENU: [(&str, MenuItem); 10] = [
    ("1", MenuItem::Article),
    ("2", MenuItem::Chapter),
    ("3", MenuItem::Outline),
    ("4", MenuItem::Audio),
    ("5", MenuItem::Video),
    ("6", MenuItem::Slideshow),
    ("7", MenuItem::Image),
    ("8", MenuItem::Optimize),
    ("9", MenuItem::Structured),
    ("0", MenuItem::Exit),
];

impl MenuItem {
    fn label(&self) -> &'static str {
        match self {
            MenuItem::Article => "Write an article",
            MenuItem::Chapter => "Write a novel chapter",
            MenuItem::Outline => "Outline a story",
            MenuItem::Audio => "Transcribe and summarise audio",
            MenuItem::Video => "Create a video",
            MenuItem::Slideshow => "Slideshow from images",
            MenuItem::Image => "Generate images",
            MenuItem::Optimize => "Optimize a prompt",
            MenuItem::Structured => "Build a structured prompt",
            MenuItem::Exit => "Exit",
        }
    }

    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        MENU.iter().find(|(key, _)| *key == input).map(|(_, item)| *item)
    }
}

/// Run the interactive menu until the user picks 0 or closes stdin.
pub async fn run_interactive(studio: &Studio) -> Result<()> {
    println!("\n{}", style("Muse").bold().cyan());
    println!("{}", style("Pick an operation by number. 0 exits.").dim());

    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        println!();
        for (key, item) in MENU {
            println!("  {} {}", style(key).cyan().bold(), item.label());
        }

        let Some(choice) = ask(&mut input, "Choice", None)? else {
            break;
        };
        let Some(item) = MenuItem::parse(&choice) else {
            Output::warning(&format!("'{}' is not on the menu.", choice));
            continue;
        };
        if item == MenuItem::Exit {
            break;
        }

        if let Err(e) = run_item(item, &mut input, studio).await {
            match e.downcast_ref::<MuseError>() {
                Some(err) => Output::failure(err),
                None => Output::error(&e.to_string()),
            }
        }
    }

    Output::info("Goodbye!");
    Ok(())
}

async fn run_item<R: BufRead>(item: MenuItem, input: &mut R, studio: &Studio) -> Result<()> {
    match item {
        MenuItem::Article => {
            let topic = required(input, "Topic")?;
            let mut request = ArticleRequest::new(topic);
            request.style = choose(input, "Style", "informative")?;
            request.length = choose(input, "Length (short/medium/long)", "medium")?;
            request.language = optional(input, "Language")?;
            run_article(request, studio).await
        }
        MenuItem::Chapter => {
            let request = ChapterRequest {
                plot: required(input, "Plot")?,
                characters: optional(input, "Characters")?,
                setting: optional(input, "Setting")?,
                chapter: choose(input, "Chapter number", "1")?,
                language: optional(input, "Language")?,
            };
            run_novel(request, studio).await
        }
        MenuItem::Outline => {
            let request = OutlineRequest {
                theme: required(input, "Theme")?,
                genre: choose(input, "Genre", "contemporary")?,
                length: choose(input, "Length", "novella")?,
                language: optional(input, "Language")?,
            };
            run_outline(request, studio).await
        }
        MenuItem::Audio => {
            let mut request = AudioRequest::new(required(input, "Audio file")?);
            request.language = optional(input, "Language code")?;
            request.summary = choose(input, "Summary (brief/detailed/key_points/meeting_minutes)", "detailed")?;
            run_audio(request, None, studio).await
        }
        MenuItem::Video => {
            let mut request = VideoRequest::new(required(input, "What is the video about")?);
            request.style = Some(choose(input, "Style", &studio.defaults().video_style.to_string())?);
            request.duration = Some(choose(
                input,
                "Duration in seconds",
                &studio.defaults().video_duration.to_string(),
            )?);
            request.layout = Some(choose(input, "Layout (text/slideshow)", &studio.defaults().video_layout.to_string())?);
            run_video(request, studio).await
        }
        MenuItem::Slideshow => {
            let dir = required(input, "Image directory")?;
            let seconds: f64 = choose(input, "Seconds per image", "3")?;
            run_slideshow(&dir, seconds, studio).await
        }
        MenuItem::Image => {
            let mut request = ImageRequest::new(required(input, "Description")?);
            request.style = Some(choose(input, "Style", &studio.defaults().image_style.to_string())?);
            request.count = choose(input, "How many (1-4)", "1")?;
            request.optimize = Some(choose::<_, YesNo>(input, "Rewrite the prompt first (y/n)", "y")?.0);
            run_image(request, studio).await
        }
        MenuItem::Optimize => {
            let mut request = OptimizeRequest::new(required(input, "Prompt")?);
            request.goal = choose(input, "Goal", "comprehensive")?;
            request.domain = choose(input, "Domain", "general")?;
            run_optimize(request, None, studio).await
        }
        MenuItem::Structured => {
            let mut prompt = StructuredPrompt::new(required(input, "Task")?);
            prompt.role = optional(input, "Role")?;
            prompt.output_format = optional(input, "Output format")?;
            while let Some(constraint) = optional(input, "Constraint (empty to finish)")? {
                prompt.constraints.push(constraint);
            }
            while let Some(example) = optional(input, "Example (empty to finish)")? {
                prompt.examples.push(example);
            }
            Output::header("Structured prompt");
            println!("\n{}\n", prompt.render());
            Ok(())
        }
        MenuItem::Exit => Ok(()),
    }
}

/// Read one line. `None` at end of input.
fn ask<R: BufRead>(input: &mut R, label: &str, default: Option<&str>) -> Result<Option<String>> {
    match default {
        Some(d) if !d.is_empty() => print!("{} [{}]: ", style(label).green().bold(), d),
        _ => print!("{}: ", style(label).green().bold()),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let line = line.trim();
    Ok(Some(match (line.is_empty(), default) {
        (true, Some(d)) => d.to_string(),
        _ => line.to_string(),
    }))
}

fn required<R: BufRead>(input: &mut R, label: &str) -> Result<String> {
    match ask(input, label, None)? {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(MuseError::InvalidRequest(format!("{} is required", label.to_lowercase())).into()),
    }
}

fn optional<R: BufRead>(input: &mut R, label: &str) -> Result<Option<String>> {
    Ok(ask(input, label, None)?.filter(|v| !v.is_empty()))
}

fn choose<R: BufRead, T: FromStr>(input: &mut R, label: &str, default: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let value = ask(input, label, Some(default))?.unwrap_or_else(|| default.to_string());
    value
        .parse()
        .map_err(|e: T::Err| MuseError::InvalidRequest(format!("{}: {}", label, e)).into())
}

struct YesNo(bool);

impl FromStr for YesNo {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(YesNo(true)),
            "n" | "no" => Ok(YesNo(false)),
            _ => Err(format!("expected y or n, got '{}'", s)),
        }
    }
}
