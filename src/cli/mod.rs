//! CLI module for Muse.

pub mod commands;
mod output;

pub use output::{format_duration, Output};

use crate::gateway::{Length, VideoLayout};
use crate::studio::{ArticleStyle, Domain, ImageStyle, OptimizationGoal, SummaryKind, VideoStyle};
use crate::transcription::OutputFormat;
use clap::{Parser, Subcommand};

/// Muse - AI content studio
///
/// Write articles and fiction, summarise recordings, render narrated videos,
/// generate images and sharpen prompts, from the terminal or a local web page.
/// Run without a command for the interactive menu.
#[derive(Parser, Debug)]
#[command(name = "muse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an article on a topic
    Article {
        topic: String,

        /// informative, narrative, persuasive, technical or casual
        #[arg(short, long, default_value = "informative")]
        style: ArticleStyle,

        /// short, medium or long
        #[arg(short, long, default_value = "medium")]
        length: Length,

        /// Language to write in (defaults to the topic's language)
        #[arg(long)]
        language: Option<String>,
    },

    /// Write one chapter of a novel
    Novel {
        /// What happens in the chapter
        plot: String,

        #[arg(long)]
        characters: Option<String>,

        #[arg(long)]
        setting: Option<String>,

        /// Chapter number
        #[arg(long, default_value = "1")]
        chapter: u32,

        #[arg(long)]
        language: Option<String>,
    },

    /// Outline a novel
    Outline {
        theme: String,

        #[arg(short, long, default_value = "contemporary")]
        genre: String,

        /// Free-form length, e.g. "short story" or "novel"
        #[arg(short, long, default_value = "novella")]
        length: String,

        #[arg(long)]
        language: Option<String>,
    },

    /// Transcribe an audio file and summarise it
    Audio {
        /// Local audio file (mp3, wav, m4a, ...; at most 25 MB)
        path: String,

        /// Spoken language as an ISO-639-1 code (default from config)
        #[arg(long)]
        language: Option<String>,

        /// brief, detailed, key_points or meeting_minutes
        #[arg(short, long, default_value = "detailed")]
        summary: SummaryKind,

        /// Also write the transcript as text, json, srt or vtt next to the report
        #[arg(long)]
        export: Option<OutputFormat>,
    },

    /// Write a script and render it as a video
    Video {
        prompt: String,

        /// educational, marketing, story, explainer or social
        #[arg(short, long)]
        style: Option<VideoStyle>,

        /// Length in seconds
        #[arg(short, long)]
        duration: Option<u32>,

        /// text or slideshow
        #[arg(long)]
        layout: Option<VideoLayout>,
    },

    /// Turn a directory of images into a video
    Slideshow {
        /// Directory with jpg, jpeg, png or webp files
        dir: String,

        /// Seconds each image stays on screen
        #[arg(short, long, default_value = "3")]
        seconds: f64,
    },

    /// Generate images from a description
    Image {
        prompt: String,

        /// realistic, anime, oil_painting, watercolor, sketch, cartoon, scifi or dreamy
        #[arg(short, long)]
        style: Option<ImageStyle>,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        /// Number of images (1-4)
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Send the prompt as written, without rewriting it first
        #[arg(long)]
        no_optimize: bool,
    },

    /// Analyse and improve a prompt
    Optimize {
        prompt: String,

        /// comprehensive, clarity, specificity, structure or actionability
        #[arg(short, long, default_value = "comprehensive")]
        goal: OptimizationGoal,

        /// general, writing, analysis, creative, technical, education or marketing
        #[arg(short, long, default_value = "general")]
        domain: Domain,

        /// Also write this many variations of the prompt
        #[arg(long)]
        variations: Option<u32>,
    },

    /// Numbered menu for every operation
    Interactive,

    /// Start the browser UI
    Serve {
        /// Host to bind to (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check credentials, ffmpeg and directories
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
