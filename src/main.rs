//! Muse CLI entry point.

use anyhow::Result;
use clap::Parser;
use muse::cli::{commands, Cli, Commands, Output};
use muse::config::{Credentials, Settings};
use muse::error::MuseError;
use muse::studio::{
    ArticleRequest, AudioRequest, ChapterRequest, ImageRequest, OptimizeRequest, OutlineRequest,
    Studio, VideoRequest,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        match e.downcast_ref::<MuseError>() {
            Some(err) => Output::failure(err),
            None => Output::error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("muse={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;
    let credentials = Credentials::from_env()?;

    // Commands that work without providers.
    match &cli.command {
        Some(Commands::Doctor) => {
            let path = config_path.unwrap_or_else(Settings::default_config_path);
            return commands::run_doctor(&settings, &credentials, &path);
        }
        Some(Commands::Config { action }) => {
            return commands::run_config(action, settings, config_path);
        }
        _ => {}
    }

    let studio = Studio::from_settings(&settings, &credentials)?;
    for (kind, provider) in studio.gateway().config().missing_credentials() {
        let var = provider.credential_env().unwrap_or("API key");
        Output::warning(&format!(
            "{} is not set; {} operations will fail (provider {}).",
            var, kind, provider
        ));
    }

    match cli.command {
        None | Some(Commands::Interactive) => {
            commands::run_interactive(&studio).await?;
        }

        Some(Commands::Article { topic, style, length, language }) => {
            let request = ArticleRequest { topic, style, length, language };
            commands::run_article(request, &studio).await?;
        }

        Some(Commands::Novel { plot, characters, setting, chapter, language }) => {
            let request = ChapterRequest { plot, characters, setting, chapter, language };
            commands::run_novel(request, &studio).await?;
        }

        Some(Commands::Outline { theme, genre, length, language }) => {
            let request = OutlineRequest { theme, genre, length, language };
            commands::run_outline(request, &studio).await?;
        }

        Some(Commands::Audio { path, language, summary, export }) => {
            let mut request = AudioRequest::new(path);
            request.language = language;
            request.summary = summary;
            commands::run_audio(request, export, &studio).await?;
        }

        Some(Commands::Video { prompt, style, duration, layout }) => {
            let mut request = VideoRequest::new(prompt);
            request.style = style;
            request.duration = duration;
            request.layout = layout;
            commands::run_video(request, &studio).await?;
        }

        Some(Commands::Slideshow { dir, seconds }) => {
            commands::run_slideshow(&dir, seconds, &studio).await?;
        }

        Some(Commands::Image { prompt, style, width, height, count, no_optimize }) => {
            let mut request = ImageRequest::new(prompt);
            request.style = style;
            request.width = width;
            request.height = height;
            request.count = count;
            request.optimize = no_optimize.then_some(false);
            commands::run_image(request, &studio).await?;
        }

        Some(Commands::Optimize { prompt, goal, domain, variations }) => {
            let mut request = OptimizeRequest::new(prompt);
            request.goal = goal;
            request.domain = domain;
            commands::run_optimize(request, variations, &studio).await?;
        }

        Some(Commands::Serve { host, port }) => {
            let host = host.unwrap_or_else(|| settings.server.host.clone());
            let port = port.unwrap_or(settings.server.port);
            commands::run_serve(&host, port, studio, &settings).await?;
        }

        Some(Commands::Doctor) | Some(Commands::Config { .. }) => {}
    }

    Ok(())
}
