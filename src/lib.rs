//! Muse - AI content studio
//!
//! Writes articles and fiction, transcribes and summarises recordings, renders
//! narrated videos, generates images and analyses prompts. Every model call goes
//! through one provider gateway, so the text, transcription, image and video
//! backends can be swapped from configuration.
//!
//! # Architecture
//!
//! - `config` - Settings, credentials, provider selection and prompt templates
//! - `gateway` - Provider-agnostic request/response types and the provider implementations
//! - `studio` - The content operations built on the gateway
//! - `output_store` - Timestamped files under the output directory
//! - `transcription` - Transcript model and export formats
//! - `cli` - Command line, interactive menu and browser UI
//!
//! # Example
//!
//! ```rust,no_run
//! use muse::config::{Credentials, Settings};
//! use muse::studio::{ArticleRequest, Studio};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let studio = Studio::from_settings(&settings, &Credentials::from_env()?)?;
//!
//!     let article = studio.write_article(&ArticleRequest::new("tide pools")).await?;
//!     println!("Saved {}", article.path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod openai;
pub mod output_store;
pub mod studio;
pub mod transcription;

pub use error::{MuseError, Result};
