//! CLI command implementations.

mod audio;
mod config;
mod doctor;
mod image;
mod interactive;
mod optimize;
mod serve;
mod video;
mod write;

pub use audio::run_audio;
pub use config::run_config;
pub use doctor::run_doctor;
pub use image::run_image;
pub use interactive::run_interactive;
pub use optimize::run_optimize;
pub use serve::run_serve;
pub use video::{run_slideshow, run_video};
pub use write::{run_article, run_novel, run_outline};
