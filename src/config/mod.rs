//! Configuration module for Muse.
//!
//! Handles application settings, provider credentials and prompt templates.

mod prompts;
mod providers;
mod settings;

pub use prompts::{
    vars, ImagePrompts, PromptingPrompts, Prompts, SpeechPrompts, VideoPrompts, WritingPrompts,
};
pub use providers::{Credential, Credentials, GatewayConfig, ProviderConfig, RenderSettings};
pub use settings::{
    GeneralSettings, ImageSettings, PromptSettings, ServerSettings, Settings, TextSettings,
    TranscriptionSettings, VideoSettings,
};
