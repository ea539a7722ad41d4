//! Speech-to-text through the OpenAI audio API.

use super::{classify_openai_error, require_credential};
use crate::config::ProviderConfig;
use crate::error::{MuseError, Result};
use crate::gateway::{
    GenerationOptions, GenerationRequest, GenerationResult, Output, Payload, Provider, ProviderId,
};
use crate::openai::create_client;
use crate::transcription::{Transcript, TranscriptSegment};
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use std::path::Path;

pub struct WhisperProvider {
    model: String,
    client: Client<OpenAIConfig>,
}

impl WhisperProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let credential = require_credential(config)?;
        let client = create_client(credential, config.base_url.as_ref(), config.timeout)?;

        Ok(Self {
            model: config.model.clone(),
            client,
        })
    }
}

/// ISO-639-1 hint for the API. `auto` and blank mean let the model detect it.
fn language_hint(options: &GenerationOptions) -> Option<&str> {
    options
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("auto"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio.mp3")
        .to_string()
}

#[async_trait]
impl Provider for WhisperProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
    ) -> Result<GenerationResult> {
        let Payload::Audio(path) = request.payload() else {
            return Err(MuseError::InvalidRequest(
                "transcription needs an audio file".to_string(),
            ));
        };

        let bytes = tokio::fs::read(path).await?;
        let name = file_name(path);

        let mut builder = CreateTranscriptionRequestArgs::default();
        builder
            .file(AudioInput::from_vec_u8(name.clone(), bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);
        if let Some(language) = language_hint(options) {
            builder.language(language);
        }
        let api_request = builder
            .build()
            .map_err(|e| classify_openai_error(ProviderId::OpenAi, e))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(api_request)
            .await
            .map_err(|e| classify_openai_error(ProviderId::OpenAi, e))?;

        let segments: Vec<TranscriptSegment> = match response.segments {
            Some(segs) if !segs.is_empty() => segs
                .iter()
                .map(|s| TranscriptSegment::new(s.start as f64, s.end as f64, s.text.trim()))
                .collect(),
            _ => vec![TranscriptSegment::new(
                0.0,
                response.duration as f64,
                response.text.trim(),
            )],
        };

        let transcript = Transcript::new(name, segments)
            .with_full_text(response.text.trim())
            .with_language(response.language)
            .with_duration(response.duration as f64);

        Ok(GenerationResult::new(
            request,
            ProviderId::OpenAi,
            &self.model,
            Output::Transcript(transcript),
        ))
    }
}
