//! Transcribe a recording and summarise it.

use super::{language_or_default, Studio};
use crate::config::vars;
use crate::error::Result;
use crate::gateway::{GenerationOptions, GenerationRequest, ResultMetadata};
use crate::output_store::OutputKind;
use crate::transcription::{format_timestamp, Transcript};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Token budget for a summary.
const SUMMARY_MAX_TOKENS: u32 = 1500;

/// Shape of the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    Brief,
    #[default]
    Detailed,
    KeyPoints,
    MeetingMinutes,
}

impl std::str::FromStr for SummaryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "brief" => Ok(SummaryKind::Brief),
            "detailed" => Ok(SummaryKind::Detailed),
            "key_points" | "keypoints" => Ok(SummaryKind::KeyPoints),
            "meeting" | "meeting_minutes" => Ok(SummaryKind::MeetingMinutes),
            _ => Err(format!(
                "Unknown summary type: {}. Use brief, detailed, key_points, or meeting_minutes.",
                s
            )),
        }
    }
}

impl std::fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryKind::Brief => write!(f, "brief"),
            SummaryKind::Detailed => write!(f, "detailed"),
            SummaryKind::KeyPoints => write!(f, "key_points"),
            SummaryKind::MeetingMinutes => write!(f, "meeting_minutes"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioRequest {
    pub path: PathBuf,
    /// Spoken language; the configured default when absent.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub summary: SummaryKind,
}

impl AudioRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            language: None,
            summary: SummaryKind::default(),
        }
    }
}

/// Transcript, summary and the saved report.
#[derive(Debug, Clone, Serialize)]
pub struct AudioReport {
    pub transcript: Transcript,
    pub summary: String,
    pub summary_kind: SummaryKind,
    pub path: PathBuf,
    pub transcription: ResultMetadata,
    pub summarizer: ResultMetadata,
}

impl Studio {
    /// Transcribe an audio file, summarise the transcript and save a markdown report.
    #[instrument(skip(self, request), fields(path = %request.path.display(), summary = %request.summary))]
    pub async fn process_audio(&self, request: &AudioRequest) -> Result<AudioReport> {
        let language = request
            .language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.defaults.transcription_language)
            .to_string();

        let result = self
            .gateway
            .generate(
                &GenerationRequest::transcription(&request.path)
                    .with_options(GenerationOptions::default().with_language(language.clone())),
            )
            .await?;
        let transcription = result.metadata.clone();
        let transcript = result.into_transcript()?;
        info!(
            segments = transcript.segments.len(),
            words = transcript.word_count(),
            "Transcribed {}",
            request.path.display()
        );

        let summary_language = transcript.language.clone().unwrap_or(language);
        let template = match request.summary {
            SummaryKind::Brief => &self.prompts.speech.brief,
            SummaryKind::Detailed => &self.prompts.speech.detailed,
            SummaryKind::KeyPoints => &self.prompts.speech.key_points,
            SummaryKind::MeetingMinutes => &self.prompts.speech.meeting_minutes,
        };
        let prompt = self.prompts.render_with_custom(
            template,
            &vars([
                ("text", transcript.full_text.clone()),
                ("language", language_or_default(Some(&summary_language))),
            ]),
        );
        let summary = self
            .generate_text(
                prompt,
                GenerationOptions::default().with_max_tokens(SUMMARY_MAX_TOKENS),
            )
            .await?;

        let report = render_report(&request.path, &transcript, request.summary, &summary.text);
        let path = self
            .store
            .save_text(OutputKind::Audio, &report_title(&request.path), "md", &report)
            .await?;
        info!("Saved {}", path.display());

        Ok(AudioReport {
            transcript,
            summary: summary.text,
            summary_kind: request.summary,
            path,
            transcription,
            summarizer: summary.metadata,
        })
    }
}

fn report_title(audio: &Path) -> String {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    format!("{}_transcript", stem)
}

fn render_report(audio: &Path, transcript: &Transcript, kind: SummaryKind, summary: &str) -> String {
    let file_name = audio
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut out = format!("# Transcript: {}\n\n## Basic information\n", file_name);
    out.push_str(&format!("- **File**: {}\n", file_name));
    out.push_str(&format!(
        "- **Language**: {}\n",
        transcript.language.as_deref().unwrap_or("unknown")
    ));
    out.push_str(&format!(
        "- **Duration**: {}\n",
        format_timestamp(transcript.duration_seconds)
    ));
    out.push_str(&format!(
        "- **Processed**: {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    out.push_str(&format!("## Summary ({})\n\n{}\n\n", kind, summary.trim()));
    out.push_str(&format!("## Full text\n\n{}\n\n", transcript.full_text.trim()));

    if !transcript.segments.is_empty() {
        out.push_str("## Timestamped segments\n\n");
        out.push_str(&transcript.format_with_timestamps());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::gateway::testing::{FakeFactory, Reply};
    use crate::gateway::{Payload, ProviderId, TaskKind};
    use crate::studio::test_support::{files_in, studio};
    use std::sync::Arc;

    fn audio_file(dir: &Path) -> PathBuf {
        let path = dir.join("standup.mp3");
        std::fs::write(&path, b"ID3 fake audio").unwrap();
        path
    }

    #[test]
    fn test_summary_kind_parse() {
        assert_eq!("meeting".parse::<SummaryKind>().unwrap(), SummaryKind::MeetingMinutes);
        assert_eq!("key-points".parse::<SummaryKind>().unwrap(), SummaryKind::KeyPoints);
        assert!("haiku".parse::<SummaryKind>().is_err());
    }

    #[test]
    fn test_report_title() {
        assert_eq!(report_title(Path::new("/tmp/standup.mp3")), "standup_transcript");
    }

    #[tokio::test]
    async fn test_process_audio_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let audio = audio_file(dir.path());
        let factory = Arc::new(
            FakeFactory::new()
                .reply(ProviderId::OpenAi, Reply::transcript("we shipped the release"))
                .reply(ProviderId::DeepSeek, Reply::text("The team shipped.")),
        );
        let studio = studio(&factory, &dir.path().join("out"));

        let mut request = AudioRequest::new(&audio);
        request.summary = SummaryKind::Brief;
        let report = studio.process_audio(&request).await.unwrap();

        assert_eq!(report.summary, "The team shipped.");
        assert_eq!(report.transcription.provider, ProviderId::OpenAi);
        let saved = std::fs::read_to_string(&report.path).unwrap();
        assert!(saved.contains("## Summary (brief)\n\nThe team shipped."));
        assert!(saved.contains("we shipped the release and that is all"));
        assert!(saved.contains("[00:00 - 00:02] we shipped the release"));
        assert!(report.path.to_str().unwrap().ends_with("_standup_transcript.md"));

        let calls = factory.calls();
        assert_eq!(calls[0].kind, TaskKind::Transcription);
        assert_eq!(calls[0].options.language.as_deref(), Some("zh"));
        match &calls[1].payload {
            Payload::Text(prompt) => assert!(prompt.contains("we shipped the release")),
            other => panic!("unexpected payload {other:?}"),
        }
        assert_eq!(calls[1].options.max_tokens, Some(SUMMARY_MAX_TOKENS));
    }

    #[tokio::test]
    async fn test_summary_failure_fails_and_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let audio = audio_file(dir.path());
        let factory = Arc::new(
            FakeFactory::new().reply(ProviderId::DeepSeek, Reply::Unavailable("down".into())),
        );
        let out = dir.path().join("out");
        let studio = studio(&factory, &out);

        let err = studio.process_audio(&AudioRequest::new(&audio)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert!(files_in(&out.join("audio")).is_empty());
    }

    #[tokio::test]
    async fn test_missing_audio_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(FakeFactory::new());
        let studio = studio(&factory, dir.path());

        let err = studio
            .process_audio(&AudioRequest::new(dir.path().join("nope.wav")))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(factory.calls().is_empty());
    }
}
