//! Audio command: transcribe, summarise, report.

use crate::cli::{format_duration, Output};
use crate::studio::{AudioRequest, Studio};
use crate::transcription::{format_transcript, OutputFormat};
use anyhow::{Context, Result};

/// Run the audio command.
pub async fn run_audio(request: AudioRequest, export: Option<OutputFormat>, studio: &Studio) -> Result<()> {
    Output::info(&format!("Processing: {}", request.path.display()));
    let spinner = Output::spinner("Transcribing and summarising...");
    let report = studio.process_audio(&request).await;
    spinner.finish_and_clear();
    let report = report?;

    Output::header("Transcript");
    Output::kv("Language", report.transcript.language.as_deref().unwrap_or("unknown"));
    Output::kv("Duration", &format_duration(report.transcript.duration_seconds));
    Output::kv("Segments", &report.transcript.segments.len().to_string());
    Output::kv("Words", &report.transcript.word_count().to_string());

    Output::header(&format!("Summary ({})", report.summary_kind));
    Output::preview(&report.summary, 1200);
    Output::generated_by(&report.summarizer);
    Output::saved(&report.path);

    if let Some(format) = export {
        let path = report.path.with_extension(format.extension());
        tokio::fs::write(&path, format_transcript(&report.transcript, format))
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Output::saved(&path);
    }

    Ok(())
}
