//! Transcript export formats (plain text, JSON, SRT, VTT).

use super::Transcript;
use serde::Serialize;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Srt,
    Vtt,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" | "webvtt" => Ok(OutputFormat::Vtt),
            _ => Err(format!("Unknown format: {}. Use text, json, srt, or vtt.", s)),
        }
    }
}

/// JSON shape of an exported transcript.
#[derive(Debug, Serialize)]
pub struct TranscriptExport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub duration_seconds: f64,
    pub text: String,
    pub segments: Vec<SegmentExport>,
}

#[derive(Debug, Serialize)]
pub struct SegmentExport {
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl From<&Transcript> for TranscriptExport {
    fn from(transcript: &Transcript) -> Self {
        Self {
            source: transcript.source.clone(),
            language: transcript.language.clone(),
            duration_seconds: transcript.duration_seconds,
            text: transcript.full_text.clone(),
            segments: transcript
                .segments
                .iter()
                .map(|s| SegmentExport {
                    text: s.text.clone(),
                    start_seconds: s.start_seconds,
                    end_seconds: s.end_seconds,
                })
                .collect(),
        }
    }
}

/// Render a transcript in the given format.
pub fn format_transcript(transcript: &Transcript, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => transcript.full_text.clone(),
        OutputFormat::Json => format_json(transcript),
        OutputFormat::Srt => format_cues(transcript, None, ','),
        OutputFormat::Vtt => format_cues(transcript, Some("WEBVTT\n\n"), '.'),
    }
}

fn format_json(transcript: &Transcript) -> String {
    let export = TranscriptExport::from(transcript);
    serde_json::to_string_pretty(&export).unwrap_or_else(|_| "{}".to_string())
}

/// Numbered cues; SRT and VTT only differ in header and millisecond separator.
fn format_cues(transcript: &Transcript, header: Option<&str>, ms_sep: char) -> String {
    let mut output = header.unwrap_or_default().to_string();

    for (i, segment) in transcript.segments.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            cue_timestamp(segment.start_seconds, ms_sep),
            cue_timestamp(segment.end_seconds, ms_sep)
        ));
        output.push_str(&segment.text);
        output.push_str("\n\n");
    }

    output
}

/// `HH:MM:SS<sep>mmm`
fn cue_timestamp(seconds: f64, ms_sep: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;

    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, ms_sep, ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::TranscriptSegment;

    fn sample_transcript() -> Transcript {
        Transcript::new(
            "talk.wav",
            vec![
                TranscriptSegment::new(0.0, 2.5, "Hello world."),
                TranscriptSegment::new(2.5, 5.0, "This is a test."),
            ],
        )
        .with_language("en")
    }

    #[test]
    fn test_format_json() {
        let json = format_transcript(&sample_transcript(), OutputFormat::Json);
        assert!(json.contains("\"source\": \"talk.wav\""));
        assert!(json.contains("\"language\": \"en\""));
        assert!(json.contains("Hello world."));
    }

    #[test]
    fn test_format_srt() {
        let srt = format_transcript(&sample_transcript(), OutputFormat::Srt);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,500"));
        assert!(srt.contains("2\n00:00:02,500 --> 00:00:05,000\nThis is a test."));
    }

    #[test]
    fn test_format_vtt() {
        let vtt = format_transcript(&sample_transcript(), OutputFormat::Vtt);
        assert!(vtt.starts_with("WEBVTT\n\n1\n"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:02.500"));
    }

    #[test]
    fn test_format_text() {
        let text = format_transcript(&sample_transcript(), OutputFormat::Text);
        assert_eq!(text, "Hello world. This is a test.");
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("SRT".parse::<OutputFormat>().unwrap(), OutputFormat::Srt);
        assert_eq!("webvtt".parse::<OutputFormat>().unwrap(), OutputFormat::Vtt);
        assert!("docx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_cue_timestamp() {
        assert_eq!(cue_timestamp(0.0, ','), "00:00:00,000");
        assert_eq!(cue_timestamp(61.5, ','), "00:01:01,500");
        assert_eq!(cue_timestamp(3661.123, '.'), "01:01:01.123");
    }
}
