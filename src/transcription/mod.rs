//! Transcripts produced by speech-to-text providers, and their export formats.

mod format;
mod models;

pub use format::{format_transcript, OutputFormat, SegmentExport, TranscriptExport};
pub use models::{format_timestamp, Transcript, TranscriptSegment};
