//! Data models for transcription.

use serde::{Deserialize, Serialize};

/// Source information attached to a transcribed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// URL of the video the text came from.
    pub source: String,
    /// Video title, when known.
    pub title: Option<String>,
    /// Index of the audio piece this text was transcribed from.
    pub chunk: usize,
    /// Start of the covered audio, in seconds from the beginning of the video.
    pub start_seconds: f64,
    /// End of the covered audio, in seconds.
    pub end_seconds: f64,
}

impl DocumentMetadata {
    /// Watch URL that starts playback where this text begins.
    pub fn timestamp_url(&self) -> String {
        let sep = if self.source.contains('?') { '&' } else { '?' };
        format!("{}{}t={}s", self.source, sep, self.start_seconds as u32)
    }
}

/// A unit of transcribed text. Immutable once produced by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// Concatenate document texts in order, separated by blank lines.
pub fn join_documents(docs: &[Document]) -> String {
    docs.iter()
        .map(|d| d.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str, start: f64) -> DocumentMetadata {
        DocumentMetadata {
            source: source.to_string(),
            title: None,
            chunk: 0,
            start_seconds: start,
            end_seconds: start + 10.0,
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.0), "01:05");
        assert_eq!(format_timestamp(3665.0), "01:01:05");
    }

    #[test]
    fn test_timestamp_url() {
        assert_eq!(
            meta("https://www.youtube.com/watch?v=nM_3d37lmcM", 1260.4).timestamp_url(),
            "https://www.youtube.com/watch?v=nM_3d37lmcM&t=1260s"
        );
        assert_eq!(meta("https://youtu.be/x", 5.0).timestamp_url(), "https://youtu.be/x?t=5s");
    }

    #[test]
    fn test_join_documents_skips_blank_text() {
        let docs = vec![
            Document::new(" First part. ", meta("u", 0.0)),
            Document::new("   ", meta("u", 10.0)),
            Document::new("Second part.", meta("u", 20.0)),
        ];
        assert_eq!(join_documents(&docs), "First part.\n\nSecond part.");
    }
}
