//! Transcript loading.
//!
//! A [`DocumentLoader`] turns a URL into [`Document`]s. The production loader
//! downloads the audio track with yt-dlp and sends it to OpenAI Whisper in
//! pieces; each piece becomes one document carrying its time range.

mod loader;
mod models;
mod whisper;

pub use loader::YoutubeLoader;
pub use models::{format_timestamp, join_documents, Document, DocumentMetadata};
pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for speech-to-text services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file. `source` is recorded as each document's origin.
    async fn transcribe(&self, audio_path: &Path, source: &str) -> Result<Vec<Document>>;
}

/// Trait for anything that produces documents from a URL.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<Vec<Document>>;
}
