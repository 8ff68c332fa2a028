//! OpenAI Whisper transcription implementation.

use super::{Document, DocumentMetadata, Transcriber};
use crate::audio::{split_audio, AudioSegment};
use crate::config::TranscriptionSettings;
use crate::error::{Result, VidqaError};
use crate::openai::{create_client, map_api_error, ApiCredentials};
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
}

impl WhisperTranscriber {
    /// Create a transcriber from settings.
    pub fn with_config(credentials: &ApiCredentials, settings: &TranscriptionSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(credentials)?,
            model: settings.model.clone(),
            language: settings.language.clone(),
            chunk_duration_seconds: settings.chunk_duration_seconds,
            max_concurrent_chunks: settings.max_concurrent_chunks.max(1),
        })
    }

    /// Transcribe a single audio file (no splitting). Returns the text and the
    /// duration reported by the API.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_file(&self, audio_path: &Path) -> Result<(String, f64)> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| VidqaError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| map_api_error("Whisper API error", e))?;

        Ok((response.text.trim().to_string(), response.duration as f64))
    }

    async fn transcribe_segment(
        &self,
        index: usize,
        segment: AudioSegment,
        source: &str,
    ) -> Result<Document> {
        let (text, reported) = self.transcribe_file(&segment.path).await.map_err(|e| match e {
            VidqaError::OpenAI(msg) => VidqaError::Transcription(format!(
                "Chunk {} at {:.0}s failed: {}",
                index, segment.offset_seconds, msg
            )),
            other => other,
        })?;

        Ok(segment_document(index, &segment, text, reported, source))
    }
}

/// Places a segment's transcript on the timeline of the full recording.
///
/// Falls back to the planned segment length when the API reports no duration.
fn segment_document(
    index: usize,
    segment: &AudioSegment,
    text: String,
    reported_seconds: f64,
    source: &str,
) -> Document {
    let duration = if reported_seconds > 0.0 {
        reported_seconds
    } else {
        segment.duration_seconds
    };

    Document::new(
        text,
        DocumentMetadata {
            source: source.to_string(),
            title: None,
            chunk: index,
            start_seconds: segment.offset_seconds,
            end_seconds: segment.offset_seconds + duration,
        },
    )
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, source: &str) -> Result<Vec<Document>> {
        let temp_dir = tempfile::tempdir()?;
        let segments = split_audio(audio_path, temp_dir.path(), self.chunk_duration_seconds).await?;

        info!("Transcribing {} audio piece(s) with {}", segments.len(), self.model);

        // Ordered, bounded concurrency; the first failure aborts the rest
        let documents: Vec<Document> = stream::iter(segments.into_iter().enumerate())
            .map(|(idx, segment)| self.transcribe_segment(idx, segment, source))
            .buffered(self.max_concurrent_chunks)
            .try_collect()
            .await?;

        drop(temp_dir);

        let documents: Vec<Document> = documents
            .into_iter()
            .filter(|d| {
                let keep = !d.text.is_empty();
                if !keep {
                    debug!("Dropping empty transcription for chunk {}", d.metadata.chunk);
                }
                keep
            })
            .collect();

        info!("Transcribed {} document(s)", documents.len());
        Ok(documents)
    }
}
