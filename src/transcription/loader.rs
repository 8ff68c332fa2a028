//! Turns a YouTube URL into transcribed documents.

use super::{Document, DocumentLoader, Transcriber};
use crate::audio::download_audio;
use crate::audio_source::{VideoLookup, YoutubeSource};
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Downloads a video's audio track and transcribes it.
pub struct YoutubeLoader {
    lookup: Arc<dyn VideoLookup>,
    transcriber: Arc<dyn Transcriber>,
    save_dir: PathBuf,
    max_duration_seconds: u32,
}

impl YoutubeLoader {
    pub fn new(transcriber: Arc<dyn Transcriber>, save_dir: PathBuf, max_duration_seconds: u32) -> Self {
        Self::with_lookup(
            Arc::new(YoutubeSource::new()),
            transcriber,
            save_dir,
            max_duration_seconds,
        )
    }

    pub fn with_lookup(
        lookup: Arc<dyn VideoLookup>,
        transcriber: Arc<dyn Transcriber>,
        save_dir: PathBuf,
        max_duration_seconds: u32,
    ) -> Self {
        Self {
            lookup,
            transcriber,
            save_dir,
            max_duration_seconds,
        }
    }
}

#[async_trait]
impl DocumentLoader for YoutubeLoader {
    #[instrument(skip(self))]
    async fn load(&self, url: &str) -> Result<Vec<Document>> {
        let video_id = self.lookup.video_id(url).ok_or_else(|| {
            VidqaError::InvalidInput(format!("Not a YouTube video URL: {}", url))
        })?;

        let metadata = self.lookup.metadata(&video_id).await?;
        info!(
            "Loading '{}' by {}",
            metadata.title,
            metadata.channel.as_deref().unwrap_or("unknown channel")
        );

        if let Some(duration) = metadata.duration_seconds {
            if duration > self.max_duration_seconds {
                return Err(VidqaError::InvalidInput(format!(
                    "Video duration ({} seconds) exceeds maximum ({} seconds)",
                    duration, self.max_duration_seconds
                )));
            }
        }

        let audio_path = download_audio(&metadata.url, &video_id, &self.save_dir).await?;

        let mut documents = self.transcriber.transcribe(&audio_path, &metadata.url).await?;
        for doc in &mut documents {
            doc.metadata.title = Some(metadata.title.clone());
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_source::VideoMetadata;
    use crate::transcription::DocumentMetadata;
    use std::path::Path;

    const VIDEO_ID: &str = "nM_3d37lmcM";

    struct Unreachable;

    #[async_trait]
    impl Transcriber for Unreachable {
        async fn transcribe(&self, _audio_path: &Path, _source: &str) -> Result<Vec<Document>> {
            panic!("transcriber must not be reached for invalid input");
        }
    }

    /// Two untitled documents, as Whisper returns them.
    struct TwoPieces;

    #[async_trait]
    impl Transcriber for TwoPieces {
        async fn transcribe(&self, audio_path: &Path, source: &str) -> Result<Vec<Document>> {
            assert!(audio_path.ends_with(format!("{}.mp3", VIDEO_ID)));
            Ok((0..2)
                .map(|i| {
                    Document::new(
                        format!("piece {}", i),
                        DocumentMetadata {
                            source: source.to_string(),
                            title: None,
                            chunk: i,
                            start_seconds: i as f64 * 60.0,
                            end_seconds: (i + 1) as f64 * 60.0,
                        },
                    )
                })
                .collect())
        }
    }

    struct FixedVideo {
        duration_seconds: u32,
    }

    #[async_trait]
    impl VideoLookup for FixedVideo {
        fn video_id(&self, input: &str) -> Option<String> {
            YoutubeSource::new().extract_video_id(input)
        }

        async fn metadata(&self, video_id: &str) -> Result<VideoMetadata> {
            Ok(VideoMetadata {
                id: video_id.to_string(),
                title: "John Schulman interview".to_string(),
                duration_seconds: Some(self.duration_seconds),
                url: YoutubeSource::watch_url(video_id),
                channel: Some("Dwarkesh Patel".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_download() {
        let dir = tempfile::tempdir().unwrap();
        let loader = YoutubeLoader::new(Arc::new(Unreachable), dir.path().to_path_buf(), 7200);

        let err = loader.load("https://example.com/not-a-video").await.unwrap_err();
        assert!(matches!(err, VidqaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_overlong_video_is_rejected_before_download() {
        let dir = tempfile::tempdir().unwrap();
        let loader = YoutubeLoader::with_lookup(
            Arc::new(FixedVideo { duration_seconds: 7201 }),
            Arc::new(Unreachable),
            dir.path().to_path_buf(),
            7200,
        );

        let err = loader
            .load("https://www.youtube.com/watch?v=nM_3d37lmcM")
            .await
            .unwrap_err();
        match err {
            VidqaError::InvalidInput(msg) => assert!(msg.contains("7201")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join(format!("{}.mp3", VIDEO_ID)).exists());
    }

    #[tokio::test]
    async fn test_title_is_copied_onto_every_document() {
        let dir = tempfile::tempdir().unwrap();
        // Cached download, so no yt-dlp run
        std::fs::write(dir.path().join(format!("{}.mp3", VIDEO_ID)), b"mp3").unwrap();

        let loader = YoutubeLoader::with_lookup(
            Arc::new(FixedVideo { duration_seconds: 7200 }),
            Arc::new(TwoPieces),
            dir.path().to_path_buf(),
            7200,
        );

        let documents = loader.load("https://youtu.be/nM_3d37lmcM").await.unwrap();

        assert_eq!(documents.len(), 2);
        for doc in &documents {
            assert_eq!(doc.metadata.title.as_deref(), Some("John Schulman interview"));
            assert_eq!(doc.metadata.source, "https://www.youtube.com/watch?v=nM_3d37lmcM");
        }
        assert_eq!(documents[1].text, "piece 1");
    }
}
