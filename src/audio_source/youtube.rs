//! YouTube video lookup.

use super::{VideoLookup, VideoMetadata};
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, instrument};
use url::Url;

/// Hosts that serve YouTube watch pages.
const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "music.youtube.com"];

/// Resolves YouTube URLs and fetches video metadata through yt-dlp.
pub struct YoutubeSource {
    video_id_regex: Regex,
}

impl YoutubeSource {
    pub fn new() -> Self {
        let video_id_regex = Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("Invalid regex");
        Self { video_id_regex }
    }

    /// Extract the 11-character video ID from a URL or a bare ID.
    ///
    /// Accepts `watch?v=`, `youtu.be/`, `/embed/`, `/shorts/`, `/live/` and `/v/` forms.
    pub fn extract_video_id(&self, input: &str) -> Option<String> {
        let input = input.trim();

        if self.video_id_regex.is_match(input) {
            return Some(input.to_string());
        }

        let with_scheme = if input.contains("://") {
            input.to_string()
        } else {
            format!("https://{}", input)
        };
        let url = Url::parse(&with_scheme).ok()?;
        let host = url.host_str()?;

        let candidate = if host == "youtu.be" {
            url.path_segments()?.next().map(str::to_string)
        } else if YOUTUBE_HOSTS.contains(&host) {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed" | "shorts" | "live" | "v") => segments.next().map(str::to_string),
                _ => None,
            }
        } else {
            None
        }?;

        self.video_id_regex
            .is_match(&candidate)
            .then_some(candidate)
    }

    /// Canonical watch URL for a video ID.
    pub fn watch_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }

    /// Fetch metadata using `yt-dlp --dump-json`.
    #[instrument(skip(self))]
    pub async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        let url = Self::watch_url(video_id);

        let output = Command::new("yt-dlp")
            .args(["--dump-json", "--no-download", "--no-warnings", "--no-playlist", &url])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VidqaError::ToolNotFound("yt-dlp".to_string())
                } else {
                    VidqaError::VideoSource(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidqaError::VideoNotFound(format!(
                "Video {} not found or unavailable: {}",
                video_id, stderr
            )));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            VidqaError::VideoSource(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        let metadata = metadata_from_json(video_id, &json);
        debug!("Fetched metadata for '{}'", metadata.title);
        Ok(metadata)
    }
}

#[async_trait]
impl VideoLookup for YoutubeSource {
    fn video_id(&self, input: &str) -> Option<String> {
        self.extract_video_id(input)
    }

    async fn metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        self.fetch_metadata(video_id).await
    }
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

fn metadata_from_json(video_id: &str, json: &serde_json::Value) -> VideoMetadata {
    VideoMetadata {
        id: video_id.to_string(),
        title: json["title"].as_str().unwrap_or("Unknown Title").to_string(),
        duration_seconds: json["duration"].as_f64().map(|d| d as u32),
        url: YoutubeSource::watch_url(video_id),
        channel: json["channel"]
            .as_str()
            .or_else(|| json["uploader"].as_str())
            .map(|s| s.to_string()),
    }
}
