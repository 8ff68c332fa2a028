//! Where audio comes from.
//!
//! Only YouTube videos are supported; the source resolves user-supplied URLs to
//! video IDs and fetches the metadata needed before downloading.

mod youtube;

pub use youtube::YoutubeSource;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata about a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// YouTube video ID.
    pub id: String,
    /// Title.
    pub title: String,
    /// Duration in seconds (if known).
    pub duration_seconds: Option<u32>,
    /// Canonical watch URL.
    pub url: String,
    /// Channel or uploader name.
    pub channel: Option<String>,
}

/// Resolves a user-supplied URL to a video and looks up its metadata.
#[async_trait]
pub trait VideoLookup: Send + Sync {
    /// Video ID for `input`, or `None` if it does not name a video.
    fn video_id(&self, input: &str) -> Option<String>;

    async fn metadata(&self, video_id: &str) -> Result<VideoMetadata>;
}
