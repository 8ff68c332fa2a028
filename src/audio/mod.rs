//! Audio download and segmentation.

mod downloader;

pub use downloader::{download_audio, split_audio, AudioSegment};
