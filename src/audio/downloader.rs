//! Audio download and processing utilities.
//!
//! Downloads audio tracks with yt-dlp and cuts them into API-sized pieces with
//! ffmpeg/ffprobe.

use crate::error::{Result, VidqaError};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// One piece of a longer recording.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    /// File holding this piece.
    pub path: PathBuf,
    /// Position of the piece within the full recording, in seconds.
    pub offset_seconds: f64,
    /// Length of the piece in seconds.
    pub duration_seconds: f64,
}

/// Downloads the audio track of `url` into `output_dir` as `<video_id>.mp3`.
///
/// An existing file is reused, so asking several questions about the same video
/// downloads it once.
#[instrument(skip(output_dir), fields(video_id = %video_id))]
pub async fn download_audio(url: &str, video_id: &str, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let target_path = output_dir.join(format!("{}.mp3", video_id));

    if target_path.exists() {
        info!("Using cached audio file");
        return Ok(target_path);
    }

    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", video_id));

    let mut cmd = Command::new("yt-dlp");
    cmd.arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg("0")
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url);

    let output = run_tool("yt-dlp", &mut cmd).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VidqaError::AudioDownload(format!("yt-dlp failed: {stderr}")));
    }

    // yt-dlp may leave a different container behind; normalize to mp3
    let downloaded = find_audio_file(output_dir, video_id)?;

    if downloaded != target_path {
        normalize_to_mp3(&downloaded, &target_path).await?;
        if let Err(e) = std::fs::remove_file(&downloaded) {
            warn!("Failed to remove intermediate audio file: {}", e);
        }
    }

    Ok(target_path)
}

/// Locates a downloaded audio file by video ID.
fn find_audio_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
    for ext in ["mp3", "m4a", "opus", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", video_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| VidqaError::AudioDownload(format!("Cannot read directory: {e}")))?;

    entries
        .flatten()
        .find(|entry| entry.file_name().to_string_lossy().starts_with(video_id))
        .map(|entry| entry.path())
        .ok_or_else(|| VidqaError::AudioDownload("Audio file not found after download".into()))
}

/// Converts an audio file to MP3 using ffmpeg.
async fn normalize_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {:?} to MP3", source);

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest);

    let output = run_tool("ffmpeg", &mut cmd).await?;
    if output.status.success() {
        Ok(())
    } else {
        let err = String::from_utf8_lossy(&output.stderr);
        Err(VidqaError::AudioDownload(format!("ffmpeg conversion failed: {err}")))
    }
}

/// Upload limit of the transcription API.
const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Size each piece is planned to stay under, leaving room for container overhead.
const TARGET_SEGMENT_BYTES: u64 = 20 * 1024 * 1024;

/// Bitrate pieces are re-encoded to. Mono speech at this rate transcribes as
/// well as the original download.
const SEGMENT_BITRATE_KBPS: u32 = 64;

/// Longest piece, in seconds, that stays under [`TARGET_SEGMENT_BYTES`] at `bitrate_kbps`.
fn max_segment_seconds(bitrate_kbps: u32) -> f64 {
    let bytes_per_second = bitrate_kbps.max(1) as f64 * 1000.0 / 8.0;
    (TARGET_SEGMENT_BYTES as f64 / bytes_per_second).floor()
}

/// Expected size of `seconds` of audio at `bitrate_kbps`.
fn estimated_bytes(seconds: f64, bitrate_kbps: u32) -> u64 {
    (seconds * bitrate_kbps as f64 * 1000.0 / 8.0).ceil() as u64
}

/// Cuts `source` into mono pieces of at most `chunk_seconds`, each re-encoded at
/// [`SEGMENT_BITRATE_KBPS`].
///
/// The piece length is capped so that no piece exceeds the upload limit,
/// whatever bitrate the download came in. Short recordings still go through
/// the re-encode and come back as a single piece.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    chunk_seconds: u32,
) -> Result<Vec<AudioSegment>> {
    std::fs::create_dir_all(output_dir)?;

    let total_duration = probe_duration(source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let piece_seconds = (chunk_seconds as f64).min(max_segment_seconds(SEGMENT_BITRATE_KBPS));
    let plan = plan_segments(total_duration, piece_seconds);

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut segments = Vec::with_capacity(plan.len());
    for (idx, (offset, length)) in plan.into_iter().enumerate() {
        let path = output_dir.join(format!("{}_{:04}.mp3", base_name, idx));
        extract_segment(source, &path, offset, length).await?;

        let size = std::fs::metadata(&path)?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(VidqaError::AudioDownload(format!(
                "Segment {} is {} bytes, over the {} byte upload limit",
                idx, size, MAX_UPLOAD_BYTES
            )));
        }
        debug!("Created segment {} at offset {:.1}s ({} bytes)", idx, offset, size);

        segments.push(AudioSegment {
            path,
            offset_seconds: offset,
            duration_seconds: length,
        });
    }

    info!("Created {} audio segments", segments.len());
    Ok(segments)
}

/// Computes `(offset, length)` pairs covering `total` seconds in steps of `chunk`.
fn plan_segments(total: f64, chunk: f64) -> Vec<(f64, f64)> {
    if total <= 0.0 || chunk <= 0.0 || total <= chunk {
        return vec![(0.0, total.max(0.0))];
    }

    let mut plan = Vec::new();
    let mut offset = 0.0;
    while offset < total {
        plan.push((offset, chunk.min(total - offset)));
        offset += chunk;
    }
    plan
}

/// Extracts a time segment from an audio file as low-bitrate mono MP3.
async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-vn")
        .arg("-ac").arg("1")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-b:a").arg(format!("{}k", SEGMENT_BITRATE_KBPS))
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest);

    let out = run_tool("ffmpeg", &mut cmd).await?;
    if out.status.success() {
        Ok(())
    } else {
        let err = String::from_utf8_lossy(&out.stderr);
        Err(VidqaError::AudioDownload(format!("Segment extraction failed: {err}")))
    }
}

/// Queries the duration of an audio file using ffprobe with JSON output.
async fn probe_duration(path: &Path) -> Result<f64> {
    let mut cmd = Command::new("ffprobe");
    cmd.arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path);

    let output = run_tool("ffprobe", &mut cmd).await?;
    if !output.status.success() {
        return Err(VidqaError::AudioDownload("ffprobe returned error".into()));
    }

    parse_probe_duration(&output.stdout)
}

fn parse_probe_duration(stdout: &[u8]) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|_| VidqaError::AudioDownload("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| VidqaError::AudioDownload("Could not determine audio duration".into()))
}

/// Runs an external tool, mapping a missing binary to [`VidqaError::ToolNotFound`].
async fn run_tool(name: &str, cmd: &mut Command) -> Result<Output> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    match cmd.output().await {
        Ok(output) => Ok(output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VidqaError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(VidqaError::AudioDownload(format!("{name} execution failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_segments_short_audio_is_single_piece() {
        assert_eq!(plan_segments(90.0, 1200.0), vec![(0.0, 90.0)]);
    }

    #[test]
    fn test_plan_segments_covers_whole_recording() {
        let plan = plan_segments(2500.0, 1200.0);
        assert_eq!(plan, vec![(0.0, 1200.0), (1200.0, 1200.0), (2400.0, 100.0)]);

        let covered: f64 = plan.iter().map(|(_, len)| len).sum();
        assert!((covered - 2500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hour_long_recording_pieces_fit_upload_limit() {
        // Default settings: 1200 s pieces of a one hour video
        let piece = 1200f64.min(max_segment_seconds(SEGMENT_BITRATE_KBPS));
        let plan = plan_segments(3600.0, piece);
        assert_eq!(plan.len(), 3);

        for (_, length) in &plan {
            assert!(estimated_bytes(*length, SEGMENT_BITRATE_KBPS) < MAX_UPLOAD_BYTES);
        }

        // The same pieces copied at the download's V0 bitrate would not fit
        assert!(estimated_bytes(1200.0, 245) > MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_long_pieces_are_capped_by_size() {
        let cap = max_segment_seconds(SEGMENT_BITRATE_KBPS);
        assert_eq!(cap, 2621.0);
        assert!(estimated_bytes(cap, SEGMENT_BITRATE_KBPS) <= TARGET_SEGMENT_BYTES);

        // A configured two hour piece length still yields upload-sized pieces
        let plan = plan_segments(7200.0, 7200f64.min(cap));
        assert_eq!(plan.len(), 3);
        assert!(plan
            .iter()
            .all(|(_, len)| estimated_bytes(*len, SEGMENT_BITRATE_KBPS) < MAX_UPLOAD_BYTES));
    }

    #[test]
    fn test_find_audio_file_prefers_known_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.m4a"), b"").unwrap();
        std::fs::write(dir.path().join("abc.part"), b"").unwrap();

        let found = find_audio_file(dir.path(), "abc").unwrap();
        assert_eq!(found, dir.path().join("abc.m4a"));
    }

    #[test]
    fn test_find_audio_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_audio_file(dir.path(), "nothing"),
            Err(VidqaError::AudioDownload(_))
        ));
    }

    #[test]
    fn test_parse_probe_duration() {
        let json = br#"{"format": {"filename": "a.mp3", "duration": "125.432000"}}"#;
        assert!((parse_probe_duration(json).unwrap() - 125.432).abs() < 1e-9);
        assert!(parse_probe_duration(b"{}").is_err());
    }

    #[tokio::test]
    async fn test_cached_audio_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("dQw4w9WgXcQ.mp3");
        std::fs::write(&cached, b"mp3").unwrap();

        let path = download_audio("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ", dir.path())
            .await
            .unwrap();
        assert_eq!(path, cached);
    }
}
