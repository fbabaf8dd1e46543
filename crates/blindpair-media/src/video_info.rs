//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub codec: String,
    /// Whether an audio stream is present
    pub has_audio: bool,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Read dimensions, duration and audio presence with ffprobe.
pub async fn read_video_info(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe failed for {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_stream_info(&output.stdout)
}

/// Parse ffprobe's JSON into `VideoInfo`.
///
/// The first video stream supplies dimensions; a missing stream or zero
/// dimension is an invalid video.
pub fn parse_stream_info(json: &[u8]) -> MediaResult<VideoInfo> {
    let parsed: FfprobeOutput = serde_json::from_slice(json)?;

    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::invalid_video("No video stream found"))?;

    let width = video_stream.width.unwrap_or(0);
    let height = video_stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(MediaError::invalid_video(format!(
            "Could not get video dimensions ({}x{})",
            width, height
        )));
    }

    // Container duration first, stream duration as fallback
    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .or(video_stream.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    Ok(VideoInfo {
        duration,
        width,
        height,
        fps,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
        has_audio: parsed.streams.iter().any(|s| s.codec_type == "audio"),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_stream_info() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 832, "height": 480,
                 "avg_frame_rate": "16/1"},
                {"codec_type": "audio", "codec_name": "aac"}
            ],
            "format": {"duration": "30.5"}
        }"#;
        let info = parse_stream_info(json).unwrap();
        assert_eq!(info.width, 832);
        assert_eq!(info.height, 480);
        assert!((info.duration - 30.5).abs() < 1e-9);
        assert!((info.fps - 16.0).abs() < 1e-9);
        assert!(info.has_audio);
    }

    #[test]
    fn test_missing_video_stream() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        assert!(matches!(
            parse_stream_info(json),
            Err(MediaError::InvalidVideo(_))
        ));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let json = br#"{"streams": [{"codec_type": "video", "width": 0, "height": 480}]}"#;
        assert!(parse_stream_info(json).is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = read_video_info("/nonexistent/video.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
