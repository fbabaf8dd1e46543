//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Progress percentage given total duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }
}

/// Whether a stderr line belongs to the `-progress` key/value stream.
pub fn is_progress_line(line: &str) -> bool {
    matches!(
        line.trim().split_once('=').map(|(k, _)| k),
        Some(
            "frame"
                | "fps"
                | "stream_0_0_q"
                | "bitrate"
                | "total_size"
                | "out_time_us"
                | "out_time_ms"
                | "out_time"
                | "dup_frames"
                | "drop_frames"
                | "speed"
                | "progress"
        )
    )
}

/// Fold one `-progress` line into `current`.
///
/// Returns a snapshot at the end of each progress block (`progress=...`).
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return Some(current.clone());
        }
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_parsing() {
        let mut progress = FfmpegProgress::default();

        assert!(parse_progress_line("out_time_us=5000000", &mut progress).is_none());
        assert_eq!(progress.out_time_ms, 5000);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        parse_progress_line("speed=N/A", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let snapshot = parse_progress_line("progress=end", &mut progress).unwrap();
        assert!(snapshot.is_complete);
        assert!((snapshot.percentage(10_000) - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_progress_line_detection() {
        assert!(is_progress_line("frame=120"));
        assert!(is_progress_line("progress=continue"));
        assert!(!is_progress_line("[libx264 @ 0x55] height not divisible by 2"));
        assert!(!is_progress_line("Error opening input file"));
    }
}
