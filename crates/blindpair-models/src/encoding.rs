//! Video encoding configuration for rendered comparison videos.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "medium";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";
/// Default pixel format, widely playable in browsers
pub const DEFAULT_PIX_FMT: &str = "yuv420p";

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264", "h264_nvenc")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Output pixel format
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_pix_fmt() -> String {
    DEFAULT_PIX_FMT.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            pix_fmt: DEFAULT_PIX_FMT.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Output arguments for FFmpeg, in order.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pix_fmt.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: EncodingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EncodingConfig::default());
        assert_eq!(config.crf, 23);
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = EncodingConfig::default().with_crf(18).to_ffmpeg_args();
        let crf_pos = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[crf_pos + 1], "18");
        assert!(args.contains(&"yuv420p".to_string()));
    }
}
