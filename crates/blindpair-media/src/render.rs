//! Side-by-side rendering.
//!
//! The comparison builder only sees the [`SideBySideRenderer`] trait; the
//! FFmpeg implementation owns the resolution and duration policy.

use async_trait::async_trait;
use metrics::{counter, histogram};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

use blindpair_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{filter_hstack, SideBySideLayout, HSTACK_OUTPUT_LABEL};
use crate::video_info::read_video_info;

/// Metric name constants.
pub mod names {
    /// Rendered comparison videos by outcome.
    pub const RENDER_TOTAL: &str = "blindpair_render_total";

    /// Render wall time in seconds.
    pub const RENDER_SECONDS: &str = "blindpair_render_seconds";
}

/// Renders two videos into one side-by-side artifact.
///
/// `left` is shown on the left half (label A), `right` on the right half
/// (label B).
#[async_trait]
pub trait SideBySideRenderer: Send + Sync {
    async fn render(&self, left: &Path, right: &Path, output: &Path) -> MediaResult<()>;
}

/// FFmpeg-backed renderer.
///
/// Both inputs are scaled to the smaller height, stacked horizontally, cut to
/// the shorter duration, and audio is taken from the left input when present.
#[derive(Debug, Clone)]
pub struct FfmpegSideBySide {
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl FfmpegSideBySide {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            runner: FfmpegRunner::new(),
        }
    }

    /// Bound each FFmpeg invocation; the process is killed on expiry.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    /// Build the FFmpeg command for a computed layout.
    pub fn build_command(
        &self,
        left: &Path,
        right: &Path,
        output: &Path,
        layout: &SideBySideLayout,
    ) -> FfmpegCommand {
        FfmpegCommand::new(output)
            .input(left)
            .input(right)
            .filter_complex(filter_hstack(layout))
            .map(HSTACK_OUTPUT_LABEL)
            .map("0:a?")
            .encoding(&self.encoding)
            .shortest()
    }
}

#[async_trait]
impl SideBySideRenderer for FfmpegSideBySide {
    async fn render(&self, left: &Path, right: &Path, output: &Path) -> MediaResult<()> {
        let started = Instant::now();
        let result = self.render_inner(left, right, output).await;

        let outcome = match &result {
            Ok(()) => "success",
            Err(e) => e.kind(),
        };
        counter!(names::RENDER_TOTAL, "outcome" => outcome).increment(1);
        histogram!(names::RENDER_SECONDS).record(started.elapsed().as_secs_f64());

        if result.is_err() && output.exists() {
            if let Err(e) = tokio::fs::remove_file(output).await {
                warn!(output = %output.display(), error = %e, "Failed to remove partial output");
            }
        }

        result
    }
}

impl FfmpegSideBySide {
    async fn render_inner(&self, left: &Path, right: &Path, output: &Path) -> MediaResult<()> {
        for input in [left, right] {
            if !input.exists() {
                return Err(MediaError::FileNotFound(input.to_path_buf()));
            }
        }

        let (left_info, right_info) = tokio::try_join!(read_video_info(left), read_video_info(right))?;
        let layout = SideBySideLayout::for_inputs(&left_info, &right_info)?;
        debug!(
            left = %left.display(),
            right = %right.display(),
            width = layout.width(),
            height = layout.height,
            "Side-by-side layout"
        );

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let cmd = self.build_command(left, right, output, &layout);
        self.runner.run(&cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_build_command_maps_stacked_video_and_left_audio() {
        let renderer = FfmpegSideBySide::new(EncodingConfig::default());
        let layout = SideBySideLayout::from_dimensions((832, 480), (832, 480)).unwrap();
        let args = renderer
            .build_command(
                &PathBuf::from("l.mp4"),
                &PathBuf::from("r.mp4"),
                &PathBuf::from("o.mp4"),
                &layout,
            )
            .build_args();

        let maps: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-map")
            .map(|(i, _)| &args[i + 1])
            .collect();
        assert_eq!(maps, vec!["[v]", "0:a?"]);
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"yuv420p".to_string()));
    }

    #[tokio::test]
    async fn test_missing_input_is_file_not_found() {
        let dir = TempDir::new().unwrap();
        let renderer = FfmpegSideBySide::new(EncodingConfig::default()).with_timeout(5);
        let err = renderer
            .render(
                &dir.path().join("missing_left.mp4"),
                &dir.path().join("missing_right.mp4"),
                &dir.path().join("out.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
        assert!(!dir.path().join("out.mp4").exists());
    }
}
