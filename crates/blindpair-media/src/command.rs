//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

use blindpair_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Number of non-progress stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Builder for FFmpeg commands with one or more inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input files, addressed as `0:`, `1:`, ... in filters and maps
    inputs: Vec<PathBuf>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an input file.
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(path.as_ref().to_path_buf());
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Apply codec, preset, quality and audio settings.
    pub fn encoding(self, encoding: &EncodingConfig) -> Self {
        self.output_args(encoding.to_ffmpeg_args())
    }

    /// Stop when the shortest stream ends.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }

        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with a timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command.
    ///
    /// A non-zero exit carries the last lines of FFmpeg's stderr.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("ffmpeg stderr not captured"))?;
        let mut reader = BufReader::new(stderr).lines();

        let output_name = cmd.output().display().to_string();
        let stderr_handle = tokio::spawn(async move {
            let mut progress = FfmpegProgress::default();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let Some(snapshot) = parse_progress_line(&line, &mut progress) {
                        trace!(
                            output = %output_name,
                            out_time_ms = snapshot.out_time_ms,
                            speed = snapshot.speed,
                            "ffmpeg progress"
                        );
                    }
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        let result = self.wait_for_completion(&mut child).await;
        let stderr_tail = stderr_handle.await.unwrap_or_default();

        match result {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!stderr_tail.is_empty()).then_some(stderr_tail),
                status.code(),
            )),
            Err(e) => Err(e),
        }
    }

    /// Wait for the child process, killing it on timeout.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        let Some(timeout_secs) = self.timeout_secs else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!("FFmpeg timed out after {} seconds, killing process", timeout_secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(timeout_secs))
            }
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_orders_inputs() {
        let cmd = FfmpegCommand::new("out.mp4")
            .input("left.mp4")
            .input("right.mp4")
            .filter_complex("[0:v][1:v]hstack=inputs=2[v]")
            .map("[v]")
            .map("0:a?")
            .shortest();

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");

        let first_input = args.iter().position(|a| a == "left.mp4").unwrap();
        let second_input = args.iter().position(|a| a == "right.mp4").unwrap();
        let filter = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(first_input < second_input);
        assert!(second_input < filter);
        assert_eq!(args.last().unwrap(), "out.mp4");
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"0:a?".to_string()));
    }

    #[test]
    fn test_encoding_args_applied() {
        let args = FfmpegCommand::new("out.mp4")
            .input("in.mp4")
            .encoding(&EncodingConfig::default())
            .build_args();

        let crf = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[crf + 1], "23");
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"192k".to_string()));
    }

    #[test]
    fn test_log_level_override() {
        let args = FfmpegCommand::new("out.mp4").log_level("warning").build_args();
        let v = args.iter().position(|a| a == "-v").unwrap();
        assert_eq!(args[v + 1], "warning");
    }
}
