//! FFmpeg CLI wrapper for blind comparison videos.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - FFprobe video information
//! - Side-by-side layout and the `SideBySideRenderer` seam
//! - Model output collections on disk
//! - Raw video preparation (base-name matching and copying)

pub mod collection;
pub mod command;
pub mod error;
pub mod filters;
pub mod prepare;
pub mod progress;
pub mod render;
pub mod video_info;

pub use collection::{DirectoryCollection, VideoCollection};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use filters::{filter_hstack, SideBySideLayout};
pub use prepare::{extract_base_name, prepare_raw_videos, ModelSource, PrepareSummary};
pub use video_info::{read_video_info, VideoInfo};
pub use progress::FfmpegProgress;
pub use render::{FfmpegSideBySide, SideBySideRenderer};
