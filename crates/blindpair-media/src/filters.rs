//! FFmpeg filter definitions for side-by-side comparison videos.

use crate::error::{MediaError, MediaResult};
use crate::video_info::VideoInfo;

/// Output geometry of a side-by-side video.
///
/// Both halves share the smaller input height; each width keeps its input's
/// aspect ratio and is rounded down to an even number for yuv420p.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideBySideLayout {
    pub left_width: u32,
    pub right_width: u32,
    pub height: u32,
}

impl SideBySideLayout {
    /// Compute the layout for two inputs.
    pub fn for_inputs(left: &VideoInfo, right: &VideoInfo) -> MediaResult<Self> {
        Self::from_dimensions((left.width, left.height), (right.width, right.height))
    }

    /// Compute the layout from `(width, height)` pairs.
    pub fn from_dimensions(left: (u32, u32), right: (u32, u32)) -> MediaResult<Self> {
        if left.0 == 0 || left.1 == 0 || right.0 == 0 || right.1 == 0 {
            return Err(MediaError::invalid_video("Could not get video dimensions"));
        }

        let height = left.1.min(right.1);
        let left_width = even_floor(scaled_width(left, height));
        let right_width = even_floor(scaled_width(right, height));
        if left_width == 0 || right_width == 0 {
            return Err(MediaError::invalid_video(format!(
                "Scaled width collapses to zero at height {}",
                height
            )));
        }

        Ok(Self {
            left_width,
            right_width,
            height,
        })
    }

    /// Total output width.
    pub fn width(&self) -> u32 {
        self.left_width + self.right_width
    }
}

fn scaled_width((width, height): (u32, u32), target_height: u32) -> u32 {
    (u64::from(width) * u64::from(target_height) / u64::from(height)) as u32
}

fn even_floor(value: u32) -> u32 {
    value / 2 * 2
}

/// Label of the stacked video stream produced by [`filter_hstack`].
pub const HSTACK_OUTPUT_LABEL: &str = "[v]";

/// Build the filter that scales input 0 and input 1 and stacks them horizontally.
pub fn filter_hstack(layout: &SideBySideLayout) -> String {
    format!(
        "[0:v]scale={}:{}[left];[1:v]scale={}:{}[right];[left][right]hstack=inputs=2{}",
        layout.left_width,
        layout.height,
        layout.right_width,
        layout.height,
        HSTACK_OUTPUT_LABEL
    )
}
