//! Identity keys shared by two model output collections.
//!
//! An identity is the base name of a video ("the same content produced by
//! model X and model Y"). Filenames seen in the wild carry a video extension
//! and sometimes the `_comparison` infix added by the comparison builder;
//! both are stripped to obtain the canonical form.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, ModelResult};

/// Video extensions recognised when normalizing filenames.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".webm", ".mkv", ".avi"];

/// Infix appended to rendered comparison artifacts.
pub const COMPARISON_INFIX: &str = "_comparison";

/// Identity of one piece of content across model collections.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    /// Create an identity, rejecting empty or multi-line keys.
    pub fn new(s: impl Into<String>) -> ModelResult<Self> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.contains('\n') {
            return Err(ModelError::InvalidIdentity(s));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Build the identity of a video file name (`clip_01.mp4` -> `clip_01`).
    pub fn from_filename(filename: &str) -> ModelResult<Self> {
        Self::new(strip_video_extension(filename.trim()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical form: extension and comparison infix removed.
    pub fn canonical(&self) -> String {
        canonicalize(&self.0)
    }

    /// File name of the rendered comparison artifact for this identity.
    pub fn comparison_filename(&self) -> String {
        format!("{}{}.mp4", self.0, COMPARISON_INFIX)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remove a known video extension, if present (case-insensitive).
pub fn strip_video_extension(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    for ext in VIDEO_EXTENSIONS {
        if lower.ends_with(ext) {
            return &name[..name.len() - ext.len()];
        }
    }
    name
}

/// Remove a trailing `_comparison` infix, if present.
pub fn strip_comparison_infix(name: &str) -> &str {
    name.strip_suffix(COMPARISON_INFIX).unwrap_or(name)
}

/// Canonical key: trim, strip extension, then strip the comparison infix.
pub fn canonicalize(name: &str) -> String {
    strip_comparison_infix(strip_video_extension(name.trim())).to_string()
}

/// Whether a file name looks like a video this crate understands.
pub fn is_video_filename(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename_strips_extension() {
        let id = Identity::from_filename("clip_01.mp4").unwrap();
        assert_eq!(id.as_str(), "clip_01");

        let id = Identity::from_filename("30s_2.MOV").unwrap();
        assert_eq!(id.as_str(), "30s_2");
    }

    #[test]
    fn test_canonical_variants_agree() {
        for name in ["clip_01", "clip_01.mp4", "clip_01_comparison.mp4", "clip_01_comparison"] {
            assert_eq!(canonicalize(name), "clip_01", "variant {name}");
        }
    }

    #[test]
    fn test_infix_only_stripped_at_end() {
        assert_eq!(canonicalize("a_comparison_b.mp4"), "a_comparison_b");
    }

    #[test]
    fn test_empty_identity_rejected() {
        assert!(Identity::new("   ").is_err());
        assert!(Identity::from_filename(".mp4").is_err());
    }

    #[test]
    fn test_comparison_filename() {
        let id = Identity::new("easy_v2_004").unwrap();
        assert_eq!(id.comparison_filename(), "easy_v2_004_comparison.mp4");
        assert_eq!(canonicalize(&id.comparison_filename()), "easy_v2_004");
    }

    #[test]
    fn test_is_video_filename() {
        assert!(is_video_filename("x.mp4"));
        assert!(is_video_filename("x.WEBM"));
        assert!(!is_video_filename("order_sheet.txt"));
    }
}
