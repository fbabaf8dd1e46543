//! Blinded A/B labels shown to participants.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Label under which a model was shown in a comparison video.
///
/// `A` is the left half of the rendered video, `B` the right half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Label {
    A,
    B,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::A, Label::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::A => "A",
            Label::B => "B",
        }
    }

    /// The complementary label.
    pub fn other(&self) -> Label {
        match self {
            Label::A => Label::B,
            Label::B => Label::A,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = ModelError;

    /// Only the exact strings `A` and `B` (surrounding whitespace ignored) are labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(Label::A),
            "B" => Ok(Label::B),
            other => Err(ModelError::InvalidLabel(other.to_string())),
        }
    }
}
