//! Comparison pairs: two models evaluated head-to-head.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Separator used in canonical pair names.
pub const PAIR_SEPARATOR: &str = "_vs_";

/// Two models compared against each other.
///
/// By convention `left` is the subject system and `right` the baseline.
/// The left/right naming says nothing about on-screen placement, which is
/// randomized per identity and recorded in the pair's order sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct ComparisonPair {
    pub left: String,
    pub right: String,
}

impl ComparisonPair {
    /// Create a pair, rejecting empty or identical model names.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> ModelResult<Self> {
        let left = left.into().trim().to_string();
        let right = right.into().trim().to_string();

        if left.is_empty() || right.is_empty() {
            return Err(ModelError::InvalidPairName(format!(
                "{}{}{}",
                left, PAIR_SEPARATOR, right
            )));
        }
        if left == right {
            return Err(ModelError::InvalidPairName(format!(
                "model compared with itself: {}",
                left
            )));
        }

        Ok(Self { left, right })
    }

    /// Canonical directed name: `{left}_vs_{right}`.
    pub fn name(&self) -> String {
        format!("{}{}{}", self.left, PAIR_SEPARATOR, self.right)
    }

    /// Whether the model takes part in this pair.
    pub fn contains(&self, model: &str) -> bool {
        self.left == model || self.right == model
    }

    /// The opponent of `model` within this pair.
    pub fn opponent(&self, model: &str) -> Option<&str> {
        if model == self.left {
            Some(&self.right)
        } else if model == self.right {
            Some(&self.left)
        } else {
            None
        }
    }
}

impl fmt::Display for ComparisonPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.left, PAIR_SEPARATOR, self.right)
    }
}

impl FromStr for ComparisonPair {
    type Err = ModelError;

    /// Parse a canonical name. The name must contain exactly one `_vs_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(PAIR_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(left), Some(right), None) => Self::new(left, right),
            _ => Err(ModelError::InvalidPairName(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        let pair: ComparisonPair = "deepsink_vs_self_forcing".parse().unwrap();
        assert_eq!(pair.left, "deepsink");
        assert_eq!(pair.right, "self_forcing");
        assert_eq!(pair.name(), "deepsink_vs_self_forcing");
    }

    #[test]
    fn test_invalid_names() {
        assert!("deepsink".parse::<ComparisonPair>().is_err());
        assert!("a_vs_b_vs_c".parse::<ComparisonPair>().is_err());
        assert!("_vs_b".parse::<ComparisonPair>().is_err());
        assert!("a_vs_a".parse::<ComparisonPair>().is_err());
    }

    #[test]
    fn test_opponent() {
        let pair = ComparisonPair::new("foo", "bar").unwrap();
        assert_eq!(pair.opponent("foo"), Some("bar"));
        assert_eq!(pair.opponent("bar"), Some("foo"));
        assert_eq!(pair.opponent("baz"), None);
        assert!(pair.contains("bar"));
    }
}
