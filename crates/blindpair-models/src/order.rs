//! Order sheet entries: which model was shown under which label.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::identity::Identity;
use crate::label::Label;
use crate::pair::ComparisonPair;

/// Separator between the identity and the label-A model.
pub const MODEL_A_SEPARATOR: &str = ": Model A = ";

/// Separator between the label-A model and the label-B model.
pub const MODEL_B_SEPARATOR: &str = ", Model B = ";

/// Ground-truth placement for one identity of one comparison pair.
///
/// Invariant: `{model_a, model_b}` is exactly `{pair.left, pair.right}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OrderSheetEntry {
    pub identity: Identity,
    pub model_a: String,
    pub model_b: String,
}

impl OrderSheetEntry {
    /// Build the entry for a placement decision.
    ///
    /// `left_first` puts the pair's left model under label A.
    pub fn for_placement(pair: &ComparisonPair, identity: Identity, left_first: bool) -> Self {
        let (model_a, model_b) = if left_first {
            (pair.left.clone(), pair.right.clone())
        } else {
            (pair.right.clone(), pair.left.clone())
        };
        Self {
            identity,
            model_a,
            model_b,
        }
    }

    /// Model shown under `label`.
    pub fn model_for(&self, label: Label) -> &str {
        match label {
            Label::A => &self.model_a,
            Label::B => &self.model_b,
        }
    }

    /// Label under which `model` was shown, if it is part of this entry.
    pub fn label_of(&self, model: &str) -> Option<Label> {
        if self.model_a == model {
            Some(Label::A)
        } else if self.model_b == model {
            Some(Label::B)
        } else {
            None
        }
    }

    /// Whether the two assigned models are exactly the pair's models.
    pub fn matches_pair(&self, pair: &ComparisonPair) -> bool {
        (self.model_a == pair.left && self.model_b == pair.right)
            || (self.model_a == pair.right && self.model_b == pair.left)
    }

    /// Canonical text form: `<identity>: Model A = <name>, Model B = <name>`.
    pub fn to_line(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.identity, MODEL_A_SEPARATOR, self.model_a, MODEL_B_SEPARATOR, self.model_b
        )
    }

    /// Parse one entry line. Surrounding whitespace is ignored.
    pub fn parse_line(line: &str) -> ModelResult<Self> {
        let line = line.trim();
        let (identity, rest) = line
            .split_once(MODEL_A_SEPARATOR)
            .ok_or_else(|| ModelError::InvalidOrderLine(line.to_string()))?;
        let (model_a, model_b) = rest
            .split_once(MODEL_B_SEPARATOR)
            .ok_or_else(|| ModelError::InvalidOrderLine(line.to_string()))?;

        let model_a = model_a.trim();
        let model_b = model_b.trim();
        if model_a.is_empty() || model_b.is_empty() {
            return Err(ModelError::InvalidOrderLine(line.to_string()));
        }

        Ok(Self {
            identity: Identity::new(identity)?,
            model_a: model_a.to_string(),
            model_b: model_b.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_round_trip() {
        let entry = OrderSheetEntry::parse_line("v1: Model A = foo, Model B = bar").unwrap();
        assert_eq!(entry.identity.as_str(), "v1");
        assert_eq!(entry.model_a, "foo");
        assert_eq!(entry.model_b, "bar");
        assert_eq!(entry.to_line(), "v1: Model A = foo, Model B = bar");
    }

    #[test]
    fn test_identity_may_contain_colon() {
        let entry =
            OrderSheetEntry::parse_line("30s: clip.mp4: Model A = foo, Model B = bar").unwrap();
        assert_eq!(entry.identity.as_str(), "30s: clip.mp4");
    }

    #[test]
    fn test_rejects_non_entry_lines() {
        assert!(OrderSheetEntry::parse_line("Original Method A: deepsink").is_err());
        assert!(OrderSheetEntry::parse_line("v1: Model A = foo").is_err());
        assert!(OrderSheetEntry::parse_line("v1: Model A = , Model B = bar").is_err());
    }

    #[test]
    fn test_placement() {
        let pair = ComparisonPair::new("foo", "bar").unwrap();
        let id = Identity::new("v1").unwrap();

        let left_first = OrderSheetEntry::for_placement(&pair, id.clone(), true);
        assert_eq!(left_first.model_for(Label::A), "foo");
        assert_eq!(left_first.label_of("bar"), Some(Label::B));

        let right_first = OrderSheetEntry::for_placement(&pair, id, false);
        assert_eq!(right_first.model_for(Label::A), "bar");
        assert_eq!(right_first.label_of("foo"), Some(Label::B));
        assert!(right_first.matches_pair(&pair));
    }
}
