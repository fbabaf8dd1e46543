//! Participant response records.
//!
//! Two record shapes are collected:
//!
//! - JSON records: `participantId` plus `responses`, a mapping of
//!   pair name -> identity -> choice. A choice is either a bare `"A"`/`"B"`
//!   string or an object carrying an `answers` mapping of question -> choice
//!   (older submissions use a single `choice` field instead).
//! - Result-code records: compact `pair-dataset-video-answers` codes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A participant's JSON submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub participant_id: String,
    /// pair name -> identity -> choice. Kept as raw JSON so one odd entry
    /// does not sink the rest of the record; see [`ChoiceValue::from_value`].
    pub responses: BTreeMap<String, Value>,
    /// Anything else the survey page attached (timestamps, demographics, ...).
    #[serde(flatten, default)]
    pub metadata: BTreeMap<String, Value>,
}

/// One stored choice for a (pair, identity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ChoiceValue {
    /// Bare `"A"` or `"B"`.
    Raw(String),
    /// Object with per-question answers.
    Structured(StructuredChoice),
}

/// Structured choice object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct StructuredChoice {
    /// question name -> choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<BTreeMap<String, Value>>,
    /// Single choice without a question name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
}

impl ChoiceValue {
    /// Classify one stored entry.
    ///
    /// Strings are raw choices. Other scalars (numbers, booleans, null) are
    /// kept as their JSON text so they decode as invalid choices. Objects
    /// must look like [`StructuredChoice`]. Arrays are not choices.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ChoiceValue::Raw(s.clone())),
            Value::Null | Value::Bool(_) | Value::Number(_) => {
                Some(ChoiceValue::Raw(value.to_string()))
            }
            Value::Object(_) => serde_json::from_value(value.clone())
                .ok()
                .map(ChoiceValue::Structured),
            Value::Array(_) => None,
        }
    }

    /// Flatten into `(question, raw choice)` tuples.
    ///
    /// Unquestioned choices are attributed to `default_question`.
    /// Returns `None` when the value carries no recognisable choice at all.
    pub fn question_choices(&self, default_question: &str) -> Option<Vec<(String, String)>> {
        match self {
            ChoiceValue::Raw(choice) => Some(vec![(default_question.to_string(), choice.clone())]),
            ChoiceValue::Structured(s) => {
                if let Some(answers) = &s.answers {
                    let out: Vec<(String, String)> = answers
                        .iter()
                        .map(|(q, v)| (q.clone(), value_as_choice(v)))
                        .collect();
                    if out.is_empty() {
                        None
                    } else {
                        Some(out)
                    }
                } else {
                    s.choice
                        .as_ref()
                        .map(|v| vec![(default_question.to_string(), value_as_choice(v))])
                }
            }
        }
    }
}

/// Render a JSON value as the raw choice string. Non-strings keep their
/// JSON text so that they surface later as invalid choices.
fn value_as_choice(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A participant's result-code submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultCodeRecord {
    pub participant_id: String,
    /// Codes of the form `<pair>-<dataset>-<video>-<answers>`.
    pub result_codes: Vec<String>,
    #[serde(flatten, default)]
    pub metadata: BTreeMap<String, Value>,
}
