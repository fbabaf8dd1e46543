//! Record adapters.
//!
//! Each adapter understands one response record shape and flattens it into
//! `(participant, pair, identity, question, choice)` tuples. Decoding and
//! aggregation are shared by all shapes.

use blindpair_collect::CollectedRecord;
use blindpair_models::{
    ChoiceValue, ResponseRecord, ResultCodeRecord, ResultCodeSection, StudyConfig,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::MalformedRecord;
use crate::mapping::IndexMapping;

/// One choice as submitted, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChoice {
    pub participant: String,
    pub pair: String,
    pub identity: String,
    pub question: String,
    pub choice: String,
}

/// Choices extracted from one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub participant: String,
    pub choices: Vec<RawChoice>,
    /// Entries of the record that could not be used
    pub diagnostics: Vec<String>,
}

/// Extracts raw choices from records of one shape.
pub trait RecordAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this adapter recognises the record's shape.
    fn accepts(&self, payload: &Value) -> bool;

    fn extract(&self, record: &CollectedRecord) -> Result<Extraction, MalformedRecord>;
}

// ============================================================================
// JSON response records
// ============================================================================

/// `participantId` + `responses` records.
#[derive(Debug, Clone)]
pub struct StudyJsonAdapter {
    default_question: String,
}

impl StudyJsonAdapter {
    pub fn new(default_question: impl Into<String>) -> Self {
        Self {
            default_question: default_question.into(),
        }
    }
}

impl RecordAdapter for StudyJsonAdapter {
    fn name(&self) -> &'static str {
        "responses"
    }

    fn accepts(&self, payload: &Value) -> bool {
        payload.get("responses").is_some()
    }

    fn extract(&self, record: &CollectedRecord) -> Result<Extraction, MalformedRecord> {
        let parsed: ResponseRecord = serde_json::from_value(record.payload.clone())
            .map_err(|e| MalformedRecord::new(&record.source, e.to_string()))?;

        let participant = parsed.participant_id.trim().to_string();
        if participant.is_empty() {
            return Err(MalformedRecord::new(&record.source, "empty participantId"));
        }

        let mut out = Extraction {
            participant: participant.clone(),
            ..Extraction::default()
        };

        for (pair, videos) in &parsed.responses {
            let Some(videos) = videos.as_object() else {
                out.diagnostics
                    .push(format!("{}: {}: pair responses are not an object", record.source, pair));
                continue;
            };
            for (identity, value) in videos {
                let choices = ChoiceValue::from_value(value)
                    .and_then(|choice| choice.question_choices(&self.default_question));
                match choices {
                    Some(choices) => {
                        for (question, choice) in choices {
                            out.choices.push(RawChoice {
                                participant: participant.clone(),
                                pair: pair.clone(),
                                identity: identity.clone(),
                                question,
                                choice: choice.trim().to_string(),
                            });
                        }
                    }
                    None => out
                        .diagnostics
                        .push(format!("{}: {}/{}: no recognisable choice", record.source, pair, identity)),
                }
            }
        }

        Ok(out)
    }
}

// ============================================================================
// Result-code records
// ============================================================================

/// `participantId` + `resultCodes` records.
///
/// Code `<pair>-<dataset>-<video>-<answers>`: `pair` indexes the configured
/// pair order, `video` the pair's index mapping (both 0-based), and each
/// answer digit is `1` (A) or `2` (B) for the configured question at that
/// position. The dataset component is not used for decoding.
#[derive(Debug, Clone)]
pub struct ResultCodeAdapter {
    pair_order: Vec<String>,
    questions: Vec<String>,
    mappings: BTreeMap<String, IndexMapping>,
}

impl ResultCodeAdapter {
    pub fn new(section: &ResultCodeSection, mappings: BTreeMap<String, IndexMapping>) -> Self {
        Self {
            pair_order: section.pair_order.clone(),
            questions: section.questions.clone(),
            mappings,
        }
    }

    /// Build from config, loading the index mapping of each listed pair.
    /// Pairs without a readable mapping are logged; their codes end up as
    /// diagnostics.
    pub async fn from_config(config: &StudyConfig, section: &ResultCodeSection) -> Self {
        let mut mappings = BTreeMap::new();
        for pair in &section.pair_order {
            let Some(set) = config.find_set(pair) else {
                continue;
            };
            let path = config.index_mapping_path(set);
            match IndexMapping::load(&path).await {
                Ok(mapping) => {
                    mappings.insert(pair.clone(), mapping);
                }
                Err(e) => warn!(pair = %pair, path = %path.display(), error = %e, "Index mapping unavailable"),
            }
        }
        Self::new(section, mappings)
    }

    fn decode_code(&self, participant: &str, code: &str) -> Result<Vec<RawChoice>, String> {
        let parts: Vec<&str> = code.trim().split('-').collect();
        let [pair_idx, _dataset, video_idx, answers] = parts.as_slice() else {
            return Err(format!("{:?}: expected 4 components", code));
        };

        let pair_idx: usize = pair_idx
            .parse()
            .map_err(|_| format!("{:?}: bad pair index", code))?;
        let video_idx: usize = video_idx
            .parse()
            .map_err(|_| format!("{:?}: bad video index", code))?;

        let pair = self
            .pair_order
            .get(pair_idx)
            .ok_or_else(|| format!("{:?}: pair index {} out of range", code, pair_idx))?;
        let mapping = self
            .mappings
            .get(pair)
            .ok_or_else(|| format!("{:?}: no index mapping for {}", code, pair))?;
        let identity = mapping
            .get(video_idx)
            .ok_or_else(|| format!("{:?}: video index {} not in mapping of {}", code, video_idx, pair))?;

        if answers.chars().count() != self.questions.len() {
            return Err(format!(
                "{:?}: {} answers for {} questions",
                code,
                answers.chars().count(),
                self.questions.len()
            ));
        }

        Ok(self
            .questions
            .iter()
            .zip(answers.chars())
            .map(|(question, digit)| RawChoice {
                participant: participant.to_string(),
                pair: pair.clone(),
                identity: identity.to_string(),
                question: question.clone(),
                choice: digit_to_choice(digit),
            })
            .collect())
    }
}

/// `1` is A, `2` is B; anything else is kept so it surfaces as invalid.
fn digit_to_choice(digit: char) -> String {
    match digit {
        '1' => "A".to_string(),
        '2' => "B".to_string(),
        other => other.to_string(),
    }
}

impl RecordAdapter for ResultCodeAdapter {
    fn name(&self) -> &'static str {
        "result_codes"
    }

    fn accepts(&self, payload: &Value) -> bool {
        payload.get("resultCodes").is_some()
    }

    fn extract(&self, record: &CollectedRecord) -> Result<Extraction, MalformedRecord> {
        let parsed: ResultCodeRecord = serde_json::from_value(record.payload.clone())
            .map_err(|e| MalformedRecord::new(&record.source, e.to_string()))?;

        let participant = parsed.participant_id.trim().to_string();
        if participant.is_empty() {
            return Err(MalformedRecord::new(&record.source, "empty participantId"));
        }

        let mut out = Extraction {
            participant: participant.clone(),
            ..Extraction::default()
        };
        for code in &parsed.result_codes {
            match self.decode_code(&participant, code) {
                Ok(choices) => out.choices.extend(choices),
                Err(reason) => out.diagnostics.push(format!("{}: {}", record.source, reason)),
            }
        }
        Ok(out)
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Ordered set of adapters; the first one accepting a record handles it.
#[derive(Default)]
pub struct AdapterSet {
    adapters: Vec<Box<dyn RecordAdapter>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, adapter: impl RecordAdapter + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    /// Adapters for every shape the config can decode.
    pub async fn for_config(config: &StudyConfig) -> Self {
        let mut set = Self::new().with(StudyJsonAdapter::new(&config.default_question));
        if let Some(section) = &config.result_code {
            set = set.with(ResultCodeAdapter::from_config(config, section).await);
        }
        set
    }

    pub fn extract(&self, record: &CollectedRecord) -> Result<Extraction, MalformedRecord> {
        if !record.payload.is_object() {
            return Err(MalformedRecord::new(&record.source, "record is not a JSON object"));
        }
        let adapter = self
            .adapters
            .iter()
            .find(|a| a.accepts(&record.payload))
            .ok_or_else(|| MalformedRecord::new(&record.source, "unrecognised record shape"))?;

        debug!(source = %record.source, adapter = adapter.name(), "Extracting record");
        adapter.extract(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(payload: Value) -> CollectedRecord {
        CollectedRecord {
            source: "test.json".into(),
            payload,
        }
    }

    #[test]
    fn test_json_adapter_both_choice_shapes() {
        let adapter = StudyJsonAdapter::new("overall_quality");
        let out = adapter
            .extract(&record(json!({
                "participantId": "p1",
                "responses": {
                    "foo_vs_bar": {
                        "v1": " A ",
                        "v2_comparison.mp4": {"answers": {"motion": "B", "overall_quality": "A"}},
                        "v3": {"timestamp": 1}
                    }
                }
            })))
            .unwrap();

        assert_eq!(out.participant, "p1");
        assert_eq!(out.choices.len(), 3);
        assert_eq!(out.choices[0].question, "overall_quality");
        assert_eq!(out.choices[0].choice, "A");
        assert!(out.choices.iter().any(|c| c.question == "motion" && c.choice == "B"));
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn test_json_adapter_keeps_good_entries_next_to_odd_ones() {
        let adapter = StudyJsonAdapter::new("overall_quality");
        let out = adapter
            .extract(&record(json!({
                "participantId": "p1",
                "responses": {
                    "baz_vs_bar": "A",
                    "foo_vs_bar": {"v1": "A", "v2": null, "v3": [1], "v4": 7}
                }
            })))
            .unwrap();

        let picks: Vec<(&str, &str)> = out
            .choices
            .iter()
            .map(|c| (c.identity.as_str(), c.choice.as_str()))
            .collect();
        assert_eq!(picks, vec![("v1", "A"), ("v2", "null"), ("v4", "7")]);

        assert_eq!(out.diagnostics.len(), 2);
        assert!(out.diagnostics[0].contains("baz_vs_bar"));
        assert!(out.diagnostics[1].contains("v3"));
    }

    #[test]
    fn test_json_adapter_missing_participant() {
        let adapter = StudyJsonAdapter::new("q");
        let err = adapter
            .extract(&record(json!({"responses": {}})))
            .unwrap_err();
        assert_eq!(err.source_name, "test.json");
    }

    fn code_adapter() -> ResultCodeAdapter {
        let section = ResultCodeSection {
            pair_order: vec!["foo_vs_bar".into(), "baz_vs_bar".into()],
            questions: vec!["overall_quality".into(), "motion".into()],
        };
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "foo_vs_bar".to_string(),
            IndexMapping::from_files(["v1_comparison.mp4", "v2_comparison.mp4"]),
        );
        ResultCodeAdapter::new(&section, mappings)
    }

    #[test]
    fn test_result_codes_resolve_indices() {
        let out = code_adapter()
            .extract(&record(json!({
                "participantId": "alice",
                "resultCodes": ["0-1-1-21", "0-1-0-13"]
            })))
            .unwrap();

        assert_eq!(out.choices.len(), 4);
        let first = &out.choices[0];
        assert_eq!(first.pair, "foo_vs_bar");
        assert_eq!(first.identity, "v2_comparison.mp4");
        assert_eq!(first.question, "overall_quality");
        assert_eq!(first.choice, "B");
        assert_eq!(out.choices[1].choice, "A");
        // digit 3 is passed through and fails decoding later
        assert_eq!(out.choices[3].choice, "3");
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_result_code_bad_lines_are_diagnostics() {
        let out = code_adapter()
            .extract(&record(json!({
                "participantId": "alice",
                "resultCodes": ["5-1-0-11", "1-1-0-11", "0-1-9-11", "0-1-0-1", "0-1-0"]
            })))
            .unwrap();
        assert!(out.choices.is_empty());
        assert_eq!(out.diagnostics.len(), 5);
    }

    #[test]
    fn test_adapter_set_dispatch() {
        let set = AdapterSet::new()
            .with(StudyJsonAdapter::new("q"))
            .with(code_adapter());

        assert!(set
            .extract(&record(json!({"participantId": "p", "responses": {}})))
            .is_ok());
        assert!(set
            .extract(&record(json!({"participantId": "p", "resultCodes": []})))
            .is_ok());
        assert!(set.extract(&record(json!({"participantId": "p"}))).is_err());
        assert!(set.extract(&record(json!(["A"]))).is_err());
    }
}
