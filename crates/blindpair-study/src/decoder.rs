//! Label decoding.
//!
//! Every raw "A"/"B" goes through the pair's order sheet. Nothing here
//! assumes a fixed placement of the pair's left or right model.

use blindpair_models::{Label, OrderSheetEntry, StudyConfig};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{DecodeError, StudyError, StudyResult};
use crate::order_sheet::OrderSheet;

/// Metric names.
pub mod names {
    pub const DECODE_TOTAL: &str = "blindpair_decode_total";
}

/// The model a participant actually picked, and the one they passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub chosen: String,
    pub other: String,
}

/// Map a raw choice through one order sheet entry.
pub fn decode_entry(entry: &OrderSheetEntry, raw_choice: &str) -> Result<Decoded, DecodeError> {
    let label: Label = raw_choice
        .parse()
        .map_err(|_| DecodeError::InvalidChoice {
            choice: raw_choice.to_string(),
        })?;

    Ok(Decoded {
        chosen: entry.model_for(label).to_string(),
        other: entry.model_for(label.other()).to_string(),
    })
}

/// Order sheets of every pair, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct OrderSheetBook {
    sheets: BTreeMap<String, OrderSheet>,
}

impl OrderSheetBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pair_name: impl Into<String>, sheet: OrderSheet) {
        self.sheets.insert(pair_name.into(), sheet);
    }

    pub fn get(&self, pair_name: &str) -> Option<&OrderSheet> {
        self.sheets.get(pair_name)
    }

    pub fn pair_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Load the order sheet of every configured pair.
    ///
    /// Missing sheets are logged and left out, so their choices decode as
    /// `OrderSheetMissing`. Fails only when no pair has a sheet at all.
    pub async fn load_for_config(config: &StudyConfig) -> StudyResult<Self> {
        let mut book = Self::new();
        let mut missing: Vec<PathBuf> = Vec::new();

        for set in &config.comparison_sets {
            let path = config.order_sheet_path(set);
            match OrderSheet::load(&path).await {
                Ok(sheet) => {
                    let pair = set.pair()?;
                    let foreign = sheet
                        .entries()
                        .iter()
                        .filter(|e| !e.matches_pair(&pair))
                        .count();
                    if foreign > 0 {
                        warn!(
                            pair = %set.name,
                            foreign,
                            "Order sheet has entries naming other models"
                        );
                    }
                    debug!(pair = %set.name, entries = sheet.len(), "Loaded order sheet");
                    book.insert(set.name.clone(), sheet);
                }
                Err(e) => {
                    warn!(pair = %set.name, path = %path.display(), error = %e, "Order sheet unavailable");
                    missing.push(path);
                }
            }
        }

        if book.is_empty() && !missing.is_empty() {
            return Err(StudyError::NoOrderSheets(missing));
        }

        info!(
            loaded = book.len(),
            missing = missing.len(),
            "Order sheets loaded"
        );
        Ok(book)
    }

    /// Decode one raw choice for (pair, identity).
    ///
    /// Checked in order: sheet present, identity present, choice valid.
    pub fn decode(&self, pair: &str, identity: &str, raw_choice: &str) -> Result<Decoded, DecodeError> {
        let result = self.decode_inner(pair, identity, raw_choice);
        let outcome = match &result {
            Ok(_) => "decoded",
            Err(e) => e.status().as_str(),
        };
        metrics::counter!(names::DECODE_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    fn decode_inner(&self, pair: &str, identity: &str, raw_choice: &str) -> Result<Decoded, DecodeError> {
        let sheet = self
            .sheets
            .get(pair)
            .ok_or_else(|| DecodeError::OrderSheetMissing {
                pair: pair.to_string(),
            })?;
        let entry = sheet
            .lookup(identity)
            .ok_or_else(|| DecodeError::LookupMiss {
                pair: pair.to_string(),
                identity: identity.to_string(),
            })?;
        decode_entry(entry, raw_choice)
    }

    /// Label the builder gave `model` for (pair, identity).
    pub fn encode_label(&self, pair: &str, identity: &str, model: &str) -> Option<Label> {
        self.sheets.get(pair)?.lookup(identity)?.label_of(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blindpair_models::{ComparisonSetConfig, ORDER_SHEET_FILENAME};
    use tempfile::TempDir;

    fn book() -> OrderSheetBook {
        let mut book = OrderSheetBook::new();
        book.insert(
            "foo_vs_bar",
            OrderSheet::parse("v1: Model A = foo, Model B = bar\nv2: Model A = bar, Model B = foo"),
        );
        book
    }

    #[test]
    fn test_decode_follows_order_sheet() {
        let book = book();
        let a = book.decode("foo_vs_bar", "v1", "A").unwrap();
        assert_eq!((a.chosen.as_str(), a.other.as_str()), ("foo", "bar"));

        // v2 was placed the other way round
        let a = book.decode("foo_vs_bar", "v2", "A").unwrap();
        assert_eq!((a.chosen.as_str(), a.other.as_str()), ("bar", "foo"));
    }

    #[test]
    fn test_failure_kinds_are_distinct() {
        let book = book();
        assert!(matches!(
            book.decode("baz_vs_bar", "v1", "A"),
            Err(DecodeError::OrderSheetMissing { .. })
        ));
        assert!(matches!(
            book.decode("foo_vs_bar", "v3", "A"),
            Err(DecodeError::LookupMiss { .. })
        ));
        assert!(matches!(
            book.decode("foo_vs_bar", "v1", "C"),
            Err(DecodeError::InvalidChoice { .. })
        ));
        assert!(matches!(
            book.decode("foo_vs_bar", "v1", "a"),
            Err(DecodeError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_encode_label() {
        let book = book();
        assert_eq!(book.encode_label("foo_vs_bar", "v2", "foo"), Some(Label::B));
        assert_eq!(book.encode_label("foo_vs_bar", "v2", "qux"), None);
        assert_eq!(book.encode_label("foo_vs_bar", "v9", "foo"), None);
    }

    fn config_with_sets(dir: &TempDir, names: &[&str]) -> StudyConfig {
        let sets: Vec<ComparisonSetConfig> = names
            .iter()
            .map(|n| ComparisonSetConfig {
                name: n.to_string(),
                left: None,
                right: None,
                order_file: None,
                video_folder: None,
            })
            .collect();
        let mut config: StudyConfig = serde_json::from_value(serde_json::json!({
            "comparison_sets": sets,
        }))
        .unwrap();
        config.base_dir = dir.path().to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_load_for_config_tolerates_missing_pairs() {
        let dir = TempDir::new().unwrap();
        let config = config_with_sets(&dir, &["foo_vs_bar", "baz_vs_bar"]);

        let folder = dir.path().join("user_study_comparisons").join("foo_vs_bar");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(
            folder.join(ORDER_SHEET_FILENAME),
            "v1: Model A = bar, Model B = foo\n",
        )
        .unwrap();

        let book = OrderSheetBook::load_for_config(&config).await.unwrap();
        assert_eq!(book.len(), 1);
        assert!(book.get("foo_vs_bar").is_some());
        assert!(matches!(
            book.decode("baz_vs_bar", "v1", "A"),
            Err(DecodeError::OrderSheetMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_for_config_fails_without_any_sheet() {
        let dir = TempDir::new().unwrap();
        let config = config_with_sets(&dir, &["foo_vs_bar"]);
        let err = OrderSheetBook::load_for_config(&config).await.unwrap_err();
        assert!(matches!(err, StudyError::NoOrderSheets(paths) if paths.len() == 1));
    }
}
