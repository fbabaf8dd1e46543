//! Study configuration (`study_config.json`).
//!
//! Relative paths in the file are resolved against the directory that
//! contains the config file, so a study directory can be moved as a whole.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::encoding::EncodingConfig;
use crate::error::{ModelError, ModelResult};
use crate::pair::ComparisonPair;

/// Order sheet file name inside a pair's output folder.
pub const ORDER_SHEET_FILENAME: &str = "order_sheet.txt";
/// Index mapping file name inside a pair's output folder.
pub const INDEX_MAPPING_FILENAME: &str = "index_mapping.txt";

/// Default question for choices stored without a question name.
pub const DEFAULT_QUESTION: &str = "overall_quality";
/// Default seed for left/right placement.
pub const DEFAULT_SEED: u64 = 42;

/// Top-level study configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StudyConfig {
    #[serde(default = "default_study_name")]
    pub study_name: String,

    /// Directory holding one sub-directory of videos per model.
    #[serde(default = "default_raw_videos_dir")]
    pub raw_videos_dir: PathBuf,

    /// Directory receiving one sub-directory per comparison pair.
    #[serde(default = "default_comparisons_dir")]
    pub comparisons_dir: PathBuf,

    /// Seed for the placement RNG, fixed per builder run.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Question receiving choices that carry no question name.
    #[serde(default = "default_question")]
    pub default_question: String,

    /// Questions asked per comparison video, in display order.
    #[serde(default)]
    pub questions: Vec<String>,

    pub comparison_sets: Vec<ComparisonSetConfig>,

    #[serde(default)]
    pub encoding: EncodingConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_code: Option<ResultCodeSection>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    #[schemars(skip)]
    pub base_dir: PathBuf,
}

/// One comparison pair of the study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComparisonSetConfig {
    /// Canonical pair name (`{left}_vs_{right}`), also the key used in responses.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    /// Override for the order sheet location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_file: Option<PathBuf>,
    /// Override for the folder receiving rendered comparison videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_folder: Option<PathBuf>,
}

/// Where participant submissions are filed as GitHub issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GithubSection {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_issue_label")]
    pub label: String,
    #[serde(default = "default_issue_state")]
    pub state: String,
}

/// Decoding table for result-code submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultCodeSection {
    /// Pair names indexed by the first code component.
    pub pair_order: Vec<String>,
    /// Questions indexed by answer digit position.
    pub questions: Vec<String>,
}

fn default_study_name() -> String {
    "user_study".to_string()
}
fn default_raw_videos_dir() -> PathBuf {
    PathBuf::from("raw_videos")
}
fn default_comparisons_dir() -> PathBuf {
    PathBuf::from("user_study_comparisons")
}
fn default_seed() -> u64 {
    DEFAULT_SEED
}
fn default_question() -> String {
    DEFAULT_QUESTION.to_string()
}
fn default_issue_label() -> String {
    "user-study-result".to_string()
}
fn default_issue_state() -> String {
    "all".to_string()
}

impl ComparisonSetConfig {
    /// Resolve the pair, preferring explicit `left`/`right` over the name.
    pub fn pair(&self) -> ModelResult<ComparisonPair> {
        match (&self.left, &self.right) {
            (Some(left), Some(right)) => {
                let pair = ComparisonPair::new(left.as_str(), right.as_str())?;
                if pair.name() != self.name {
                    return Err(ModelError::invalid_config(format!(
                        "comparison set '{}' does not match its models ({})",
                        self.name,
                        pair.name()
                    )));
                }
                Ok(pair)
            }
            (None, None) => self.name.parse(),
            _ => Err(ModelError::invalid_config(format!(
                "comparison set '{}' must set both left and right or neither",
                self.name
            ))),
        }
    }
}

impl StudyConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::ConfigNotFound(path.to_path_buf()));
        }

        let text = std::fs::read_to_string(path)?;
        let mut config: StudyConfig = serde_json::from_str(&text)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Check pair names, uniqueness and the result-code table.
    pub fn validate(&self) -> ModelResult<()> {
        if self.comparison_sets.is_empty() {
            return Err(ModelError::invalid_config("no comparison_sets defined"));
        }

        let mut seen = HashSet::new();
        for set in &self.comparison_sets {
            set.pair()?;
            if !seen.insert(set.name.as_str()) {
                return Err(ModelError::invalid_config(format!(
                    "duplicate comparison set '{}'",
                    set.name
                )));
            }
        }

        if let Some(rc) = &self.result_code {
            for name in &rc.pair_order {
                if !seen.contains(name.as_str()) {
                    return Err(ModelError::invalid_config(format!(
                        "result_code.pair_order references unknown pair '{}'",
                        name
                    )));
                }
            }
            if rc.questions.is_empty() {
                return Err(ModelError::invalid_config("result_code.questions is empty"));
            }
        }

        Ok(())
    }

    /// Resolve a possibly relative path against the config directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// All pairs, in config order.
    pub fn pairs(&self) -> ModelResult<Vec<ComparisonPair>> {
        self.comparison_sets.iter().map(|s| s.pair()).collect()
    }

    /// Look up a comparison set by pair name.
    pub fn find_set(&self, name: &str) -> Option<&ComparisonSetConfig> {
        self.comparison_sets.iter().find(|s| s.name == name)
    }

    /// Folder receiving the rendered videos of a pair.
    pub fn video_folder(&self, set: &ComparisonSetConfig) -> PathBuf {
        match &set.video_folder {
            Some(p) => self.resolve(p),
            None => self.resolve(&self.comparisons_dir).join(&set.name),
        }
    }

    /// Order sheet location of a pair.
    pub fn order_sheet_path(&self, set: &ComparisonSetConfig) -> PathBuf {
        match &set.order_file {
            Some(p) => self.resolve(p),
            None => self.video_folder(set).join(ORDER_SHEET_FILENAME),
        }
    }

    /// Index mapping location of a pair.
    pub fn index_mapping_path(&self, set: &ComparisonSetConfig) -> PathBuf {
        self.video_folder(set).join(INDEX_MAPPING_FILENAME)
    }

    /// Directory holding one model's raw videos.
    pub fn model_dir(&self, model: &str) -> PathBuf {
        self.resolve(&self.raw_videos_dir).join(model)
    }

    /// Questions to report on; falls back to the default question alone.
    pub fn question_list(&self) -> Vec<String> {
        if self.questions.is_empty() {
            vec![self.default_question.clone()]
        } else {
            self.questions.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "study_name": "deepsink",
        "comparison_sets": [
            {"name": "deepsink_vs_self_forcing"},
            {"name": "deepsink_vs_causvid", "left": "deepsink", "right": "causvid",
             "order_file": "sheets/causvid.txt"}
        ],
        "result_code": {"pair_order": ["deepsink_vs_causvid"], "questions": ["q1", "q2"]}
    }"#;

    fn write_config(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("study_config.json");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_load_with_defaults() {
        let dir = TempDir::new().unwrap();
        let config = StudyConfig::load(write_config(&dir, SAMPLE)).unwrap();

        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.default_question, DEFAULT_QUESTION);
        assert_eq!(config.question_list(), vec![DEFAULT_QUESTION.to_string()]);
        assert_eq!(config.pairs().unwrap().len(), 2);
    }

    #[test]
    fn test_paths_resolve_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let config = StudyConfig::load(write_config(&dir, SAMPLE)).unwrap();

        let first = &config.comparison_sets[0];
        assert_eq!(
            config.order_sheet_path(first),
            dir.path()
                .join("user_study_comparisons")
                .join("deepsink_vs_self_forcing")
                .join(ORDER_SHEET_FILENAME)
        );

        let second = &config.comparison_sets[1];
        assert_eq!(config.order_sheet_path(second), dir.path().join("sheets/causvid.txt"));
        assert_eq!(config.model_dir("causvid"), dir.path().join("raw_videos/causvid"));
    }

    #[test]
    fn test_mismatched_name_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"comparison_sets": [{"name": "a_vs_b", "left": "b", "right": "a"}]}"#,
        );
        assert!(matches!(
            StudyConfig::load(path),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_duplicate_and_unknown_pairs_rejected() {
        let dir = TempDir::new().unwrap();
        let dup = write_config(
            &dir,
            r#"{"comparison_sets": [{"name": "a_vs_b"}, {"name": "a_vs_b"}]}"#,
        );
        assert!(StudyConfig::load(dup).is_err());

        let unknown = write_config(
            &dir,
            r#"{"comparison_sets": [{"name": "a_vs_b"}],
                "result_code": {"pair_order": ["x_vs_y"], "questions": ["q"]}}"#,
        );
        assert!(StudyConfig::load(unknown).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = StudyConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ModelError::ConfigNotFound(_)));
    }
}
