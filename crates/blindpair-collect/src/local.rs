//! Local result files.
//!
//! A results path is either one file or a directory of files:
//! - `*.json`: one record object, or an array of records
//! - `*.txt`: result codes; the participant id is the file stem

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{CollectError, CollectResult};
use crate::extract::extract_result_codes;
use crate::source::{CollectedRecord, FetchReport, ResponseSource};

/// Records stored on disk.
#[derive(Debug, Clone)]
pub struct LocalSource {
    path: PathBuf,
}

impl LocalSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn files(&self) -> CollectResult<Vec<PathBuf>> {
        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }
        if !self.path.is_dir() {
            return Err(CollectError::DirectoryNotFound(self.path.clone()));
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && has_extension(&path, &["json", "txt"]) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl ResponseSource for LocalSource {
    fn describe(&self) -> String {
        format!("local:{}", self.path.display())
    }

    async fn fetch_all(&self) -> CollectResult<FetchReport> {
        let mut report = FetchReport::default();

        for path in self.files().await? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            let text = match fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) => {
                    report.items_seen += 1;
                    report.skip(format!("{}: unreadable: {}", name, e));
                    continue;
                }
            };

            if has_extension(&path, &["json"]) {
                read_json_file(&name, &text, &mut report);
            } else {
                read_code_file(&path, &name, &text, &mut report);
            }
        }

        debug!(
            source = %self.describe(),
            records = report.records.len(),
            skipped = report.skipped.len(),
            "Read local results"
        );
        Ok(report)
    }
}

fn read_json_file(name: &str, text: &str, report: &mut FetchReport) {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => {
            for (i, item) in items.into_iter().enumerate() {
                report.items_seen += 1;
                if item.is_object() {
                    report.records.push(CollectedRecord {
                        source: format!("{}[{}]", name, i),
                        payload: item,
                    });
                } else {
                    report.skip(format!("{}[{}]: not a JSON object", name, i));
                }
            }
        }
        Ok(item @ Value::Object(_)) => {
            report.items_seen += 1;
            report.records.push(CollectedRecord {
                source: name.to_string(),
                payload: item,
            });
        }
        Ok(_) => {
            report.items_seen += 1;
            report.skip(format!("{}: not a JSON object or array", name));
        }
        Err(e) => {
            report.items_seen += 1;
            report.skip(format!("{}: invalid JSON: {}", name, e));
        }
    }
}

fn read_code_file(path: &Path, name: &str, text: &str, report: &mut FetchReport) {
    report.items_seen += 1;
    let codes = extract_result_codes(text);
    if codes.is_empty() {
        report.skip(format!("{}: no result codes", name));
        return;
    }

    let participant = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());

    report.records.push(CollectedRecord {
        source: name.to_string(),
        payload: json!({
            "participantId": participant,
            "resultCodes": codes,
        }),
    });
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| extensions.contains(&e.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_json_and_code_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"participantId": "p1", "responses": {}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("batch.json"),
            r#"[{"participantId": "p2", "responses": {}}, 42]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("alice.txt"), "0-1-3-1221\\n1-1-8-1122").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let report = LocalSource::new(dir.path()).fetch_all().await.unwrap();

        let sources: Vec<&str> = report.records.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["a.json", "alice.txt", "batch.json[0]"]);
        assert_eq!(report.items_seen, 5);
        assert_eq!(report.skipped.len(), 2);

        let alice = &report.records[1].payload;
        assert_eq!(alice["participantId"], "alice");
        assert_eq!(alice["resultCodes"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_single_file_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("collected_results.json");
        std::fs::write(&file, r#"[{"participantId": "p1", "responses": {}}]"#).unwrap();

        let report = LocalSource::new(&file).fetch_all().await.unwrap();
        assert_eq!(report.records.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_path() {
        let err = LocalSource::new("/no/such/results").fetch_all().await.unwrap_err();
        assert!(matches!(err, CollectError::DirectoryNotFound(_)));
    }
}
