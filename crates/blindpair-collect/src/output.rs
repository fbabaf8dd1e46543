//! Collection output directory.
//!
//! Each run writes into `<root>/<YYYY-MM-DD>/collection_<HHMMSS>/`:
//! `collected_results.json` (array of record payloads, readable again as a
//! local source) and `collection_report.txt`.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::CollectResult;
use crate::source::FetchReport;

pub const RESULTS_FILENAME: &str = "collected_results.json";
pub const REPORT_FILENAME: &str = "collection_report.txt";

/// Files written by one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPaths {
    pub dir: PathBuf,
    pub results_file: PathBuf,
    pub report_file: PathBuf,
}

/// Run directory for a collection started at `now`.
pub fn collection_dir(root: &Path, now: NaiveDateTime) -> PathBuf {
    root.join(now.format("%Y-%m-%d").to_string())
        .join(format!("collection_{}", now.format("%H%M%S")))
}

/// Write the collected records and a short report.
pub async fn write_collection(
    root: &Path,
    sources: &[String],
    report: &FetchReport,
    now: NaiveDateTime,
) -> CollectResult<CollectionPaths> {
    let dir = collection_dir(root, now);
    fs::create_dir_all(&dir).await?;

    let payloads: Vec<&serde_json::Value> = report.records.iter().map(|r| &r.payload).collect();
    let results_file = dir.join(RESULTS_FILENAME);
    fs::write(&results_file, serde_json::to_string_pretty(&payloads)?).await?;

    let report_file = dir.join(REPORT_FILENAME);
    fs::write(&report_file, render_report(sources, report, now)).await?;

    info!(
        dir = %dir.display(),
        records = report.records.len(),
        "Wrote collection"
    );

    Ok(CollectionPaths {
        dir,
        results_file,
        report_file,
    })
}

fn render_report(sources: &[String], report: &FetchReport, now: NaiveDateTime) -> String {
    let rule = "=".repeat(60);

    let mut lines = vec![
        rule.clone(),
        "RESPONSE COLLECTION REPORT".to_string(),
        rule,
        format!("Collected at: {}", now.format("%Y-%m-%d %H:%M:%S")),
        format!("Sources: {}", sources.join(", ")),
        format!("Items inspected: {}", report.items_seen),
        format!("Records collected: {}", report.records.len()),
        format!("Items skipped: {}", report.skipped.len()),
    ];
    if let Some(error) = &report.error {
        lines.push(format!("Retrieval stopped early: {}", error));
    }

    if !report.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped:".to_string());
        lines.extend(report.skipped.iter().map(|line| format!("  - {}", line)));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::CollectedRecord;
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::TempDir;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 1)
            .unwrap()
    }

    #[test]
    fn test_collection_dir_layout() {
        let dir = collection_dir(Path::new("out"), at());
        assert_eq!(dir, PathBuf::from("out/2025-03-07/collection_090501"));
    }

    #[tokio::test]
    async fn test_write_collection() {
        let root = TempDir::new().unwrap();
        let report = FetchReport {
            records: vec![CollectedRecord {
                source: "github#1".into(),
                payload: json!({"participantId": "p1", "responses": {}}),
            }],
            items_seen: 2,
            skipped: vec!["issue #2: no JSON record or result codes in body".into()],
            error: None,
        };

        let paths = write_collection(root.path(), &["github:lab/study".into()], &report, at())
            .await
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.results_file).unwrap()).unwrap();
        assert_eq!(written.as_array().unwrap().len(), 1);
        assert_eq!(written[0]["participantId"], "p1");

        let text = std::fs::read_to_string(&paths.report_file).unwrap();
        assert!(text.contains("Records collected: 1"));
        assert!(text.contains("issue #2"));
    }

    #[test]
    fn test_render_report_lines() {
        let report = FetchReport {
            records: Vec::new(),
            items_seen: 3,
            skipped: vec!["a.json: not an object".into(), "b.txt: empty".into()],
            error: Some("page 2: Rate limited, retry after 0ms".into()),
        };

        let text = render_report(&["local:results".into()], &report, at());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[1], "RESPONSE COLLECTION REPORT");
        assert_eq!(lines[3], "Collected at: 2025-03-07 09:05:01");
        assert_eq!(lines[8], "Retrieval stopped early: page 2: Rate limited, retry after 0ms");
        assert_eq!(lines[9], "");
        assert_eq!(&lines[10..], &["Skipped:", "  - a.json: not an object", "  - b.txt: empty"]);
        assert!(text.ends_with("b.txt: empty\n"));
    }
}
