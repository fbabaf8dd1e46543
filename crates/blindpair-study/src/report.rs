//! Aggregation outputs: plain text, CSV tables and a JSON dump.

use blindpair_models::report::rank;
use blindpair_models::{ResponseRow, StudyReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::aggregator::Aggregation;
use crate::error::StudyResult;

pub const TEXT_REPORT_FILENAME: &str = "aggregated_results.txt";
pub const JSON_REPORT_FILENAME: &str = "detailed_results.json";
pub const MODEL_CSV_FILENAME: &str = "model_preferences.csv";
pub const QUESTION_CSV_FILENAME: &str = "question_results.csv";
pub const PAIR_CSV_FILENAME: &str = "pair_results.csv";
pub const RESPONSES_CSV_FILENAME: &str = "all_responses.csv";

const WIDE_RULE: usize = 60;

// ============================================================================
// Text
// ============================================================================

/// Human-readable report.
pub fn render_text(report: &StudyReport, study_name: &str) -> String {
    let rule = "=".repeat(WIDE_RULE);
    let thin = "-".repeat(WIDE_RULE);
    let s = &report.summary;

    let mut lines = vec![
        rule.clone(),
        format!("BLIND PREFERENCE STUDY RESULTS: {}", study_name),
        rule,
        format!("Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        String::new(),
        "SUMMARY".to_string(),
        thin.clone(),
        format!("Records seen: {}", s.records_seen),
        format!("Malformed records skipped: {}", s.malformed_records),
        format!("Malformed entries skipped: {}", s.malformed_entries),
        format!("Unique participants: {}", s.participants),
        format!("Choices extracted: {}", s.choices_extracted),
        format!("Decoded: {}", s.decoded),
        format!("Duplicates skipped: {}", s.duplicates),
        format!(
            "Undecodable: {} (order sheet missing: {}, lookup miss: {}, invalid choice: {})",
            s.failures.total(),
            s.failures.order_sheet_missing,
            s.failures.lookup_miss,
            s.failures.invalid_choice
        ),
        String::new(),
        "OVERALL MODEL PREFERENCES".to_string(),
        thin.clone(),
    ];

    if report.overall.is_empty() {
        lines.push("  (no decoded choices)".to_string());
    }
    lines.extend(
        report
            .ranked_overall()
            .into_iter()
            .map(|(model, stats)| format!("  {}: {}", model, stats)),
    );
    lines.push(String::new());

    for question in report.questions.values() {
        lines.push(format!(
            "QUESTION: {} ({} choices)",
            question.question, question.choices
        ));
        lines.push(thin.clone());
        lines.extend(
            rank(&question.models)
                .into_iter()
                .map(|(model, stats)| format!("  {}: {}", model, stats)),
        );
        lines.push(String::new());
    }

    lines.push("PAIRWISE RESULTS".to_string());
    lines.push(thin);
    for pair in report.pairs.values() {
        lines.push(format!("{} ({} choices)", pair.pair, pair.overall.total()));
        lines.push(format!("  {} (method A): {}", pair.method_a, pair.overall.method_a));
        lines.push(format!("  {} (method B): {}", pair.method_b, pair.overall.method_b));
        for (question, tally) in &pair.by_question {
            lines.push(format!(
                "    {}: {} {} / {} {}",
                question, pair.method_a, tally.method_a, pair.method_b, tally.method_b
            ));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// ============================================================================
// CSV
// ============================================================================

/// Quote a CSV field when it needs it.
fn csv_field(value: &str) -> String {
    if value.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(out: &mut String, fields: &[&str]) {
    let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn rate(value: f64) -> String {
    format!("{:.4}", value)
}

pub fn model_preferences_csv(report: &StudyReport) -> String {
    let mut out = String::new();
    csv_line(&mut out, &["model", "wins", "total", "win_rate"]);
    for (model, stats) in report.ranked_overall() {
        csv_line(
            &mut out,
            &[
                model,
                stats.wins.to_string().as_str(),
                stats.total.to_string().as_str(),
                rate(stats.win_rate).as_str(),
            ],
        );
    }
    out
}

pub fn question_results_csv(report: &StudyReport) -> String {
    let mut out = String::new();
    csv_line(&mut out, &["question", "model", "wins", "total", "win_rate"]);
    for question in report.questions.values() {
        for (model, stats) in rank(&question.models) {
            csv_line(
                &mut out,
                &[
                    question.question.as_str(),
                    model,
                    stats.wins.to_string().as_str(),
                    stats.total.to_string().as_str(),
                    rate(stats.win_rate).as_str(),
                ],
            );
        }
    }
    out
}

/// Pair breakdown; the `all` question row is the pair's overall tally.
pub fn pair_results_csv(report: &StudyReport) -> String {
    let mut out = String::new();
    csv_line(
        &mut out,
        &[
            "pair",
            "question",
            "method_a",
            "method_a_wins",
            "method_b",
            "method_b_wins",
            "total",
            "method_a_win_rate",
            "method_b_win_rate",
        ],
    );
    for pair in report.pairs.values() {
        let rows = std::iter::once(("all", &pair.overall))
            .chain(pair.by_question.iter().map(|(q, t)| (q.as_str(), t)));
        for (question, tally) in rows {
            csv_line(
                &mut out,
                &[
                    pair.pair.as_str(),
                    question,
                    pair.method_a.as_str(),
                    tally.method_a.wins.to_string().as_str(),
                    pair.method_b.as_str(),
                    tally.method_b.wins.to_string().as_str(),
                    tally.total().to_string().as_str(),
                    rate(tally.method_a.win_rate).as_str(),
                    rate(tally.method_b.win_rate).as_str(),
                ],
            );
        }
    }
    out
}

pub fn all_responses_csv(rows: &[ResponseRow]) -> String {
    let mut out = String::new();
    csv_line(
        &mut out,
        &[
            "participant",
            "pair",
            "identity",
            "question",
            "raw_choice",
            "status",
            "chosen_model",
            "other_model",
        ],
    );
    for row in rows {
        csv_line(
            &mut out,
            &[
                row.participant.as_str(),
                row.pair.as_str(),
                row.identity.as_str(),
                row.question.as_str(),
                row.raw_choice.as_str(),
                row.status.as_str(),
                row.chosen_model.as_deref().unwrap_or_default(),
                row.other_model.as_deref().unwrap_or_default(),
            ],
        );
    }
    out
}

// ============================================================================
// Files
// ============================================================================

#[derive(Serialize)]
struct DetailedResults<'a> {
    study_name: &'a str,
    report: &'a StudyReport,
    responses: &'a [ResponseRow],
    diagnostics: &'a [String],
}

/// Write every output file into `dir`; returns the written paths.
pub async fn write_outputs(
    dir: &Path,
    aggregation: &Aggregation,
    study_name: &str,
) -> StudyResult<Vec<PathBuf>> {
    fs::create_dir_all(dir).await?;
    let report = &aggregation.report;

    let detailed = serde_json::to_string_pretty(&DetailedResults {
        study_name,
        report,
        responses: &aggregation.rows,
        diagnostics: &aggregation.diagnostics,
    })?;

    let files = [
        (TEXT_REPORT_FILENAME, render_text(report, study_name)),
        (JSON_REPORT_FILENAME, detailed),
        (MODEL_CSV_FILENAME, model_preferences_csv(report)),
        (QUESTION_CSV_FILENAME, question_results_csv(report)),
        (PAIR_CSV_FILENAME, pair_results_csv(report)),
        (RESPONSES_CSV_FILENAME, all_responses_csv(&aggregation.rows)),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = dir.join(name);
        fs::write(&path, contents).await?;
        written.push(path);
    }

    info!(dir = %dir.display(), files = written.len(), "Wrote aggregation outputs");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blindpair_models::{DecodeStatus, PairStats, PairTally, QuestionStats, RunSummary, WinStats};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn sample_report() -> StudyReport {
        let mut overall = BTreeMap::new();
        overall.insert("foo".to_string(), WinStats::new(1, 2));
        overall.insert("bar".to_string(), WinStats::new(1, 2));

        let mut questions = BTreeMap::new();
        questions.insert(
            "overall_quality".to_string(),
            QuestionStats {
                question: "overall_quality".into(),
                choices: 2,
                models: overall.clone(),
            },
        );

        let mut tally = PairTally::default();
        tally.record(true);
        tally.record(false);
        let mut pairs = BTreeMap::new();
        pairs.insert(
            "foo_vs_bar".to_string(),
            PairStats {
                pair: "foo_vs_bar".into(),
                method_a: "foo".into(),
                method_b: "bar".into(),
                overall: tally.clone(),
                by_question: BTreeMap::from([("overall_quality".to_string(), tally)]),
            },
        );

        StudyReport {
            generated_at: Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap(),
            summary: RunSummary {
                records_seen: 2,
                participants: 2,
                choices_extracted: 2,
                decoded: 2,
                ..RunSummary::default()
            },
            overall,
            questions,
            pairs,
        }
    }

    #[test]
    fn test_text_report_lists_models() {
        let text = render_text(&sample_report(), "demo");
        assert!(text.contains("foo: 1/2 (0.500)"));
        assert!(text.contains("bar: 1/2 (0.500)"));
        assert!(text.contains("foo_vs_bar (2 choices)"));
        assert!(text.contains("Undecodable: 0"));
    }

    #[test]
    fn test_text_report_layout() {
        let text = render_text(&sample_report(), "demo");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=".repeat(WIDE_RULE));
        assert_eq!(lines[1], "BLIND PREFERENCE STUDY RESULTS: demo");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "SUMMARY");
        assert!(lines.contains(&"PAIRWISE RESULTS"));
        assert!(!text.contains("(no decoded choices)"));
        assert!(text.ends_with('\n'));
        assert!(!text.ends_with("\n\n"));
    }

    #[test]
    fn test_model_csv() {
        let csv = model_preferences_csv(&sample_report());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "model,wins,total,win_rate");
        assert_eq!(lines[1], "bar,1,2,0.5000");
        assert_eq!(lines[2], "foo,1,2,0.5000");
    }

    #[test]
    fn test_pair_csv_has_overall_row() {
        let csv = pair_results_csv(&sample_report());
        assert!(csv
            .lines()
            .any(|l| l == "foo_vs_bar,all,foo,1,bar,1,2,0.5000,0.5000"));
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"A\""), "\"say \"\"A\"\"\"");
    }

    #[test]
    fn test_responses_csv() {
        let rows = vec![ResponseRow {
            participant: "p1".into(),
            pair: "foo_vs_bar".into(),
            identity: "v1".into(),
            question: "q".into(),
            raw_choice: "C".into(),
            status: DecodeStatus::InvalidChoice,
            chosen_model: None,
            other_model: None,
        }];
        let csv = all_responses_csv(&rows);
        assert!(csv.lines().any(|l| l == "p1,foo_vs_bar,v1,q,C,invalid_choice,,"));
    }
}
