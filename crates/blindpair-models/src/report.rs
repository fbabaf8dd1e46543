//! Decoded choices, win statistics and run summaries.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Win statistics
// ============================================================================

/// Wins and appearances of one model within a scope.
///
/// `win_rate` is kept in sync by the mutating methods and is 0 when
/// `total` is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WinStats {
    pub wins: u64,
    pub total: u64,
    pub win_rate: f64,
}

impl WinStats {
    pub fn new(wins: u64, total: u64) -> Self {
        let mut stats = Self {
            wins,
            total,
            win_rate: 0.0,
        };
        stats.refresh();
        stats
    }

    /// Record one appearance, won or lost.
    pub fn record(&mut self, won: bool) {
        if won {
            self.wins += 1;
        }
        self.total += 1;
        self.refresh();
    }

    pub fn losses(&self) -> u64 {
        self.total - self.wins
    }

    /// Add another scope's counts into this one.
    pub fn merge(&mut self, other: &WinStats) {
        self.wins += other.wins;
        self.total += other.total;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.win_rate = if self.total == 0 {
            0.0
        } else {
            self.wins as f64 / self.total as f64
        };
    }
}

impl fmt::Display for WinStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.3})", self.wins, self.total, self.win_rate)
    }
}

/// Per-model statistics for one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionStats {
    pub question: String,
    /// Decoded choices counted under this question.
    pub choices: u64,
    pub models: BTreeMap<String, WinStats>,
}

/// Head-to-head counts of one pair, from the perspective of its two methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PairTally {
    pub method_a: WinStats,
    pub method_b: WinStats,
}

impl PairTally {
    /// Count one decoded choice; `a_won` is true when method A was chosen.
    pub fn record(&mut self, a_won: bool) {
        self.method_a.record(a_won);
        self.method_b.record(!a_won);
    }

    /// Number of decoded choices; equal for both methods.
    pub fn total(&self) -> u64 {
        self.method_a.total
    }
}

/// Results of one comparison pair.
///
/// `method_a` is the pair's left (subject) model and `method_b` its right
/// (baseline) model, regardless of on-screen placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PairStats {
    pub pair: String,
    pub method_a: String,
    pub method_b: String,
    pub overall: PairTally,
    pub by_question: BTreeMap<String, PairTally>,
}

// ============================================================================
// Decoded choices
// ============================================================================

/// Outcome of decoding one extracted choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStatus {
    Decoded,
    Duplicate,
    OrderSheetMissing,
    LookupMiss,
    InvalidChoice,
}

impl DecodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeStatus::Decoded => "decoded",
            DecodeStatus::Duplicate => "duplicate",
            DecodeStatus::OrderSheetMissing => "order_sheet_missing",
            DecodeStatus::LookupMiss => "lookup_miss",
            DecodeStatus::InvalidChoice => "invalid_choice",
        }
    }

    /// Whether the choice was excluded because it could not be decoded.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DecodeStatus::OrderSheetMissing | DecodeStatus::LookupMiss | DecodeStatus::InvalidChoice
        )
    }
}

impl fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw A/B pick translated back into model names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DecodedChoice {
    pub participant: String,
    pub pair: String,
    pub identity: String,
    pub question: String,
    pub chosen_model: String,
    pub other_model: String,
}

/// One extracted choice with its decode outcome (`all_responses.csv` row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseRow {
    pub participant: String,
    pub pair: String,
    /// Identity as submitted, before normalization.
    pub identity: String,
    pub question: String,
    pub raw_choice: String,
    pub status: DecodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_model: Option<String>,
}

// ============================================================================
// Run summary
// ============================================================================

/// Undecodable choices by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FailureCounts {
    pub order_sheet_missing: u64,
    pub lookup_miss: u64,
    pub invalid_choice: u64,
}

impl FailureCounts {
    pub fn total(&self) -> u64 {
        self.order_sheet_missing + self.lookup_miss + self.invalid_choice
    }

    /// Count one failed decode; non-failure statuses are ignored.
    pub fn record(&mut self, status: DecodeStatus) {
        match status {
            DecodeStatus::OrderSheetMissing => self.order_sheet_missing += 1,
            DecodeStatus::LookupMiss => self.lookup_miss += 1,
            DecodeStatus::InvalidChoice => self.invalid_choice += 1,
            DecodeStatus::Decoded | DecodeStatus::Duplicate => {}
        }
    }
}

/// End-of-run summary of one aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub records_seen: u64,
    pub malformed_records: u64,
    /// Unusable entries inside otherwise valid records
    pub malformed_entries: u64,
    pub participants: u64,
    pub choices_extracted: u64,
    pub decoded: u64,
    pub duplicates: u64,
    pub failures: FailureCounts,
}

// ============================================================================
// Report
// ============================================================================

/// Full aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StudyReport {
    pub generated_at: DateTime<Utc>,
    pub summary: RunSummary,
    /// Question-agnostic roll-up per model.
    pub overall: BTreeMap<String, WinStats>,
    pub questions: BTreeMap<String, QuestionStats>,
    pub pairs: BTreeMap<String, PairStats>,
}

impl StudyReport {
    /// Overall models sorted by win rate (descending), then by name.
    pub fn ranked_overall(&self) -> Vec<(&str, &WinStats)> {
        rank(&self.overall)
    }
}

/// Sort a model map by win rate (descending), then by name.
pub fn rank(models: &BTreeMap<String, WinStats>) -> Vec<(&str, &WinStats)> {
    let mut ranked: Vec<(&str, &WinStats)> =
        models.iter().map(|(m, s)| (m.as_str(), s)).collect();
    ranked.sort_by(|a, b| {
        b.1.win_rate
            .partial_cmp(&a.1.win_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked
}
