//! Aggregation of decoded choices into win statistics.

use blindpair_collect::CollectedRecord;
use blindpair_models::identity::canonicalize;
use blindpair_models::{
    ComparisonPair, DecodeStatus, DecodedChoice, PairStats, PairTally, QuestionStats,
    ResponseRow, RunSummary, StudyReport, WinStats,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

use crate::adapter::{AdapterSet, RawChoice};
use crate::decoder::OrderSheetBook;
use crate::logging::PairLogger;

// ============================================================================
// Tally
// ============================================================================

/// Win/total counters over decoded choices.
///
/// Each choice adds a win and an appearance to the chosen model and an
/// appearance to the other one, so two models compared only against each
/// other always share the same total. Tallies merge associatively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    overall: BTreeMap<String, WinStats>,
    questions: BTreeMap<String, QuestionStats>,
    pairs: BTreeMap<String, PairStats>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a question appear in the report even without choices.
    pub fn ensure_question(&mut self, question: &str) {
        self.question_mut(question);
    }

    /// Make a pair appear in the report even without choices.
    pub fn ensure_pair(&mut self, pair: &ComparisonPair) {
        self.pair_mut(pair);
    }

    fn question_mut(&mut self, question: &str) -> &mut QuestionStats {
        self.questions
            .entry(question.to_string())
            .or_insert_with(|| QuestionStats {
                question: question.to_string(),
                ..QuestionStats::default()
            })
    }

    fn pair_mut(&mut self, pair: &ComparisonPair) -> &mut PairStats {
        self.pairs.entry(pair.name()).or_insert_with(|| PairStats {
            pair: pair.name(),
            method_a: pair.left.clone(),
            method_b: pair.right.clone(),
            ..PairStats::default()
        })
    }

    /// Count one decoded choice made within `pair`.
    pub fn add(&mut self, pair: &ComparisonPair, choice: &DecodedChoice) {
        self.add_unpaired(choice);

        if !(pair.contains(&choice.chosen_model) && pair.contains(&choice.other_model)) {
            warn!(
                pair = %pair,
                chosen = %choice.chosen_model,
                other = %choice.other_model,
                "Decoded models do not belong to the pair, left out of pair stats"
            );
            return;
        }

        let a_won = choice.chosen_model == pair.left;
        let stats = self.pair_mut(pair);
        stats.overall.record(a_won);
        stats
            .by_question
            .entry(choice.question.clone())
            .or_default()
            .record(a_won);
    }

    /// Count one decoded choice in the overall and question stats only.
    pub fn add_unpaired(&mut self, choice: &DecodedChoice) {
        record(&mut self.overall, &choice.chosen_model, &choice.other_model);

        let question = self.question_mut(&choice.question);
        question.choices += 1;
        record(&mut question.models, &choice.chosen_model, &choice.other_model);
    }

    /// Fold another tally into this one.
    pub fn merge(&mut self, other: Tally) {
        merge_models(&mut self.overall, &other.overall);

        for (name, theirs) in other.questions {
            let ours = self.question_mut(&name);
            ours.choices += theirs.choices;
            merge_models(&mut ours.models, &theirs.models);
        }

        for (name, theirs) in other.pairs {
            let ours = self.pairs.entry(name).or_insert_with(|| PairStats {
                pair: theirs.pair.clone(),
                method_a: theirs.method_a.clone(),
                method_b: theirs.method_b.clone(),
                ..PairStats::default()
            });
            merge_tally(&mut ours.overall, &theirs.overall);
            for (q, tally) in &theirs.by_question {
                merge_tally(ours.by_question.entry(q.clone()).or_default(), tally);
            }
        }
    }

    pub fn overall(&self) -> &BTreeMap<String, WinStats> {
        &self.overall
    }

    pub fn pair(&self, name: &str) -> Option<&PairStats> {
        self.pairs.get(name)
    }

    pub fn question(&self, name: &str) -> Option<&QuestionStats> {
        self.questions.get(name)
    }

    pub fn into_report(self, summary: RunSummary, generated_at: DateTime<Utc>) -> StudyReport {
        StudyReport {
            generated_at,
            summary,
            overall: self.overall,
            questions: self.questions,
            pairs: self.pairs,
        }
    }
}

fn record(models: &mut BTreeMap<String, WinStats>, chosen: &str, other: &str) {
    models.entry(chosen.to_string()).or_default().record(true);
    models.entry(other.to_string()).or_default().record(false);
}

fn merge_models(ours: &mut BTreeMap<String, WinStats>, theirs: &BTreeMap<String, WinStats>) {
    for (model, stats) in theirs {
        ours.entry(model.clone()).or_default().merge(stats);
    }
}

fn merge_tally(ours: &mut PairTally, theirs: &PairTally) {
    ours.method_a.merge(&theirs.method_a);
    ours.method_b.merge(&theirs.method_b);
}

// ============================================================================
// Aggregator
// ============================================================================

/// Result of one aggregation run.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub report: StudyReport,
    /// Every extracted choice with its decode outcome, in input order.
    pub rows: Vec<ResponseRow>,
    pub decoded: Vec<DecodedChoice>,
    /// Malformed records and entries, one line each.
    pub diagnostics: Vec<String>,
}

/// Extracts, de-duplicates, decodes and tallies response records.
pub struct Aggregator {
    book: OrderSheetBook,
    adapters: AdapterSet,
    pairs: BTreeMap<String, ComparisonPair>,
    questions: Vec<String>,
}

impl Aggregator {
    pub fn new(book: OrderSheetBook, adapters: AdapterSet) -> Self {
        Self {
            book,
            adapters,
            pairs: BTreeMap::new(),
            questions: Vec::new(),
        }
    }

    /// Known pairs; they are listed in the report even without choices.
    pub fn with_pairs(mut self, pairs: impl IntoIterator<Item = ComparisonPair>) -> Self {
        self.pairs
            .extend(pairs.into_iter().map(|p| (p.name(), p)));
        self
    }

    /// Configured questions; they are listed in the report even without choices.
    pub fn with_questions(mut self, questions: impl IntoIterator<Item = String>) -> Self {
        self.questions.extend(questions);
        self
    }

    pub fn book(&self) -> &OrderSheetBook {
        &self.book
    }

    /// Aggregate `records` from scratch.
    ///
    /// Choices are de-duplicated by (participant, pair, identity, question):
    /// the first choice that decodes wins. A failed choice never claims the
    /// slot, but an exact repeat of it counts as a duplicate. Running the
    /// same records twice, or feeding a record twice, yields the same counts.
    pub fn run(&self, records: &[CollectedRecord]) -> Aggregation {
        let mut summary = RunSummary::default();
        let mut participants = BTreeSet::new();
        let mut seen: HashSet<ChoiceKey> = HashSet::new();
        let mut failed: HashSet<(ChoiceKey, String)> = HashSet::new();
        let mut tally = Tally::new();
        let mut rows = Vec::new();
        let mut decoded = Vec::new();
        let mut diagnostics = Vec::new();

        for question in &self.questions {
            tally.ensure_question(question);
        }
        for pair in self.pairs.values() {
            tally.ensure_pair(pair);
        }

        for record in records {
            summary.records_seen += 1;

            let extraction = match self.adapters.extract(record) {
                Ok(extraction) => extraction,
                Err(malformed) => {
                    warn!(source = %malformed.source_name, reason = %malformed.reason, "Skipping malformed record");
                    summary.malformed_records += 1;
                    diagnostics.push(malformed.to_string());
                    continue;
                }
            };

            for line in &extraction.diagnostics {
                warn!("Skipping malformed entry: {}", line);
            }
            summary.malformed_entries += extraction.diagnostics.len() as u64;
            diagnostics.extend(extraction.diagnostics);
            participants.insert(extraction.participant);

            for raw in extraction.choices {
                summary.choices_extracted += 1;

                let key = (
                    raw.participant.clone(),
                    raw.pair.clone(),
                    self.dedup_identity(&raw),
                    raw.question.clone(),
                );
                if seen.contains(&key) {
                    summary.duplicates += 1;
                    debug!(participant = %raw.participant, pair = %raw.pair, identity = %raw.identity, "Duplicate choice");
                    rows.push(response_row(raw, DecodeStatus::Duplicate, None));
                    continue;
                }

                match self.book.decode(&raw.pair, &raw.identity, &raw.choice) {
                    Ok(result) => {
                        seen.insert(key);
                        summary.decoded += 1;
                        let choice = DecodedChoice {
                            participant: raw.participant.clone(),
                            pair: raw.pair.clone(),
                            identity: raw.identity.clone(),
                            question: raw.question.clone(),
                            chosen_model: result.chosen.clone(),
                            other_model: result.other.clone(),
                        };
                        match self.resolve_pair(&choice.pair) {
                            Some(pair) => tally.add(&pair, &choice),
                            None => {
                                warn!(
                                    pair = %choice.pair,
                                    "Pair models unknown, choice left out of pair stats"
                                );
                                tally.add_unpaired(&choice);
                            }
                        }
                        rows.push(response_row(
                            raw,
                            DecodeStatus::Decoded,
                            Some((result.chosen, result.other)),
                        ));
                        decoded.push(choice);
                    }
                    Err(e) => {
                        if !failed.insert((key, raw.choice.clone())) {
                            summary.duplicates += 1;
                            rows.push(response_row(raw, DecodeStatus::Duplicate, None));
                            continue;
                        }
                        PairLogger::aggregate(&raw.pair).undecodable(
                            &raw.participant,
                            &raw.identity,
                            e.status(),
                            &e,
                        );
                        summary.failures.record(e.status());
                        rows.push(response_row(raw, e.status(), None));
                    }
                }
            }
        }

        summary.participants = participants.len() as u64;
        let report = tally.into_report(summary, Utc::now());

        for stats in report.pairs.values() {
            PairLogger::aggregate(&stats.pair).tallied(stats);
        }
        info!(
            records = report.summary.records_seen,
            participants = report.summary.participants,
            decoded = report.summary.decoded,
            duplicates = report.summary.duplicates,
            failures = report.summary.failures.total(),
            "Aggregation finished"
        );

        Aggregation {
            report,
            rows,
            decoded,
            diagnostics,
        }
    }

    /// Identity used for de-duplication: the order sheet's own key when the
    /// sheet knows it, the canonical form otherwise.
    fn dedup_identity(&self, raw: &RawChoice) -> String {
        self.book
            .get(&raw.pair)
            .and_then(|sheet| sheet.lookup(&raw.identity))
            .map(|entry| entry.identity.as_str().to_string())
            .unwrap_or_else(|| canonicalize(&raw.identity))
    }

    /// Method A/B of a pair: the configured pair, else the order sheet
    /// header, else the `{left}_vs_{right}` name. Never guessed from a choice.
    fn resolve_pair(&self, name: &str) -> Option<ComparisonPair> {
        if let Some(pair) = self.pairs.get(name) {
            return Some(pair.clone());
        }
        let from_sheet = self.book.get(name).and_then(|sheet| {
            let (left, right) = (sheet.original_left()?, sheet.original_right()?);
            ComparisonPair::new(left, right).ok()
        });
        from_sheet.or_else(|| name.parse().ok())
    }
}

type ChoiceKey = (String, String, String, String);

fn response_row(
    raw: RawChoice,
    status: DecodeStatus,
    models: Option<(String, String)>,
) -> ResponseRow {
    let (chosen_model, other_model) = match models {
        Some((chosen, other)) => (Some(chosen), Some(other)),
        None => (None, None),
    };
    ResponseRow {
        participant: raw.participant,
        pair: raw.pair,
        identity: raw.identity,
        question: raw.question,
        raw_choice: raw.choice,
        status,
        chosen_model,
        other_model,
    }
}
