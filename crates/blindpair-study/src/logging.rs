//! Per-pair event logging.
//!
//! Building and aggregating both walk one comparison pair at a time.
//! `PairLogger` stamps each event with the pair and stage, and per-identity
//! events also carry `identity` and `outcome` fields for filtering.

use blindpair_models::{DecodeStatus, PairStats};
use std::fmt::Display;
use tracing::{debug, info, warn, Span};

/// Event helper bound to one pair and stage.
#[derive(Debug, Clone)]
pub struct PairLogger {
    pair: String,
    stage: &'static str,
}

impl PairLogger {
    /// Logger for rendering a pair's comparison set.
    pub fn build(pair: &str) -> Self {
        Self {
            pair: pair.to_string(),
            stage: "build",
        }
    }

    /// Logger for decoding and tallying a pair's responses.
    pub fn aggregate(pair: &str) -> Self {
        Self {
            pair: pair.to_string(),
            stage: "aggregate",
        }
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn span(&self) -> Span {
        tracing::info_span!("pair", pair = %self.pair, stage = self.stage)
    }

    // ------------------------------------------------------------------
    // build
    // ------------------------------------------------------------------

    pub fn matched(&self, common: usize, only_left: usize, only_right: usize) {
        info!(
            pair = %self.pair,
            stage = self.stage,
            common,
            only_left,
            only_right,
            "Matched identities across both models"
        );
    }

    /// An identity only `model` produced; it gets no comparison video.
    pub fn partial_overlap(&self, identity: &str, model: &str) {
        warn!(
            pair = %self.pair,
            stage = self.stage,
            identity,
            only_in = model,
            outcome = "partial_overlap",
            "Identity missing from the other model"
        );
    }

    pub fn rendered(&self, identity: &str, shown_as_a: &str) {
        debug!(
            pair = %self.pair,
            stage = self.stage,
            identity,
            shown_as_a,
            outcome = "rendered",
            "Comparison rendered"
        );
    }

    pub fn render_failed(&self, identity: &str, reason: &str) {
        warn!(
            pair = %self.pair,
            stage = self.stage,
            identity,
            reason,
            outcome = "render_failed",
            "Comparison render failed"
        );
    }

    pub fn built(&self, rendered: usize, failed: usize, partial: usize) {
        if failed > 0 {
            warn!(
                pair = %self.pair,
                stage = self.stage,
                rendered,
                failed,
                partial,
                "Comparison set built with failures"
            );
        } else {
            info!(
                pair = %self.pair,
                stage = self.stage,
                rendered,
                partial,
                "Comparison set built"
            );
        }
    }

    // ------------------------------------------------------------------
    // aggregate
    // ------------------------------------------------------------------

    pub fn undecodable(&self, participant: &str, identity: &str, status: DecodeStatus, detail: &dyn Display) {
        warn!(
            pair = %self.pair,
            stage = self.stage,
            participant,
            identity,
            outcome = status.as_str(),
            "Undecodable choice: {}",
            detail
        );
    }

    pub fn tallied(&self, stats: &PairStats) {
        info!(
            pair = %self.pair,
            stage = self.stage,
            choices = stats.overall.total(),
            method_a = %stats.method_a,
            method_a_wins = stats.overall.method_a.wins,
            method_b = %stats.method_b,
            method_b_wins = stats.overall.method_b.wins,
            "Pair tallied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_constructors() {
        let build = PairLogger::build("foo_vs_bar");
        assert_eq!(build.pair(), "foo_vs_bar");
        assert_eq!(build.stage(), "build");
        assert_eq!(PairLogger::aggregate("foo_vs_bar").stage(), "aggregate");
    }

    #[test]
    fn test_events_without_subscriber() {
        let logger = PairLogger::build("foo_vs_bar");
        let _guard = logger.span().entered();
        logger.matched(3, 1, 0);
        logger.partial_overlap("v9", "foo");
        logger.rendered("v1", "bar");
        logger.render_failed("v2", "ffmpeg exited with 1");
        logger.built(2, 1, 1);
        PairLogger::aggregate("foo_vs_bar").undecodable(
            "p1",
            "v1",
            DecodeStatus::InvalidChoice,
            &"invalid choice \"C\"",
        );
    }
}
