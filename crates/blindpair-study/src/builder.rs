//! Comparison set builder.
//!
//! For each identity both models produced, draw a left/right placement,
//! render one side-by-side video and record the placement in the pair's
//! order sheet. A failed render costs one identity, never the pair.

use blindpair_media::{SideBySideRenderer, VideoCollection};
use blindpair_models::{ComparisonPair, Identity, OrderSheetEntry};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::error::StudyResult;
use crate::logging::PairLogger;
use crate::mapping::IndexMapping;
use crate::order_sheet::write_order_sheet;

/// Where one identity's model outputs go on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub identity: Identity,
    /// The pair's left model is shown as A (left half) when true.
    pub left_first: bool,
}

/// Draw one fair coin per identity, in the order given.
pub fn draw_placements<R: Rng + ?Sized>(identities: &[Identity], rng: &mut R) -> Vec<Placement> {
    identities
        .iter()
        .map(|identity| Placement {
            identity: identity.clone(),
            left_first: rng.random_bool(0.5),
        })
        .collect()
}

/// Identities split by which collections have them. All lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlap {
    pub common: Vec<Identity>,
    pub only_left: Vec<Identity>,
    pub only_right: Vec<Identity>,
}

pub fn overlap(left: &dyn VideoCollection, right: &dyn VideoCollection) -> Overlap {
    let l: BTreeSet<Identity> = left.identities().into_iter().collect();
    let r: BTreeSet<Identity> = right.identities().into_iter().collect();
    Overlap {
        common: l.intersection(&r).cloned().collect(),
        only_left: l.difference(&r).cloned().collect(),
        only_right: r.difference(&l).cloned().collect(),
    }
}

/// One pair to build.
pub struct BuildTarget<'a> {
    pub pair: ComparisonPair,
    pub left: &'a dyn VideoCollection,
    pub right: &'a dyn VideoCollection,
    pub output_dir: PathBuf,
    pub order_sheet: PathBuf,
    pub index_mapping: PathBuf,
}

/// Outcome of building one pair.
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub pair: String,
    pub succeeded: Vec<Identity>,
    pub failed: Vec<(Identity, String)>,
    /// Identities only one of the two models produced
    pub partial_overlap: Vec<Identity>,
    pub order_sheet: PathBuf,
    pub index_mapping: PathBuf,
}

impl BuildSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Builds comparison sets with one deterministic RNG per run.
pub struct ComparisonSetBuilder<R> {
    renderer: R,
    seed: u64,
    max_parallel: usize,
}

impl<R: SideBySideRenderer> ComparisonSetBuilder<R> {
    pub fn new(renderer: R, seed: u64) -> Self {
        Self {
            renderer,
            seed,
            max_parallel: 1,
        }
    }

    /// Allow up to `n` renders at once.
    pub fn with_max_parallel(mut self, n: usize) -> Self {
        self.max_parallel = n.max(1);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Build every target in order, sharing one RNG seeded once.
    pub async fn build_all(&self, targets: &[BuildTarget<'_>]) -> StudyResult<Vec<BuildSummary>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut summaries = Vec::with_capacity(targets.len());
        for target in targets {
            summaries.push(self.build_pair(target, &mut rng).await?);
        }
        Ok(summaries)
    }

    /// Build one pair. Only an unwritable output location is an error.
    pub async fn build_pair(
        &self,
        target: &BuildTarget<'_>,
        rng: &mut StdRng,
    ) -> StudyResult<BuildSummary> {
        let logger = PairLogger::build(&target.pair.name());
        let span = logger.span();

        // Draws happen up front so a failed render cannot shift later placements.
        let split = overlap(target.left, target.right);
        let placements = draw_placements(&split.common, rng);

        self.build_placements(target, &logger, split, placements)
            .instrument(span)
            .await
    }

    async fn build_placements(
        &self,
        target: &BuildTarget<'_>,
        logger: &PairLogger,
        split: Overlap,
        placements: Vec<Placement>,
    ) -> StudyResult<BuildSummary> {
        logger.matched(split.common.len(), split.only_left.len(), split.only_right.len());
        for id in &split.only_left {
            logger.partial_overlap(id.as_str(), target.left.model());
        }
        for id in &split.only_right {
            logger.partial_overlap(id.as_str(), target.right.model());
        }

        tokio::fs::create_dir_all(&target.output_dir).await?;

        let semaphore = Semaphore::new(self.max_parallel);
        let renders = placements.iter().map(|placement| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| "render queue closed".to_string())?;
                self.render_one(target, placement).await
            }
        });
        let results = join_all(renders).await;

        let mut summary = BuildSummary {
            pair: target.pair.name(),
            partial_overlap: split.only_left.into_iter().chain(split.only_right).collect(),
            order_sheet: target.order_sheet.clone(),
            index_mapping: target.index_mapping.clone(),
            ..BuildSummary::default()
        };
        let mut entries = Vec::new();

        for (placement, result) in placements.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    let shown_as_a = if placement.left_first {
                        &target.pair.left
                    } else {
                        &target.pair.right
                    };
                    logger.rendered(placement.identity.as_str(), shown_as_a);
                    entries.push(OrderSheetEntry::for_placement(
                        &target.pair,
                        placement.identity.clone(),
                        placement.left_first,
                    ));
                    summary.succeeded.push(placement.identity);
                }
                Err(reason) => {
                    logger.render_failed(placement.identity.as_str(), &reason);
                    summary.failed.push((placement.identity, reason));
                }
            }
        }

        write_order_sheet(&target.order_sheet, &target.pair, self.seed, &entries).await?;
        IndexMapping::from_files(summary.succeeded.iter().map(Identity::comparison_filename))
            .write(&target.index_mapping, &summary.pair)
            .await?;

        logger.built(
            summary.succeeded.len(),
            summary.failed.len(),
            summary.partial_overlap.len(),
        );

        Ok(summary)
    }

    async fn render_one(&self, target: &BuildTarget<'_>, placement: &Placement) -> Result<(), String> {
        let id = &placement.identity;
        let left_src = locate(target.left, id)?;
        let right_src = locate(target.right, id)?;
        let (shown_a, shown_b) = if placement.left_first {
            (left_src, right_src)
        } else {
            (right_src, left_src)
        };

        let output = target.output_dir.join(id.comparison_filename());
        self.renderer
            .render(&shown_a, &shown_b, &output)
            .await
            .map_err(|e| e.to_string())
    }
}

fn locate(collection: &dyn VideoCollection, id: &Identity) -> Result<PathBuf, String> {
    collection
        .locate(id)
        .ok_or_else(|| format!("{} has no file for {}", collection.model(), id))
}
