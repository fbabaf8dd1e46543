//! `build`: render comparison sets and write their order sheets.

use blindpair_media::{check_ffmpeg, check_ffprobe, DirectoryCollection, FfmpegSideBySide};
use blindpair_models::{ComparisonPair, ComparisonSetConfig, StudyConfig};
use blindpair_study::{BuildTarget, ComparisonSetBuilder};
use clap::Args;
use std::path::PathBuf;
use tracing::{error, info};

use super::ConfigArg;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Only build these pairs (repeatable)
    #[arg(long = "pair", value_name = "NAME")]
    pub pairs: Vec<String>,

    /// Root for the per-pair output folders, overriding the config
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Placement seed, overriding the config
    #[arg(long)]
    pub seed: Option<u64>,

    /// Renders allowed to run at once
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Per-render timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// x264 CRF, overriding the config
    #[arg(long)]
    pub crf: Option<u8>,
}

struct PairInputs {
    set: ComparisonSetConfig,
    pair: ComparisonPair,
    left: DirectoryCollection,
    right: DirectoryCollection,
}

pub async fn run(args: BuildArgs, env: &CliConfig) -> CliResult<i32> {
    let config = args.config.load()?;
    let sets = select_sets(&config, &args.pairs)?;

    check_ffmpeg()?;
    check_ffprobe()?;

    let mut encoding = config.encoding.clone();
    if let Some(crf) = args.crf {
        encoding = encoding.with_crf(crf);
    }
    let renderer = FfmpegSideBySide::new(encoding)
        .with_timeout(args.timeout_secs.unwrap_or(env.render_timeout_secs));
    let seed = args.seed.unwrap_or(config.seed);
    let builder = ComparisonSetBuilder::new(renderer, seed)
        .with_max_parallel(args.max_parallel.unwrap_or(env.max_render_parallel));

    // Pairs whose model directories cannot be read are reported and skipped.
    let mut unreadable = 0usize;
    let mut inputs = Vec::new();
    for set in sets {
        let pair = set.pair()?;
        let left = DirectoryCollection::scan(&pair.left, config.model_dir(&pair.left));
        let right = DirectoryCollection::scan(&pair.right, config.model_dir(&pair.right));
        match (left, right) {
            (Ok(left), Ok(right)) => inputs.push(PairInputs {
                set,
                pair,
                left,
                right,
            }),
            (Err(e), _) | (_, Err(e)) => {
                error!(pair = %set.name, error = %e, "Cannot read model outputs");
                println!("{}: skipped ({})", set.name, e);
                unreadable += 1;
            }
        }
    }

    let targets: Vec<BuildTarget<'_>> = inputs
        .iter()
        .map(|input| {
            let (output_dir, order_sheet, index_mapping) =
                output_paths(&config, &input.set, args.output_dir.as_ref());
            BuildTarget {
                pair: input.pair.clone(),
                left: &input.left,
                right: &input.right,
                output_dir,
                order_sheet,
                index_mapping,
            }
        })
        .collect();

    info!(pairs = targets.len(), seed, "Building comparison sets");
    let summaries = builder.build_all(&targets).await?;

    let mut failed = 0usize;
    for summary in &summaries {
        failed += summary.failed.len();
        println!(
            "{}: {} rendered, {} failed, {} partial overlap -> {}",
            summary.pair,
            summary.succeeded.len(),
            summary.failed.len(),
            summary.partial_overlap.len(),
            summary.order_sheet.display()
        );
        for (identity, reason) in &summary.failed {
            println!("  failed {}: {}", identity, reason);
        }
    }

    Ok(if failed > 0 || unreadable > 0 { 1 } else { 0 })
}

fn select_sets(config: &StudyConfig, names: &[String]) -> CliResult<Vec<ComparisonSetConfig>> {
    if names.is_empty() {
        return Ok(config.comparison_sets.clone());
    }
    names
        .iter()
        .map(|name| {
            config
                .find_set(name)
                .cloned()
                .ok_or_else(|| CliError::invalid_args(format!("unknown pair '{}'", name)))
        })
        .collect()
}

/// Output folder, order sheet and index mapping of one pair.
fn output_paths(
    config: &StudyConfig,
    set: &ComparisonSetConfig,
    root: Option<&PathBuf>,
) -> (PathBuf, PathBuf, PathBuf) {
    match root {
        Some(root) => {
            let dir = root.join(&set.name);
            (
                dir.clone(),
                dir.join(blindpair_models::ORDER_SHEET_FILENAME),
                dir.join(blindpair_models::INDEX_MAPPING_FILENAME),
            )
        }
        None => (
            config.video_folder(set),
            config.order_sheet_path(set),
            config.index_mapping_path(set),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> StudyConfig {
        let mut config: StudyConfig = serde_json::from_value(serde_json::json!({
            "comparison_sets": [
                {"name": "foo_vs_bar"},
                {"name": "baz_vs_bar", "order_file": "sheets/baz.txt"}
            ]
        }))
        .unwrap();
        config.base_dir = PathBuf::from("/study");
        config
    }

    #[test]
    fn test_select_sets() {
        let config = config();
        assert_eq!(select_sets(&config, &[]).unwrap().len(), 2);
        let picked = select_sets(&config, &["baz_vs_bar".to_string()]).unwrap();
        assert_eq!(picked[0].name, "baz_vs_bar");
        assert!(select_sets(&config, &["nope".to_string()]).is_err());
    }

    #[test]
    fn test_output_paths_follow_config_or_override() {
        let config = config();
        let set = config.find_set("baz_vs_bar").unwrap();

        let (dir, sheet, _) = output_paths(&config, set, None);
        assert_eq!(dir, Path::new("/study/user_study_comparisons/baz_vs_bar"));
        assert_eq!(sheet, Path::new("/study/sheets/baz.txt"));

        let root = PathBuf::from("/elsewhere");
        let (dir, sheet, mapping) = output_paths(&config, set, Some(&root));
        assert_eq!(dir, Path::new("/elsewhere/baz_vs_bar"));
        assert_eq!(sheet, Path::new("/elsewhere/baz_vs_bar/order_sheet.txt"));
        assert_eq!(mapping, Path::new("/elsewhere/baz_vs_bar/index_mapping.txt"));
    }
}
