//! `prepare`: gather raw model outputs into `<raw_dir>/<model>/`.

use blindpair_media::{prepare_raw_videos, ModelSource};
use clap::Args;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::info;

use crate::error::{CliError, CliResult};

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Model output directory as MODEL=DIR (repeat for each model)
    #[arg(short, long = "source", value_name = "MODEL=DIR", required = true)]
    pub sources: Vec<ModelSource>,

    /// Destination for the per-model directories
    #[arg(long, default_value = "raw_videos")]
    pub raw_dir: PathBuf,

    /// Only prepare these base names (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,
}

pub async fn run(args: PrepareArgs) -> CliResult<i32> {
    let models: BTreeSet<&str> = args.sources.iter().map(|s| s.model.as_str()).collect();
    if models.len() != args.sources.len() {
        return Err(CliError::invalid_args("each model may only be given once"));
    }

    let only: BTreeSet<String> = args.only.into_iter().collect();
    let only = (!only.is_empty()).then_some(&only);

    let summary = prepare_raw_videos(&args.sources, &args.raw_dir, only).await?;

    info!(
        prepared = summary.prepared.len(),
        incomplete = summary.incomplete.len(),
        files_copied = summary.files_copied,
        copy_failures = summary.copy_failures,
        skipped_or_failed = summary.failed(),
        "Preparation finished"
    );

    println!(
        "Prepared {} base names ({} files) into {}",
        summary.prepared.len(),
        summary.files_copied,
        args.raw_dir.display()
    );
    for (base, missing) in &summary.incomplete {
        println!("  skipped {}: missing from {}", base, missing.join(", "));
    }
    if summary.copy_failures > 0 {
        println!("  {} copies failed", summary.copy_failures);
    }

    Ok(if summary.copy_failures > 0 { 1 } else { 0 })
}
