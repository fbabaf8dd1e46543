//! `collect`: snapshot participant records into a dated directory.

use blindpair_collect::write_collection;
use chrono::Local;
use clap::Args;
use std::path::PathBuf;

use super::sources::{fetch_all, SourceArgs};
use super::ConfigArg;
use crate::config::CliConfig;
use crate::error::CliResult;

#[derive(Args, Debug)]
pub struct CollectArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    #[command(flatten)]
    pub sources: SourceArgs,

    /// Root for dated collection folders
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

pub async fn run(args: CollectArgs, env: &CliConfig) -> CliResult<i32> {
    let study = args.config.load_optional()?;
    let sources = args.sources.sources(study.as_ref())?;
    let (report, names) = fetch_all(&sources).await?;

    let root = env.output_root(args.output_dir, "collected_results");
    let paths = write_collection(&root, &names, &report, Local::now().naive_local()).await?;

    println!(
        "Collected {} records ({} skipped) into {}",
        report.records.len(),
        report.skipped.len(),
        paths.results_file.display()
    );
    if let Some(e) = &report.error {
        println!("  retrieval stopped early: {}", e);
    }

    Ok(0)
}
