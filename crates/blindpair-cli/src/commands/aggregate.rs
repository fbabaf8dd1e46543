//! `aggregate`: decode every record and write the result tables.

use blindpair_study::report::render_text;
use blindpair_study::{write_outputs, AdapterSet, Aggregator, OrderSheetBook};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use super::sources::{fetch_all, SourceArgs};
use super::ConfigArg;
use crate::config::CliConfig;
use crate::error::CliResult;

#[derive(Args, Debug)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    #[command(flatten)]
    pub sources: SourceArgs,

    /// Directory for the report files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Do not print the text report
    #[arg(long)]
    pub quiet: bool,
}

pub async fn run(args: AggregateArgs, env: &CliConfig) -> CliResult<i32> {
    let config = args.config.load()?;

    // Fatal when no pair has an order sheet.
    let book = OrderSheetBook::load_for_config(&config).await?;
    let adapters = AdapterSet::for_config(&config).await;
    let aggregator = Aggregator::new(book, adapters)
        .with_pairs(config.pairs()?)
        .with_questions(config.question_list());

    let sources = args.sources.sources(Some(&config))?;
    let (fetched, names) = fetch_all(&sources).await?;
    info!(
        sources = %names.join(", "),
        records = fetched.records.len(),
        "Aggregating records"
    );

    let result = aggregator.run(&fetched.records);

    let out_dir = env.output_root(args.output_dir, "study_results");
    let written = write_outputs(&out_dir, &result, &config.study_name).await?;

    if !args.quiet {
        print!("{}", render_text(&result.report, &config.study_name));
    }
    println!();
    println!("Wrote {} files to {}", written.len(), out_dir.display());

    Ok(0)
}
