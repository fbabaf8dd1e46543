//! `decode`: look up one choice in a pair's order sheet.

use blindpair_study::{DecodeError, OrderSheet, OrderSheetBook, StudyError};
use clap::Args;

use super::ConfigArg;
use crate::error::{CliError, CliResult};

#[derive(Args, Debug)]
pub struct DecodeArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Pair name, e.g. foo_vs_bar
    #[arg(long)]
    pub pair: String,

    /// Identity or comparison filename
    #[arg(long)]
    pub identity: String,

    /// Raw choice as submitted (A or B)
    #[arg(long)]
    pub choice: String,
}

pub async fn run(args: DecodeArgs) -> CliResult<i32> {
    let config = args.config.load()?;
    let set = config
        .find_set(&args.pair)
        .ok_or_else(|| CliError::Study(StudyError::UnknownPair(args.pair.clone())))?;

    let mut book = OrderSheetBook::new();
    match OrderSheet::load(&config.order_sheet_path(set)).await {
        Ok(sheet) => book.insert(set.name.clone(), sheet),
        Err(StudyError::OrderSheetNotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    match book.decode(&args.pair, &args.identity, &args.choice) {
        Ok(decoded) => {
            println!("chosen: {}", decoded.chosen);
            println!("other:  {}", decoded.other);
            Ok(0)
        }
        Err(e) => {
            println!("{}: {}", e.status(), describe(&e));
            Ok(1)
        }
    }
}

fn describe(e: &DecodeError) -> String {
    match e {
        DecodeError::OrderSheetMissing { .. } => format!("{} (no order sheet written yet?)", e),
        _ => e.to_string(),
    }
}
