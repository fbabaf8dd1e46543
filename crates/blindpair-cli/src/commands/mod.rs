//! Subcommand handlers.
//!
//! Each handler returns the process exit code: 0 on success, 1 when some
//! items failed. Run-stopping problems come back as `CliError`.

pub mod aggregate;
pub mod build;
pub mod collect;
pub mod decode;
pub mod prepare;
pub mod schema;
pub mod sources;

use blindpair_models::StudyConfig;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::CliConfig;
use crate::error::CliResult;

#[derive(Subcommand)]
pub enum Commands {
    /// Copy model outputs sharing a base name into the raw videos layout
    Prepare(prepare::PrepareArgs),

    /// Render blinded side-by-side videos and write order sheets
    Build(build::BuildArgs),

    /// Fetch participant records from GitHub issues or local files
    Collect(collect::CollectArgs),

    /// Decode responses through the order sheets and report win rates
    Aggregate(aggregate::AggregateArgs),

    /// Decode a single choice by hand
    Decode(decode::DecodeArgs),

    /// Print JSON schemas of the record and report formats
    Schema(schema::SchemaArgs),
}

pub async fn dispatch(command: Commands, env: &CliConfig) -> CliResult<i32> {
    match command {
        Commands::Prepare(args) => prepare::run(args).await,
        Commands::Build(args) => build::run(args, env).await,
        Commands::Collect(args) => collect::run(args, env).await,
        Commands::Aggregate(args) => aggregate::run(args, env).await,
        Commands::Decode(args) => decode::run(args).await,
        Commands::Schema(args) => schema::run(args),
    }
}

/// Study config location shared by the commands that need one.
#[derive(Args, Debug, Clone)]
pub struct ConfigArg {
    /// Study configuration file (JSON)
    #[arg(short, long, env = "BLINDPAIR_CONFIG", default_value = "study_config.json")]
    pub config: PathBuf,
}

impl ConfigArg {
    pub fn load(&self) -> CliResult<StudyConfig> {
        let config = StudyConfig::load(&self.config)?;
        debug!(
            path = %self.config.display(),
            study = %config.study_name,
            pairs = config.comparison_sets.len(),
            "Loaded study config"
        );
        Ok(config)
    }

    /// Load the config if the file exists; other load errors still fail.
    pub fn load_optional(&self) -> CliResult<Option<StudyConfig>> {
        if self.config.exists() {
            self.load().map(Some)
        } else {
            Ok(None)
        }
    }
}
