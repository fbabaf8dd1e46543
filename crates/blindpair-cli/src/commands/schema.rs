//! `schema`: JSON schemas of the formats the tool reads and writes.

use blindpair_models::{ResponseRecord, ResultCodeRecord, StudyConfig, StudyReport};
use clap::{Args, ValueEnum};
use schemars::schema_for;

use crate::error::CliResult;

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum SchemaTarget {
    /// Participant JSON record
    #[default]
    Response,
    /// Participant result-code record
    ResultCode,
    /// Aggregated report
    Report,
    /// Study configuration file
    Config,
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Which schema to print
    #[arg(value_enum, default_value_t = SchemaTarget::Response)]
    pub target: SchemaTarget,
}

pub fn run(args: SchemaArgs) -> CliResult<i32> {
    let schema = match args.target {
        SchemaTarget::Response => schema_for!(ResponseRecord),
        SchemaTarget::ResultCode => schema_for!(ResultCodeRecord),
        SchemaTarget::Report => schema_for!(StudyReport),
        SchemaTarget::Config => schema_for!(StudyConfig),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_schema_names_required_fields() {
        let schema = serde_json::to_value(schema_for!(ResponseRecord)).unwrap();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "participantId"));
        assert!(required.iter().any(|v| v == "responses"));
    }
}
