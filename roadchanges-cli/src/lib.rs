//! Command-line interface for extracting road changes from augmented diffs.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use log::info;

mod error;
mod extract;

pub use error::CliError;

use extract::{ExtractArgs, run_extract};

const ARG_ADIFF: &str = "adiff";
const ARG_OUTPUT: &str = "output";
const ARG_REGIONS: &str = "regions";
const ARG_TABLE: &str = "table";
const ARG_FOLD_ANCESTORS: &str = "fold-ancestors";
const ARG_REGION_FIELD_LIMIT: &str = "region-field-limit";
const ENV_ADIFF: &str = "ROADCHANGES_CMDS_EXTRACT_ADIFF";

/// Run the roadchanges CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, or when
/// any stage of the pipeline fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Extract(args) => {
            let report = run_extract(args)?;
            info!(
                "Processed {} actions, wrote {} rows",
                report.actions, report.rows
            );
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "roadchanges",
    about = "Summarise road-relevant OpenStreetMap changes",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Turn an augmented diff into change rows.
    Extract(ExtractArgs),
}

#[cfg(test)]
mod tests;
