//! Extract command implementation for the roadchanges CLI.

use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgAction, Parser};
use log::debug;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use roadchanges_core::{Action, AncestorMode, ChangeExtractor};
use roadchanges_data::{
    OutputFormat, RegionIndex, RegionReaderConfig, RowWriter, TableName, parse_adiff,
};
use roadchanges_fs::{create_output_file, open_utf8_file, read_utf8_file};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_ADIFF, ARG_FOLD_ANCESTORS, ARG_OUTPUT, ARG_REGION_FIELD_LIMIT, ARG_REGIONS, ARG_TABLE,
    CliError, ENV_ADIFF,
};

/// CLI arguments for the `extract` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "extract",
    long_about = "Read an OpenStreetMap augmented diff and emit one row per \
                 road-relevant change. Rows are written as CSV, or as a \
                 PostgreSQL create/copy script when a table name is given. \
                 Paths can come from CLI flags, configuration files, or \
                 environment variables.",
    about = "Extract road changes from an augmented diff"
)]
#[ortho_config(prefix = "ROADCHANGES")]
pub(crate) struct ExtractArgs {
    /// Path to the augmented diff (`.osc` / `.adiff`).
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) adiff: Option<Utf8PathBuf>,
    /// Write rows to this file instead of stdout.
    #[arg(short = 'o', long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Region file of `label,hex-wkb` lines; rows outside every region are dropped.
    #[arg(short = 'r', long = ARG_REGIONS, value_name = "path")]
    #[serde(default)]
    pub(crate) regions: Option<Utf8PathBuf>,
    /// Emit a PostgreSQL script loading rows into this table.
    #[arg(short = 't', long = ARG_TABLE, value_name = "name")]
    #[serde(default)]
    pub(crate) table: Option<String>,
    /// Pair split and merged ways with the way they came from.
    #[arg(long = ARG_FOLD_ANCESTORS, action = ArgAction::SetTrue)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) fold_ancestors: bool,
    /// Reject region file fields larger than this many bytes.
    #[arg(long = ARG_REGION_FIELD_LIMIT, value_name = "bytes")]
    #[serde(default)]
    pub(crate) region_field_limit: Option<usize>,
}

impl ExtractArgs {
    pub(crate) fn into_config(self) -> Result<ExtractConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ExtractConfig::try_from(merged)
    }
}

/// Resolved `extract` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtractConfig {
    /// Path to the augmented diff.
    pub(crate) adiff: Utf8PathBuf,
    /// Output file; stdout when absent.
    pub(crate) output: Option<Utf8PathBuf>,
    /// Optional region filter file.
    pub(crate) regions: Option<Utf8PathBuf>,
    /// CSV or SQL script.
    pub(crate) format: OutputFormat,
    /// Whether ancestors are reported or folded into the change.
    pub(crate) ancestor_mode: AncestorMode,
    /// Region file parsing options.
    pub(crate) region_reader: RegionReaderConfig,
}

impl ExtractConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.adiff, ARG_ADIFF)?;
        if let Some(regions) = &self.regions {
            Self::require_existing(regions, ARG_REGIONS)?;
        }
        Ok(())
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match roadchanges_fs::file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl TryFrom<ExtractArgs> for ExtractConfig {
    type Error = CliError;

    fn try_from(args: ExtractArgs) -> Result<Self, Self::Error> {
        let adiff = args.adiff.ok_or(CliError::MissingArgument {
            field: ARG_ADIFF,
            env: ENV_ADIFF,
        })?;
        let format = match args.table {
            Some(name) => OutputFormat::Sql {
                table: TableName::new(&name)?,
            },
            None => OutputFormat::Csv,
        };
        let ancestor_mode = if args.fold_ancestors {
            AncestorMode::Fold
        } else {
            AncestorMode::Report
        };
        let region_reader = RegionReaderConfig {
            max_field_len: args.region_field_limit,
            ..RegionReaderConfig::default()
        };
        Ok(Self {
            adiff,
            output: args.output,
            regions: args.regions,
            format,
            ancestor_mode,
            region_reader,
        })
    }
}

/// Totals reported once a run completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExtractReport {
    /// Actions read from the diff.
    pub(crate) actions: usize,
    /// Data rows written.
    pub(crate) rows: u64,
}

/// Parsed inputs, loaded before any output is created.
struct ExtractInputs {
    actions: Vec<Action>,
    regions: Option<RegionIndex>,
}

impl ExtractInputs {
    fn load(config: &ExtractConfig) -> Result<Self, CliError> {
        let actions = load_actions(&config.adiff)?;
        let regions = config
            .regions
            .as_deref()
            .map(|path| load_regions(path, &config.region_reader))
            .transpose()?;
        Ok(Self { actions, regions })
    }

    fn write<W: Write>(&self, config: &ExtractConfig, sink: W) -> Result<ExtractReport, CliError> {
        let mut extractor =
            ChangeExtractor::new(&self.actions).with_ancestor_mode(config.ancestor_mode);
        if let Some(index) = &self.regions {
            extractor = extractor.with_regions(index);
        }
        let mut writer = RowWriter::new(sink, &config.format)?;
        for action in extractor.actions() {
            for row in extractor.rows_for(action)? {
                writer.write_row(&row)?;
            }
        }
        let rows = writer.rows_written();
        writer.finish()?;
        Ok(ExtractReport {
            actions: self.actions.len(),
            rows,
        })
    }
}

pub(super) fn run_extract(args: ExtractArgs) -> Result<ExtractReport, CliError> {
    let config = resolve_extract_config(args)?;
    let inputs = ExtractInputs::load(&config)?;
    match &config.output {
        Some(path) => {
            let file = create_output_file(path).map_err(|source| CliError::CreateOutput {
                path: path.clone(),
                source,
            })?;
            inputs.write(&config, BufWriter::new(file))
        }
        None => inputs.write(&config, std::io::stdout().lock()),
    }
}

/// Run `extract` with rows sent to `writer`, ignoring any configured output path.
#[cfg(test)]
pub(crate) fn run_extract_with(
    args: ExtractArgs,
    writer: &mut dyn Write,
) -> Result<ExtractReport, CliError> {
    let config = resolve_extract_config(args)?;
    let inputs = ExtractInputs::load(&config)?;
    inputs.write(&config, writer)
}

fn resolve_extract_config(args: ExtractArgs) -> Result<ExtractConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

/// Reads and parses the augmented diff at `path`.
pub(super) fn load_actions(path: &Utf8Path) -> Result<Vec<Action>, CliError> {
    let text = read_utf8_file(path).map_err(|source| CliError::ReadDiff {
        path: path.to_path_buf(),
        source,
    })?;
    let actions = parse_adiff(&text).map_err(|source| CliError::ParseDiff {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Parsed {} actions from {path}", actions.len());
    Ok(actions)
}

/// Loads the region filter at `path`.
pub(super) fn load_regions(
    path: &Utf8Path,
    reader: &RegionReaderConfig,
) -> Result<RegionIndex, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenRegions {
        path: path.to_path_buf(),
        source,
    })?;
    RegionIndex::load(std::io::BufReader::new(file), reader).map_err(|source| {
        CliError::LoadRegions {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ExtractConfig, CliError> {
    let merged = ExtractArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ExtractConfig::try_from(merged)
}
