//! Error types emitted by the roadchanges CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use roadchanges_core::ExtractError;
use roadchanges_data::{AdiffError, RegionLoadError, WriteRowsError};
use thiserror::Error;

/// Errors emitted by the roadchanges CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// The positional diff path is missing after configuration merging.
    #[error("missing {field} (pass <path> or set {env})")]
    MissingArgument {
        /// Argument name.
        field: &'static str,
        /// Environment variable that also supplies the value.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Option naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Option naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Option naming the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Reading the augmented diff failed.
    #[error("failed to read diff {path:?}: {source}")]
    ReadDiff {
        /// Diff path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The augmented diff is malformed.
    #[error("failed to parse diff {path:?}: {source}")]
    ParseDiff {
        /// Diff path.
        path: Utf8PathBuf,
        /// Parser failure.
        #[source]
        source: AdiffError,
    },
    /// Opening the region file failed.
    #[error("failed to open regions {path:?}: {source}")]
    OpenRegions {
        /// Region file path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The region file is malformed.
    #[error("failed to load regions {path:?}: {source}")]
    LoadRegions {
        /// Region file path.
        path: Utf8PathBuf,
        /// Loader failure.
        #[source]
        source: RegionLoadError,
    },
    /// Creating the output file failed.
    #[error("failed to create output {path:?}: {source}")]
    CreateOutput {
        /// Output path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// An object in the diff could not be turned into rows.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// Writing rows failed, or the table name is invalid.
    #[error(transparent)]
    WriteRows(#[from] WriteRowsError),
}
