//! Input and output adapters for road change extraction.
//!
//! Responsibilities:
//! - Parse augmented diff XML into [`roadchanges_core::Action`]s.
//! - Load labelled region polygons and answer containment queries.
//! - Serialise [`roadchanges_core::ChangeRow`]s as CSV or a SQL bulk load.
//!
//! Boundaries:
//! - Classification rules live in `roadchanges-core`.
//! - Callers own file handles; everything here reads from `&str` or
//!   [`std::io::Read`] and writes to [`std::io::Write`].

#![forbid(unsafe_code)]

mod adiff;
mod output;
mod regions;

pub use adiff::{AdiffError, parse_adiff};
pub use output::{OutputFormat, RowWriter, TableName, WriteRowsError};
pub use regions::{RegionIndex, RegionLoadError, RegionReaderConfig};
