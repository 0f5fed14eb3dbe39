//! Facade crate for road change extraction from OpenStreetMap augmented
//! diffs.
//!
//! This crate re-exports the domain types from `roadchanges-core` and the
//! parsing, region and output adapters from `roadchanges-data`.

#![forbid(unsafe_code)]

pub use roadchanges_core::{
    Action, AncestorMode, COLUMNS, Category, ChangeExtractor, ChangeRow, ChangeType, Column,
    ElementKind, ExtractError, ObjectFields, ObjectSnapshot, RegionLookup, Tags, classify,
    extract_fields,
};

pub use roadchanges_data::{
    AdiffError, OutputFormat, RegionIndex, RegionLoadError, RegionReaderConfig, RowWriter,
    TableName, WriteRowsError, parse_adiff,
};
