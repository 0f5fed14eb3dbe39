//! Core domain types for extracting road changes from OpenStreetMap
//! augmented diffs.
//!
//! The crate models diff actions and object snapshots, classifies tag
//! differences into road change categories, and assembles flat output rows.
//! Parsing and output formats live in `roadchanges-data`.

#![forbid(unsafe_code)]

mod action;
mod ancestor;
mod classify;
mod element;
mod extract;
mod process;
mod region;
mod row;

#[doc(hidden)]
pub mod test_support;

pub use action::{Action, ChangeType};
pub use ancestor::{WayFragment, find_ancestor, is_contained_in};
pub use classify::{Category, classify, reduce_actions, tag_action, value_action};
pub use element::{
    ElementKind, ObjectBody, ObjectHeader, ObjectSnapshot, RelationMember, Tags, WayNode,
};
pub use extract::{ExtractError, ObjectFields, extract_fields, format_timestamp, way_length};
pub use process::{AncestorMode, ChangeExtractor};
pub use region::RegionLookup;
pub use row::{COLUMNS, ChangeRow, Column};
