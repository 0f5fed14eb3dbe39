//! Flat output records, one per changed object and category.

use serde::Serialize;

use crate::{Category, ChangeType, ObjectFields};

/// An output column and its PostgreSQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name, also used as the CSV header.
    pub name: &'static str,
    /// Type used in the generated `create table` statement.
    pub sql_type: &'static str,
}

const fn column(name: &'static str, sql_type: &'static str) -> Column {
    Column { name, sql_type }
}

/// Output columns in row order.
pub const COLUMNS: [Column; 13] = [
    column("ts", "timestamp with time zone not null"),
    column("action", "text not null"),
    column("obj_action", "text not null"),
    column("kind", "text not null"),
    column("changeset", "integer not null"),
    column("uid", "integer not null"),
    column("username", "text not null"),
    column("osm_id", "text not null"),
    column("version", "integer not null"),
    column("region", "text"),
    column("lat", "double precision not null"),
    column("lon", "double precision not null"),
    column("length", "integer"),
];

/// One road change event.
///
/// Field order matches [`COLUMNS`]; serialisers rely on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRow {
    /// Timestamp of the new object version.
    pub ts: Option<String>,
    /// Change applied to this row's category.
    pub action: ChangeType,
    /// Change applied to the whole object.
    pub obj_action: ChangeType,
    /// Category name.
    pub kind: Category,
    /// Changeset id.
    pub changeset: Option<u64>,
    /// Editing user id.
    pub uid: Option<u64>,
    /// Editing user name.
    pub username: Option<String>,
    /// Typed reference such as `way/42`.
    pub osm_id: String,
    /// Element version.
    pub version: Option<u64>,
    /// Label of the containing region, if any.
    pub region: Option<String>,
    /// Latitude of the representative point.
    pub lat: Option<f64>,
    /// Longitude of the representative point.
    pub lon: Option<f64>,
    /// Way length in metres.
    pub length: Option<u64>,
}

impl ChangeRow {
    /// Combine shared object fields with one fired category.
    #[must_use]
    pub fn new(
        fields: &ObjectFields,
        obj_action: ChangeType,
        (kind, action): (Category, ChangeType),
        region: Option<&str>,
    ) -> Self {
        Self {
            ts: fields.timestamp.clone(),
            action,
            obj_action,
            kind,
            changeset: fields.changeset,
            uid: fields.uid,
            username: fields.username.clone(),
            osm_id: fields.osm_id.clone(),
            version: fields.version,
            region: region.map(str::to_owned),
            lat: fields.location.map(|point| point.y),
            lon: fields.location.map(|point| point.x),
            length: fields.length,
        }
    }
}
