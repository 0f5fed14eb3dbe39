//! Per-object fields shared by every row an object emits.

use geo::{Coord, Geodesic, Length, LineString};
use log::warn;
use thiserror::Error;

use crate::{ElementKind, ObjectBody, ObjectSnapshot};

/// Identity, location and size of a changed object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectFields {
    /// Timestamp in PostgreSQL literal form, e.g. `2024-05-01 12:00:00+00`.
    pub timestamp: Option<String>,
    /// Changeset id.
    pub changeset: Option<u64>,
    /// Editing user id.
    pub uid: Option<u64>,
    /// Editing user name.
    pub username: Option<String>,
    /// Typed reference such as `node/1`.
    pub osm_id: String,
    /// Element version.
    pub version: Option<u64>,
    /// Representative point (`x = longitude`, `y = latitude`).
    ///
    /// `None` when a way or relation carries no bounding box on either
    /// snapshot.
    pub location: Option<Coord<f64>>,
    /// Geodesic way length in whole metres; `None` for other kinds.
    pub length: Option<u64>,
}

/// Errors raised while extracting object fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// A node coordinate is missing on both the snapshot and its backup.
    #[error("{osm_id} has no {attribute} attribute on either snapshot")]
    MissingCoordinate {
        /// Typed reference of the offending node.
        osm_id: String,
        /// Name of the missing attribute (`lat` or `lon`).
        attribute: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Lon,
    Lat,
}

impl Axis {
    const fn attribute(self) -> &'static str {
        match self {
            Self::Lon => "lon",
            Self::Lat => "lat",
        }
    }

    fn read(self, snapshot: &ObjectSnapshot) -> Option<f64> {
        match (&snapshot.body, self) {
            (ObjectBody::Node { lon, .. }, Self::Lon) => *lon,
            (ObjectBody::Node { lat, .. }, Self::Lat) => *lat,
            _ => None,
        }
    }
}

/// Compute the fields for `snapshot`, falling back to `backup` for values the
/// server omitted.
///
/// Returns `Ok(None)` when the object should produce no rows: a way with
/// fewer than two members carrying coordinates, or a relation without
/// members.
///
/// # Errors
///
/// Returns [`ExtractError::MissingCoordinate`] when a node coordinate is
/// absent on both snapshots.
///
/// # Examples
/// ```
/// use roadchanges_core::{extract_fields, test_support::node};
///
/// # fn main() -> Result<(), roadchanges_core::ExtractError> {
/// let snapshot = node(3).stamped().at(10.0, 20.0).build();
/// let fields = extract_fields(&snapshot, None)?.expect("nodes always have fields");
/// assert_eq!(fields.osm_id, "node/3");
/// assert_eq!(fields.timestamp.as_deref(), Some("2024-05-01 12:00:00+00"));
/// # Ok(())
/// # }
/// ```
pub fn extract_fields(
    snapshot: &ObjectSnapshot,
    backup: Option<&ObjectSnapshot>,
) -> Result<Option<ObjectFields>, ExtractError> {
    let header = &snapshot.header;
    let osm_id = snapshot.osm_id();

    let location = match snapshot.kind() {
        ElementKind::Node => Some(Coord {
            x: node_coordinate(snapshot, backup, Axis::Lon, &osm_id)?,
            y: node_coordinate(snapshot, backup, Axis::Lat, &osm_id)?,
        }),
        ElementKind::Way | ElementKind::Relation => {
            let bounds = snapshot
                .bounds
                .or_else(|| backup.and_then(|other| other.bounds));
            if bounds.is_none() {
                warn!("Missing bounds for {osm_id}");
            }
            bounds.map(|rect| rect.center())
        }
    };

    let length = match snapshot.kind() {
        ElementKind::Way => {
            let nodes = match (snapshot.way_nodes(), backup) {
                ([], Some(other)) => other.way_nodes(),
                (own, _) => own,
            };
            let path: Vec<Coord<f64>> = nodes.iter().filter_map(|node| node.location).collect();
            if path.len() < 2 {
                return Ok(None);
            }
            Some(way_length(&path))
        }
        ElementKind::Relation if snapshot.relation_members().is_empty() => return Ok(None),
        ElementKind::Node | ElementKind::Relation => None,
    };

    Ok(Some(ObjectFields {
        timestamp: header.timestamp.as_deref().map(format_timestamp),
        changeset: header.changeset,
        uid: header.uid,
        username: header.user.clone(),
        osm_id,
        version: header.version,
        location,
        length,
    }))
}

fn node_coordinate(
    snapshot: &ObjectSnapshot,
    backup: Option<&ObjectSnapshot>,
    axis: Axis,
    osm_id: &str,
) -> Result<f64, ExtractError> {
    axis.read(snapshot)
        .or_else(|| backup.and_then(|other| axis.read(other)))
        .ok_or_else(|| ExtractError::MissingCoordinate {
            osm_id: osm_id.to_owned(),
            attribute: axis.attribute(),
        })
}

/// Rewrite an OSM timestamp into a PostgreSQL `timestamptz` literal.
///
/// # Examples
/// ```
/// use roadchanges_core::format_timestamp;
///
/// assert_eq!(format_timestamp("2024-05-01T12:00:00Z"), "2024-05-01 12:00:00+00");
/// ```
#[must_use]
pub fn format_timestamp(raw: &str) -> String {
    raw.replace('T', " ").replace('Z', "+00")
}

/// Length in metres of the WGS84 geodesic path through `path`, rounded to
/// the nearest metre.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use roadchanges_core::way_length;
///
/// let metres = way_length(&[Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 1.0 }]);
/// assert!((110_573..=110_575).contains(&metres));
/// ```
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "geodesic lengths are finite, non-negative and far below u64::MAX"
)]
pub fn way_length(path: &[Coord<f64>]) -> u64 {
    let line = LineString::from(path.to_vec());
    Geodesic.length(&line).round() as u64
}
