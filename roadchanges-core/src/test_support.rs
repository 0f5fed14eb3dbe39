//! Snapshot builders shared by unit, behaviour and downstream crate tests.
//!
//! # Examples
//! ```
//! use roadchanges_core::test_support::way;
//!
//! let snapshot = way(10)
//!     .tag("maxspeed", "50")
//!     .nd(1, 0.0, 0.0)
//!     .nd(2, 0.0, 1.0)
//!     .build();
//! assert_eq!(snapshot.way_nodes().len(), 2);
//! ```

use geo::{Coord, Rect};

use crate::{
    ElementKind, ObjectBody, ObjectHeader, ObjectSnapshot, RegionLookup, RelationMember, Tags,
    WayNode,
};

/// Fluent builder for [`ObjectSnapshot`] values.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    header: ObjectHeader,
    tags: Tags,
    bounds: Option<Rect<f64>>,
    body: ObjectBody,
}

/// Start a node snapshot without coordinates.
#[must_use]
pub fn node(id: i64) -> SnapshotBuilder {
    SnapshotBuilder::new(id, ObjectBody::Node { lon: None, lat: None })
}

/// Start a way snapshot without members.
#[must_use]
pub fn way(id: i64) -> SnapshotBuilder {
    SnapshotBuilder::new(id, ObjectBody::Way { nodes: Vec::new() })
}

/// Start a relation snapshot without members.
#[must_use]
pub fn relation(id: i64) -> SnapshotBuilder {
    SnapshotBuilder::new(
        id,
        ObjectBody::Relation {
            members: Vec::new(),
        },
    )
}

impl SnapshotBuilder {
    fn new(id: i64, body: ObjectBody) -> Self {
        Self {
            header: ObjectHeader {
                id,
                ..ObjectHeader::default()
            },
            tags: Tags::new(),
            bounds: None,
            body,
        }
    }

    /// Fill version, changeset, user and timestamp with plausible values.
    #[must_use]
    pub fn stamped(self) -> Self {
        self.version(1)
            .changeset(100)
            .uid(5)
            .user("mapper")
            .timestamp("2024-05-01T12:00:00Z")
    }

    /// Set the element version.
    #[must_use]
    pub fn version(mut self, version: u64) -> Self {
        self.header.version = Some(version);
        self
    }

    /// Set the changeset id.
    #[must_use]
    pub fn changeset(mut self, changeset: u64) -> Self {
        self.header.changeset = Some(changeset);
        self
    }

    /// Set the user id.
    #[must_use]
    pub fn uid(mut self, uid: u64) -> Self {
        self.header.uid = Some(uid);
        self
    }

    /// Set the user name.
    #[must_use]
    pub fn user(mut self, user: &str) -> Self {
        self.header.user = Some(user.to_owned());
        self
    }

    /// Set the raw timestamp.
    #[must_use]
    pub fn timestamp(mut self, timestamp: &str) -> Self {
        self.header.timestamp = Some(timestamp.to_owned());
        self
    }

    /// Append a tag.
    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push(key, value);
        self
    }

    /// Set both node coordinates. Ignored for other kinds.
    #[must_use]
    pub fn at(mut self, lon: f64, lat: f64) -> Self {
        if let ObjectBody::Node {
            lon: node_lon,
            lat: node_lat,
        } = &mut self.body
        {
            *node_lon = Some(lon);
            *node_lat = Some(lat);
        }
        self
    }

    /// Set the bounding box.
    #[must_use]
    pub fn bounds(mut self, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        self.bounds = Some(Rect::new(
            Coord {
                x: min_lon,
                y: min_lat,
            },
            Coord {
                x: max_lon,
                y: max_lat,
            },
        ));
        self
    }

    /// Append a way member with a cached coordinate. Ignored for other kinds.
    #[must_use]
    pub fn nd(self, node_ref: i64, lon: f64, lat: f64) -> Self {
        self.way_node(WayNode {
            node_ref,
            location: Some(Coord { x: lon, y: lat }),
        })
    }

    /// Append a way member without a coordinate. Ignored for other kinds.
    #[must_use]
    pub fn nd_ref(self, node_ref: i64) -> Self {
        self.way_node(WayNode {
            node_ref,
            location: None,
        })
    }

    fn way_node(mut self, member: WayNode) -> Self {
        if let ObjectBody::Way { nodes } = &mut self.body {
            nodes.push(member);
        }
        self
    }

    /// Append a relation member. Ignored for other kinds.
    #[must_use]
    pub fn member(mut self, kind: ElementKind, member_ref: i64, role: &str) -> Self {
        if let ObjectBody::Relation { members } = &mut self.body {
            members.push(RelationMember {
                kind,
                member_ref,
                role: role.to_owned(),
            });
        }
        self
    }

    /// Finish the snapshot.
    #[must_use]
    pub fn build(self) -> ObjectSnapshot {
        ObjectSnapshot {
            header: self.header,
            tags: self.tags,
            bounds: self.bounds,
            body: self.body,
        }
    }
}

/// Labelled axis-aligned boxes; the first box containing a point wins.
///
/// Boxes are given as `(min_lon, min_lat, max_lon, max_lat)`, edges
/// included.
#[derive(Debug, Clone, Default)]
pub struct BoxRegions(Vec<(String, Rect<f64>)>);

impl<'a> FromIterator<(&'a str, (f64, f64, f64, f64))> for BoxRegions {
    fn from_iter<I: IntoIterator<Item = (&'a str, (f64, f64, f64, f64))>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(label, (min_lon, min_lat, max_lon, max_lat))| {
                    let rect = Rect::new(
                        Coord {
                            x: min_lon,
                            y: min_lat,
                        },
                        Coord {
                            x: max_lon,
                            y: max_lat,
                        },
                    );
                    (label.to_owned(), rect)
                })
                .collect(),
        )
    }
}

impl RegionLookup for BoxRegions {
    fn find(&self, location: Coord<f64>) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, rect)| {
                let (min, max) = (rect.min(), rect.max());
                (min.x..=max.x).contains(&location.x) && (min.y..=max.y).contains(&location.y)
            })
            .map(|(label, _)| label.as_str())
    }
}
