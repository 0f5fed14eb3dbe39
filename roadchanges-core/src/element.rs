//! OpenStreetMap object snapshots as carried by an augmented diff.
//!
//! A snapshot is one version of a node, way or relation. Snapshots on the
//! `old` side of a diff are often sparse: the server omits attributes that
//! did not change, so most fields are optional and callers fall back to the
//! paired snapshot when a value is missing.

use geo::{Coord, Rect};

/// Kind of OpenStreetMap element.
///
/// # Examples
/// ```
/// use roadchanges_core::ElementKind;
///
/// assert_eq!(ElementKind::Way.as_str(), "way");
/// assert_eq!("node".parse::<ElementKind>(), Ok(ElementKind::Node));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A single point.
    Node,
    /// An ordered list of node references.
    Way,
    /// A list of members referencing other elements.
    Relation,
}

impl ElementKind {
    /// Return the element name used in OSM XML.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Self::Node),
            "way" => Ok(Self::Way),
            "relation" => Ok(Self::Relation),
            _ => Err(format!("unknown element kind '{s}'")),
        }
    }
}

/// Ordered key/value tags.
///
/// Source documents may repeat a key; lookups return the first match.
///
/// # Examples
/// ```
/// use roadchanges_core::Tags;
///
/// let tags = Tags::from_iter([("lit", "yes"), ("lit", "no")]);
/// assert_eq!(tags.get("lit"), Some("yes"));
/// assert_eq!(tags.get("lanes"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(Vec<(String, String)>);

impl Tags {
    /// Create an empty tag list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a tag, keeping document order.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Return the first value recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    /// Number of tags, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list holds no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Tags
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Identity and provenance attributes shared by every element kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHeader {
    /// OSM identifier, unique per element kind.
    pub id: i64,
    /// Element version.
    pub version: Option<u64>,
    /// Changeset that produced this version.
    pub changeset: Option<u64>,
    /// Numeric id of the editing user.
    pub uid: Option<u64>,
    /// Display name of the editing user.
    pub user: Option<String>,
    /// ISO 8601 timestamp as written by the server, e.g. `2024-01-01T10:00:00Z`.
    pub timestamp: Option<String>,
}

/// A node reference inside a way, with the coordinate cached by the diff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayNode {
    /// Referenced node id.
    pub node_ref: i64,
    /// Cached location (`x = longitude`, `y = latitude`), when present.
    pub location: Option<Coord<f64>>,
}

/// A relation member reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMember {
    /// Kind of the referenced element.
    pub kind: ElementKind,
    /// Referenced element id.
    pub member_ref: i64,
    /// Role of the member within the relation.
    pub role: String,
}

/// Kind-specific geometry of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectBody {
    /// Node coordinates. Either may be missing on sparse snapshots.
    Node {
        /// Longitude in degrees.
        lon: Option<f64>,
        /// Latitude in degrees.
        lat: Option<f64>,
    },
    /// Way member references in path order.
    Way {
        /// Member nodes.
        nodes: Vec<WayNode>,
    },
    /// Relation members.
    Relation {
        /// Member references.
        members: Vec<RelationMember>,
    },
}

/// One version of an OSM element.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSnapshot {
    /// Identity attributes.
    pub header: ObjectHeader,
    /// Tags in document order.
    pub tags: Tags,
    /// Bounding box supplied by the diff (`x = longitude`, `y = latitude`).
    pub bounds: Option<Rect<f64>>,
    /// Kind-specific geometry.
    pub body: ObjectBody,
}

impl ObjectSnapshot {
    /// Kind of element this snapshot describes.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self.body {
            ObjectBody::Node { .. } => ElementKind::Node,
            ObjectBody::Way { .. } => ElementKind::Way,
            ObjectBody::Relation { .. } => ElementKind::Relation,
        }
    }

    /// Typed reference such as `way/42`.
    #[must_use]
    pub fn osm_id(&self) -> String {
        format!("{}/{}", self.kind(), self.header.id)
    }

    /// First value of the tag `key`.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key)
    }

    /// Member nodes of a way; empty for other kinds.
    #[must_use]
    pub fn way_nodes(&self) -> &[WayNode] {
        match &self.body {
            ObjectBody::Way { nodes } => nodes,
            ObjectBody::Node { .. } | ObjectBody::Relation { .. } => &[],
        }
    }

    /// Members of a relation; empty for other kinds.
    #[must_use]
    pub fn relation_members(&self) -> &[RelationMember] {
        match &self.body {
            ObjectBody::Relation { members } => members,
            ObjectBody::Node { .. } | ObjectBody::Way { .. } => &[],
        }
    }
}
