//! Detection of semantic road changes from tag differences.
//!
//! Each [`Category`] is derived from one or more tag keys. The helpers here
//! compare a snapshot against its predecessor; a missing snapshot (an object
//! that did not exist before) behaves as an object without tags.

use serde::Serialize;

use crate::{ChangeType, ElementKind, ObjectSnapshot};

/// Road change categories recognised by the classifier.
///
/// # Examples
/// ```
/// use roadchanges_core::Category;
///
/// assert_eq!(Category::CrossingIsland.as_str(), "crossing_island");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// `traffic_calming` on nodes.
    TrafficCalming,
    /// `highway=crossing` on nodes.
    Crossing,
    /// `crossing:island` on nodes that are not new or removed crossings.
    CrossingIsland,
    /// `highway=bus_stop` on nodes.
    Stop,
    /// Any of the `maxspeed` keys on ways.
    Maxspeed,
    /// Any of the `lanes` keys on ways.
    Lanes,
    /// `lit` on ways.
    Lit,
}

impl Category {
    /// Return the category name written to output rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TrafficCalming => "traffic_calming",
            Self::Crossing => "crossing",
            Self::CrossingIsland => "crossing_island",
            Self::Stop => "stop",
            Self::Maxspeed => "maxspeed",
            Self::Lanes => "lanes",
            Self::Lit => "lit",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const MAXSPEED_KEYS: [&str; 3] = ["maxspeed", "maxspeed:backward", "maxspeed:forward"];
const LANES_KEYS: [&str; 3] = ["lanes", "lanes:backward", "lanes:forward"];

/// Value of `key`, treating a missing object and an empty value as absent.
fn tag_value<'a>(key: &str, object: Option<&'a ObjectSnapshot>) -> Option<&'a str> {
    object
        .and_then(|snapshot| snapshot.tag(key))
        .filter(|value| !value.is_empty())
}

/// Classify how the value of `key` changed between `old` and `new`.
///
/// # Examples
/// ```
/// use roadchanges_core::{ChangeType, tag_action, test_support::node};
///
/// let old = node(1).tag("lit", "no").build();
/// let new = node(1).tag("lit", "yes").build();
/// assert_eq!(tag_action("lit", Some(&new), Some(&old)), Some(ChangeType::Modify));
/// assert_eq!(tag_action("lit", Some(&new), None), Some(ChangeType::Create));
/// assert_eq!(tag_action("lit", None, None), None);
/// ```
#[must_use]
pub fn tag_action(
    key: &str,
    new: Option<&ObjectSnapshot>,
    old: Option<&ObjectSnapshot>,
) -> Option<ChangeType> {
    match (tag_value(key, new), tag_value(key, old)) {
        (new_value, old_value) if new_value == old_value => None,
        (Some(_), None) => Some(ChangeType::Create),
        (None, Some(_)) => Some(ChangeType::Delete),
        (Some(_), Some(_)) => Some(ChangeType::Modify),
        (None, None) => None,
    }
}

/// Classify whether `key=value` started or stopped holding.
///
/// Presence of one exact value is binary, so this never reports `Modify`.
#[must_use]
pub fn value_action(
    key: &str,
    value: &str,
    new: Option<&ObjectSnapshot>,
    old: Option<&ObjectSnapshot>,
) -> Option<ChangeType> {
    let has_new = tag_value(key, new) == Some(value);
    let has_old = tag_value(key, old) == Some(value);
    match (has_new, has_old) {
        (true, false) => Some(ChangeType::Create),
        (false, true) => Some(ChangeType::Delete),
        (true, true) | (false, false) => None,
    }
}

/// Collapse per-key actions that jointly describe one category.
///
/// Returns `None` when nothing changed, the single action type when only one
/// kind of change occurred, and `Modify` when different kinds were mixed.
///
/// # Examples
/// ```
/// use roadchanges_core::{ChangeType, reduce_actions};
///
/// let mixed = [Some(ChangeType::Create), None, Some(ChangeType::Delete)];
/// assert_eq!(reduce_actions(mixed), Some(ChangeType::Modify));
/// assert_eq!(reduce_actions([None, Some(ChangeType::Create)]), Some(ChangeType::Create));
/// assert_eq!(reduce_actions([None, None]), None);
/// ```
#[must_use]
pub fn reduce_actions<I>(actions: I) -> Option<ChangeType>
where
    I: IntoIterator<Item = Option<ChangeType>>,
{
    actions
        .into_iter()
        .flatten()
        .fold(None, |reduced, action| match reduced {
            None => Some(action),
            Some(previous) if previous == action => Some(previous),
            Some(_) => Some(ChangeType::Modify),
        })
}

fn reduce_keys(
    keys: &[&str],
    new: Option<&ObjectSnapshot>,
    old: Option<&ObjectSnapshot>,
) -> Option<ChangeType> {
    reduce_actions(keys.iter().map(|key| tag_action(key, new, old)))
}

/// Determine which categories changed between `old` and `new`.
///
/// Only categories with a change are returned, in a fixed order per element
/// kind. Relations never produce categories.
///
/// # Examples
/// ```
/// use roadchanges_core::{Category, ChangeType, classify, test_support::node};
///
/// let stop = node(1).tag("highway", "bus_stop").build();
/// assert_eq!(classify(&stop, None), vec![(Category::Stop, ChangeType::Create)]);
/// ```
#[must_use]
pub fn classify(new: &ObjectSnapshot, old: Option<&ObjectSnapshot>) -> Vec<(Category, ChangeType)> {
    let current = Some(new);
    let candidates = match new.kind() {
        ElementKind::Node => {
            let crossing = value_action("highway", "crossing", current, old).map_or_else(
                || {
                    (
                        Category::CrossingIsland,
                        tag_action("crossing:island", current, old),
                    )
                },
                |action| (Category::Crossing, Some(action)),
            );
            vec![
                (
                    Category::TrafficCalming,
                    tag_action("traffic_calming", current, old),
                ),
                crossing,
                (
                    Category::Stop,
                    value_action("highway", "bus_stop", current, old),
                ),
            ]
        }
        ElementKind::Way => vec![
            (Category::Maxspeed, reduce_keys(&MAXSPEED_KEYS, current, old)),
            (Category::Lanes, reduce_keys(&LANES_KEYS, current, old)),
            (Category::Lit, tag_action("lit", current, old)),
        ],
        ElementKind::Relation => Vec::new(),
    };
    candidates
        .into_iter()
        .filter_map(|(category, action)| action.map(|change| (category, change)))
        .collect()
}
