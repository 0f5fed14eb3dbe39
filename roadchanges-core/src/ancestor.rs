//! Best-effort detection of way splits and merges.
//!
//! A created way may be a piece cut from a way the same diff modified, and a
//! deleted way may have been merged into one. Matching compares node
//! reference lists only, so both false positives and misses are possible.

use std::collections::HashSet;

use crate::{Action, ChangeType, ElementKind, ObjectSnapshot};

/// How a way came to be a split/merge suspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WayFragment {
    /// The way is new; look for it in the old state of modified ways.
    Created,
    /// The way was removed; look for it in the new state of modified ways.
    Deleted,
}

/// Whether `way`'s nodes lie within `candidate`'s node list.
///
/// Both end nodes must appear in `candidate`, and so must strictly more than
/// half of all of `way`'s nodes.
///
/// # Examples
/// ```
/// use roadchanges_core::{is_contained_in, test_support::way};
///
/// let piece = way(2).nd_ref(2).nd_ref(3).nd_ref(4).build();
/// let whole = way(1).nd_ref(1).nd_ref(2).nd_ref(3).nd_ref(4).nd_ref(5).build();
/// assert!(is_contained_in(&piece, &whole));
/// assert!(!is_contained_in(&whole, &piece));
/// ```
#[must_use]
pub fn is_contained_in(way: &ObjectSnapshot, candidate: &ObjectSnapshot) -> bool {
    let nodes = way.way_nodes();
    let (Some(first), Some(last)) = (nodes.first(), nodes.last()) else {
        return false;
    };
    let candidate_refs: HashSet<i64> = candidate
        .way_nodes()
        .iter()
        .map(|node| node.node_ref)
        .collect();
    if !candidate_refs.contains(&first.node_ref) || !candidate_refs.contains(&last.node_ref) {
        return false;
    }
    let shared = nodes
        .iter()
        .filter(|node| candidate_refs.contains(&node.node_ref))
        .count();
    shared.saturating_mul(2) > nodes.len()
}

/// Find the modified way that `way` was most likely split from or merged
/// into.
///
/// Scans `modify` actions in document order and returns the first way
/// snapshot containing `way` (see [`is_contained_in`]). Non-way input never
/// matches.
#[must_use]
pub fn find_ancestor<'a>(
    way: &ObjectSnapshot,
    actions: &'a [Action],
    fragment: WayFragment,
) -> Option<&'a ObjectSnapshot> {
    if way.kind() != ElementKind::Way {
        return None;
    }
    actions
        .iter()
        .filter(|action| action.change_type() == ChangeType::Modify)
        .filter_map(|action| match fragment {
            WayFragment::Created => action.old_snapshot(),
            WayFragment::Deleted => Some(action.new_snapshot()),
        })
        .find(|candidate| candidate.kind() == ElementKind::Way && is_contained_in(way, candidate))
}
