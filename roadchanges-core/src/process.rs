//! Turning diff actions into output rows.

use log::warn;

use crate::{
    Action, ChangeRow, ChangeType, ElementKind, ExtractError, ObjectSnapshot, RegionLookup,
    WayFragment, classify, extract_fields, find_ancestor,
};

/// What to do with a detected split/merge ancestor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AncestorMode {
    /// Log the match and leave classification untouched.
    #[default]
    Report,
    /// Log the match and classify against the ancestor: it replaces the old
    /// side of a created way and the new side of a deleted way.
    Fold,
}

/// Row assembly over one parsed diff.
///
/// The extractor only reads the diff; each action is processed
/// independently apart from the read-only ancestor scan.
///
/// # Examples
/// ```
/// use roadchanges_core::{Action, Category, ChangeExtractor, test_support::node};
///
/// # fn main() -> Result<(), roadchanges_core::ExtractError> {
/// let actions = vec![Action::create(
///     node(1).stamped().tag("highway", "bus_stop").at(10.0, 20.0).build(),
/// )];
/// let rows = ChangeExtractor::new(&actions).collect_rows()?;
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].kind, Category::Stop);
/// # Ok(())
/// # }
/// ```
pub struct ChangeExtractor<'a> {
    actions: &'a [Action],
    regions: Option<&'a dyn RegionLookup>,
    ancestor_mode: AncestorMode,
}

impl<'a> ChangeExtractor<'a> {
    /// Process `actions` without region labels.
    #[must_use]
    pub const fn new(actions: &'a [Action]) -> Self {
        Self {
            actions,
            regions: None,
            ancestor_mode: AncestorMode::Report,
        }
    }

    /// Label rows by region and drop objects outside every region.
    #[must_use]
    pub const fn with_regions(mut self, regions: &'a dyn RegionLookup) -> Self {
        self.regions = Some(regions);
        self
    }

    /// Choose how detected ancestors affect classification.
    #[must_use]
    pub const fn with_ancestor_mode(mut self, mode: AncestorMode) -> Self {
        self.ancestor_mode = mode;
        self
    }

    /// Actions this extractor reads.
    #[must_use]
    pub const fn actions(&self) -> &'a [Action] {
        self.actions
    }

    /// Rows emitted by a single action, one per fired category.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when a node has no coordinates on either
    /// snapshot.
    pub fn rows_for(&self, action: &Action) -> Result<Vec<ChangeRow>, ExtractError> {
        let new = action.new_snapshot();
        let old = action.old_snapshot();
        if new.kind() == ElementKind::Relation {
            return Ok(Vec::new());
        }
        let Some(fields) = extract_fields(new, old)? else {
            return Ok(Vec::new());
        };
        let (subject, previous) = self.resolve_ancestor(action);

        let region = match (self.regions, fields.location) {
            (Some(regions), Some(location)) => regions.find(location),
            _ => None,
        };
        if self.regions.is_some() && region.is_none() {
            return Ok(Vec::new());
        }

        Ok(classify(subject, previous)
            .into_iter()
            .map(|fired| ChangeRow::new(&fields, action.change_type(), fired, region))
            .collect())
    }

    /// Rows for every action, in document order.
    ///
    /// # Errors
    ///
    /// Stops at the first [`ExtractError`].
    pub fn collect_rows(&self) -> Result<Vec<ChangeRow>, ExtractError> {
        let mut rows = Vec::new();
        for action in self.actions {
            rows.extend(self.rows_for(action)?);
        }
        Ok(rows)
    }

    /// The `(new, old)` pair to classify, after ancestor detection.
    fn resolve_ancestor<'s>(
        &'s self,
        action: &'s Action,
    ) -> (&'s ObjectSnapshot, Option<&'s ObjectSnapshot>) {
        let new = action.new_snapshot();
        let old = action.old_snapshot();
        if new.kind() != ElementKind::Way {
            return (new, old);
        }
        let fold = self.ancestor_mode == AncestorMode::Fold;
        match (action.change_type(), old) {
            (ChangeType::Create, _) => {
                let Some(ancestor) = find_ancestor(new, self.actions, WayFragment::Created) else {
                    return (new, old);
                };
                warn!(
                    "Found ancestor {} for created way {}",
                    ancestor.header.id, new.header.id
                );
                if fold { (new, Some(ancestor)) } else { (new, old) }
            }
            (ChangeType::Delete, Some(removed)) => {
                let Some(ancestor) = find_ancestor(removed, self.actions, WayFragment::Deleted)
                else {
                    return (new, old);
                };
                warn!(
                    "Found ancestor {} for deleted way {}",
                    ancestor.header.id, removed.header.id
                );
                if fold { (ancestor, old) } else { (new, old) }
            }
            _ => (new, old),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Category;
    use crate::test_support::{BoxRegions, node, relation, way};
    use rstest::{fixture, rstest};

    #[fixture]
    fn regions() -> BoxRegions {
        BoxRegions::from_iter([("inner", (0.0, 0.0, 20.0, 30.0))])
    }

    #[rstest]
    fn bus_stop_creation_emits_one_row() {
        let actions = vec![Action::create(
            node(1)
                .stamped()
                .tag("highway", "bus_stop")
                .at(10.0, 20.0)
                .build(),
        )];
        let rows = ChangeExtractor::new(&actions)
            .collect_rows()
            .expect("rows");
        assert_eq!(rows.len(), 1);
        let row = rows.first().expect("one row");
        assert_eq!(row.kind, Category::Stop);
        assert_eq!(row.action, ChangeType::Create);
        assert_eq!(row.obj_action, ChangeType::Create);
        assert_eq!((row.lat, row.lon), (Some(20.0), Some(10.0)));
        assert_eq!(row.region, None);
    }

    #[rstest]
    fn rows_match_fired_categories() {
        let old = node(1).at(1.0, 1.0).tag("highway", "bus_stop").build();
        let new = node(1)
            .stamped()
            .at(1.0, 1.0)
            .tag("traffic_calming", "bump")
            .tag("highway", "crossing")
            .build();
        let actions = vec![Action::modify(old, new)];
        let rows = ChangeExtractor::new(&actions)
            .collect_rows()
            .expect("rows");
        let kinds: Vec<_> = rows.iter().map(|row| (row.kind, row.action)).collect();
        assert_eq!(
            kinds,
            vec![
                (Category::TrafficCalming, ChangeType::Create),
                (Category::Crossing, ChangeType::Create),
                (Category::Stop, ChangeType::Delete),
            ]
        );
        assert!(rows.iter().all(|row| row.obj_action == ChangeType::Modify));
    }

    #[rstest]
    fn relations_are_skipped() {
        let actions = vec![Action::create(
            relation(1)
                .bounds(0.0, 0.0, 1.0, 1.0)
                .member(ElementKind::Way, 2, "")
                .tag("lit", "yes")
                .build(),
        )];
        assert!(ChangeExtractor::new(&actions)
            .collect_rows()
            .expect("rows")
            .is_empty());
    }

    #[rstest]
    fn region_filter_labels_and_drops(regions: BoxRegions) {
        let inside = node(1).at(10.0, 20.0).tag("highway", "bus_stop").build();
        let outside = node(2).at(50.0, 20.0).tag("highway", "bus_stop").build();
        let actions = vec![Action::create(inside), Action::create(outside)];
        let rows = ChangeExtractor::new(&actions)
            .with_regions(&regions)
            .collect_rows()
            .expect("rows");
        assert_eq!(rows.len(), 1);
        let row = rows.first().expect("one row");
        assert_eq!(row.osm_id, "node/1");
        assert_eq!(row.region.as_deref(), Some("inner"));
    }

    #[rstest]
    fn region_filter_drops_objects_without_location(regions: BoxRegions) {
        let actions = vec![Action::create(
            way(1).nd(1, 1.0, 1.0).nd(2, 1.0, 2.0).tag("lit", "yes").build(),
        )];
        assert!(ChangeExtractor::new(&actions)
            .with_regions(&regions)
            .collect_rows()
            .expect("rows")
            .is_empty());
        let unfiltered = ChangeExtractor::new(&actions)
            .collect_rows()
            .expect("rows");
        assert_eq!(unfiltered.len(), 1);
        assert_eq!(unfiltered.first().and_then(|row| row.lat), None);
    }

    #[fixture]
    fn split_actions() -> Vec<Action> {
        let whole_old = way(1)
            .bounds(0.0, 0.0, 0.0, 0.4)
            .tag("lit", "yes")
            .nd(1, 0.0, 0.0)
            .nd(2, 0.0, 0.1)
            .nd(3, 0.0, 0.2)
            .nd(4, 0.0, 0.3)
            .nd(5, 0.0, 0.4)
            .build();
        let whole_new = way(1)
            .bounds(0.0, 0.0, 0.0, 0.2)
            .tag("lit", "yes")
            .nd(1, 0.0, 0.0)
            .nd(2, 0.0, 0.1)
            .nd(3, 0.0, 0.2)
            .build();
        let piece = way(2)
            .bounds(0.0, 0.2, 0.0, 0.4)
            .tag("lit", "yes")
            .nd(3, 0.0, 0.2)
            .nd(4, 0.0, 0.3)
            .nd(5, 0.0, 0.4)
            .build();
        vec![Action::modify(whole_old, whole_new), Action::create(piece)]
    }

    #[rstest]
    fn reported_ancestors_leave_rows_untouched(split_actions: Vec<Action>) {
        let rows = ChangeExtractor::new(&split_actions)
            .collect_rows()
            .expect("rows");
        assert_eq!(rows.len(), 1);
        let row = rows.first().expect("one row");
        assert_eq!((row.osm_id.as_str(), row.kind), ("way/2", Category::Lit));
    }

    #[rstest]
    fn folded_ancestors_replace_the_old_side(split_actions: Vec<Action>) {
        let rows = ChangeExtractor::new(&split_actions)
            .with_ancestor_mode(AncestorMode::Fold)
            .collect_rows()
            .expect("rows");
        assert!(rows.is_empty(), "lit was already set on the ancestor");
    }

    #[fixture]
    fn merge_actions() -> Vec<Action> {
        let survivor_old = way(1)
            .bounds(0.0, 0.0, 0.0, 0.1)
            .tag("lit", "yes")
            .nd(1, 0.0, 0.0)
            .nd(2, 0.0, 0.1)
            .build();
        let survivor_new = way(1)
            .bounds(0.0, 0.0, 0.0, 0.3)
            .tag("lit", "yes")
            .nd(1, 0.0, 0.0)
            .nd(2, 0.0, 0.1)
            .nd(3, 0.0, 0.2)
            .nd(4, 0.0, 0.3)
            .build();
        let absorbed_old = way(2)
            .bounds(0.0, 0.1, 0.0, 0.3)
            .tag("lit", "yes")
            .tag("maxspeed", "30")
            .nd(2, 0.0, 0.1)
            .nd(3, 0.0, 0.2)
            .nd(4, 0.0, 0.3)
            .build();
        let absorbed_new = way(2).stamped().version(2).build();
        vec![
            Action::modify(survivor_old, survivor_new),
            Action::delete(absorbed_old, absorbed_new),
        ]
    }

    #[rstest]
    fn reported_merges_emit_delete_rows(merge_actions: Vec<Action>) {
        let rows = ChangeExtractor::new(&merge_actions)
            .collect_rows()
            .expect("rows");
        let mut kinds: Vec<_> = rows.iter().map(|row| row.kind.as_str()).collect();
        kinds.sort_unstable();
        assert_eq!(kinds, vec!["lit", "maxspeed"]);
        assert!(rows.iter().all(|row| row.osm_id == "way/2"
            && row.action == ChangeType::Delete
            && row.obj_action == ChangeType::Delete));
        assert!(rows.iter().all(|row| row.length.is_some()));
    }

    #[rstest]
    fn folded_merges_compare_against_the_surviving_way(merge_actions: Vec<Action>) {
        let rows = ChangeExtractor::new(&merge_actions)
            .with_ancestor_mode(AncestorMode::Fold)
            .collect_rows()
            .expect("rows");
        assert_eq!(rows.len(), 1, "lit carries over to the surviving way");
        let row = rows.first().expect("one row");
        assert_eq!(row.osm_id, "way/2");
        assert_eq!(row.kind, Category::Maxspeed);
        assert_eq!(row.action, ChangeType::Delete);
        assert_eq!(row.obj_action, ChangeType::Delete);
    }

    #[rstest]
    fn missing_node_coordinates_abort() {
        let actions = vec![Action::create(node(4).tag("highway", "bus_stop").build())];
        let err = ChangeExtractor::new(&actions)
            .collect_rows()
            .expect_err("node without coordinates");
        assert!(matches!(err, ExtractError::MissingCoordinate { .. }));
    }
}
