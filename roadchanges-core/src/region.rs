//! Region lookup seam between row assembly and spatial index adapters.

use geo::Coord;

/// Read-only lookup of the region containing a point.
///
/// Coordinates use WGS84 with `x = longitude` and `y = latitude`.
/// Implementations must be deterministic: the same point always resolves to
/// the same label for the lifetime of the lookup.
///
/// # Examples
///
/// ```rust
/// use geo::{Contains, Coord, Rect};
/// use roadchanges_core::RegionLookup;
///
/// struct Boxes(Vec<(String, Rect<f64>)>);
///
/// impl RegionLookup for Boxes {
///     fn find(&self, location: Coord<f64>) -> Option<&str> {
///         self.0
///             .iter()
///             .find(|(_, rect)| rect.contains(&location))
///             .map(|(label, _)| label.as_str())
///     }
/// }
///
/// let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 2.0 });
/// let regions = Boxes(vec![("centre".into(), rect)]);
/// assert_eq!(regions.find(Coord { x: 1.0, y: 1.0 }), Some("centre"));
/// assert_eq!(regions.find(Coord { x: 5.0, y: 1.0 }), None);
/// ```
pub trait RegionLookup {
    /// Return the label of a region whose interior contains `location`.
    fn find(&self, location: Coord<f64>) -> Option<&str>;
}
