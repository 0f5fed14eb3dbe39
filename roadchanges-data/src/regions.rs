//! Region polygons loaded from a delimited `label,hex-wkb` file.
//!
//! Each line names a region and carries its geometry as hex-encoded WKB or
//! EWKB, either a `Polygon` or a `MultiPolygon`. Candidate regions are found
//! through an R\*-tree over their bounding boxes and then confirmed with an
//! exact containment test.

use std::io::Read;

use geo::{BoundingRect, Contains, Coord, Geometry, MultiPolygon, Point};
use geozero::ToGeo;
use geozero::wkb::Ewkb;
use log::debug;
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

use roadchanges_core::RegionLookup;

/// Settings for reading a region file.
///
/// # Examples
/// ```
/// use roadchanges_data::RegionReaderConfig;
///
/// let config = RegionReaderConfig::default();
/// assert_eq!(config.delimiter, b',');
/// assert_eq!(config.max_field_len, None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionReaderConfig {
    /// Field separator.
    pub delimiter: u8,
    /// Largest accepted field, in bytes. `None` accepts any size.
    pub max_field_len: Option<usize>,
}

impl Default for RegionReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            max_field_len: None,
        }
    }
}

/// Errors raised while loading regions.
#[derive(Debug, Error)]
pub enum RegionLoadError {
    /// The file is not valid delimited text.
    #[error("failed to read region file: {0}")]
    Csv(#[from] csv::Error),
    /// A line has a label but no geometry column.
    #[error("region '{label}' on line {line} has no geometry column")]
    MissingGeometry {
        /// 1-based line number.
        line: u64,
        /// Region label.
        label: String,
    },
    /// A field exceeds the configured size limit.
    #[error("region '{label}' on line {line} has a field longer than {limit} bytes")]
    FieldTooLarge {
        /// 1-based line number.
        line: u64,
        /// Region label.
        label: String,
        /// Configured limit.
        limit: usize,
    },
    /// The geometry column is not valid hexadecimal.
    #[error("region '{label}' on line {line} has invalid hex: {source}")]
    Hex {
        /// 1-based line number.
        line: u64,
        /// Region label.
        label: String,
        /// Decoder error.
        #[source]
        source: hex::FromHexError,
    },
    /// The decoded bytes are not valid WKB.
    #[error("region '{label}' on line {line} has invalid WKB: {source}")]
    Wkb {
        /// 1-based line number.
        line: u64,
        /// Region label.
        label: String,
        /// Decoder error.
        #[source]
        source: geozero::error::GeozeroError,
    },
    /// The geometry is neither a polygon nor a multipolygon.
    #[error("region '{label}' on line {line} is a {kind}, expected a polygon or multipolygon")]
    UnsupportedGeometry {
        /// 1-based line number.
        line: u64,
        /// Region label.
        label: String,
        /// Geometry type found.
        kind: &'static str,
    },
}

#[derive(Debug, Clone)]
struct Region {
    label: String,
    area: MultiPolygon<f64>,
}

/// R\*-tree entry pointing back into the region list.
#[derive(Debug, Clone)]
struct IndexedRegion {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedRegion {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Immutable set of labelled regions with a spatial index.
///
/// Regions keep the order they were loaded in. When several regions
/// contain a point, the earliest one wins.
///
/// # Examples
/// ```
/// use geo::{Coord, MultiPolygon, Rect};
/// use roadchanges_core::RegionLookup;
/// use roadchanges_data::RegionIndex;
///
/// let square = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 2.0 }).to_polygon();
/// let index = RegionIndex::from_regions([("centre", MultiPolygon::new(vec![square]))]);
/// assert_eq!(index.find(Coord { x: 1.0, y: 1.0 }), Some("centre"));
/// assert_eq!(index.find(Coord { x: 3.0, y: 1.0 }), None);
/// ```
#[derive(Debug, Clone)]
pub struct RegionIndex {
    regions: Vec<Region>,
    tree: RTree<IndexedRegion>,
}

impl RegionIndex {
    /// Build an index from labelled areas, in priority order.
    pub fn from_regions<I, L>(areas: I) -> Self
    where
        I: IntoIterator<Item = (L, MultiPolygon<f64>)>,
        L: Into<String>,
    {
        let regions: Vec<Region> = areas
            .into_iter()
            .map(|(label, area)| Region {
                label: label.into(),
                area,
            })
            .collect();
        let entries = regions
            .iter()
            .enumerate()
            .filter_map(|(index, region)| {
                region.area.bounding_rect().map(|rect| IndexedRegion {
                    index,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        Self {
            regions,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Read regions from `source`.
    ///
    /// Lines are `label<delimiter>hex-wkb`; further columns are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RegionLoadError`] for unreadable input, a missing geometry
    /// column, an oversized field, or geometry that is not a valid polygon or
    /// multipolygon.
    pub fn load<R: Read>(source: R, config: &RegionReaderConfig) -> Result<Self, RegionLoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(config.delimiter)
            .from_reader(source);

        let mut regions = Vec::new();
        for record in reader.records() {
            let row = record?;
            let line = row.position().map_or(0, csv::Position::line);
            let label = row.get(0).unwrap_or_default().to_owned();
            if let Some(limit) = config.max_field_len
                && row.iter().any(|field| field.len() > limit)
            {
                return Err(RegionLoadError::FieldTooLarge { line, label, limit });
            }
            let Some(blob) = row.get(1) else {
                return Err(RegionLoadError::MissingGeometry { line, label });
            };
            let area = decode_area(blob.trim(), line, &label)?;
            regions.push((label, area));
        }
        debug!("Loaded {} regions", regions.len());
        Ok(Self::from_regions(regions))
    }

    /// Number of loaded regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no regions were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region labels in load order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|region| region.label.as_str())
    }
}

impl RegionLookup for RegionIndex {
    fn find(&self, location: Coord<f64>) -> Option<&str> {
        let point = Point::from(location);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([location.x, location.y]))
            .map(|entry| entry.index)
            .filter(|&index| {
                self.regions
                    .get(index)
                    .is_some_and(|region| region.area.contains(&point))
            })
            .min()
            .and_then(|index| self.regions.get(index))
            .map(|region| region.label.as_str())
    }
}

fn decode_area(blob: &str, line: u64, label: &str) -> Result<MultiPolygon<f64>, RegionLoadError> {
    let bytes = hex::decode(blob).map_err(|source| RegionLoadError::Hex {
        line,
        label: label.to_owned(),
        source,
    })?;
    let geometry = Ewkb(bytes)
        .to_geo()
        .map_err(|source| RegionLoadError::Wkb {
            line,
            label: label.to_owned(),
            source,
        })?;
    match geometry {
        Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(areas) => Ok(areas),
        other => Err(RegionLoadError::UnsupportedGeometry {
            line,
            label: label.to_owned(),
            kind: geometry_kind(&other),
        }),
    }
}

const fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Rect, polygon};
    use rstest::{fixture, rstest};

    /// WKB polygon `(0 0, 10 0, 10 10, 0 10, 0 0)`.
    const SQUARE_WKB: &str = concat!(
        "0103000000010000000500000000000000000000000000000000000000000000",
        "0000002440000000000000000000000000000024400000000000002440000000",
        "0000000000000000000000244000000000000000000000000000000000",
    );

    /// WKB point `(1 2)`.
    const POINT_WKB: &str = "0101000000000000000000f03f0000000000000040";

    fn square(min: f64, max: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![
            Rect::new(Coord { x: min, y: min }, Coord { x: max, y: max }).to_polygon(),
        ])
    }

    #[fixture]
    fn nested() -> RegionIndex {
        RegionIndex::from_regions([
            ("outer", square(0.0, 10.0)),
            ("inner", square(2.0, 4.0)),
            ("far", square(50.0, 60.0)),
        ])
    }

    #[rstest]
    #[case(Coord { x: 3.0, y: 3.0 }, Some("outer"))]
    #[case(Coord { x: 8.0, y: 8.0 }, Some("outer"))]
    #[case(Coord { x: 55.0, y: 55.0 }, Some("far"))]
    #[case(Coord { x: 20.0, y: 20.0 }, None)]
    fn earliest_containing_region_wins(
        nested: RegionIndex,
        #[case] location: Coord<f64>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(nested.find(location), expected);
    }

    #[rstest]
    fn bounding_box_hits_are_confirmed_by_the_polygon() {
        let triangle = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 0.0, y: 10.0)];
        let index = RegionIndex::from_regions([("wedge", MultiPolygon::new(vec![triangle]))]);
        assert_eq!(index.find(Coord { x: 1.0, y: 1.0 }), Some("wedge"));
        assert_eq!(index.find(Coord { x: 9.0, y: 9.0 }), None);
    }

    #[rstest]
    fn loads_hex_wkb_polygons() {
        let text = format!("downtown,{SQUARE_WKB}\n");
        let index =
            RegionIndex::load(text.as_bytes(), &RegionReaderConfig::default()).expect("regions");
        assert_eq!(index.len(), 1);
        assert_eq!(index.labels().collect::<Vec<_>>(), vec!["downtown"]);
        assert_eq!(index.find(Coord { x: 5.0, y: 5.0 }), Some("downtown"));
    }

    #[rstest]
    fn honours_custom_delimiters() {
        let text = format!("downtown;{SQUARE_WKB}\n");
        let config = RegionReaderConfig {
            delimiter: b';',
            ..RegionReaderConfig::default()
        };
        let index = RegionIndex::load(text.as_bytes(), &config).expect("regions");
        assert_eq!(index.find(Coord { x: 5.0, y: 5.0 }), Some("downtown"));
    }

    #[rstest]
    fn empty_files_yield_empty_indexes() {
        let index = RegionIndex::load(&b""[..], &RegionReaderConfig::default()).expect("regions");
        assert!(index.is_empty());
        assert_eq!(index.find(Coord { x: 0.0, y: 0.0 }), None);
    }

    #[rstest]
    fn oversized_fields_are_rejected() {
        let text = format!("downtown,{SQUARE_WKB}\n");
        let config = RegionReaderConfig {
            max_field_len: Some(16),
            ..RegionReaderConfig::default()
        };
        let err = RegionIndex::load(text.as_bytes(), &config).expect_err("field too large");
        assert!(matches!(
            err,
            RegionLoadError::FieldTooLarge { line: 1, limit: 16, .. }
        ));
    }

    #[rstest]
    fn rows_without_geometry_are_rejected() {
        let text = format!("downtown,{SQUARE_WKB}\nsuburb\n");
        let err = RegionIndex::load(text.as_bytes(), &RegionReaderConfig::default())
            .expect_err("missing geometry");
        match err {
            RegionLoadError::MissingGeometry { line, label } => {
                assert_eq!((line, label.as_str()), (2, "suburb"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[rstest]
    #[case("zz")]
    #[case("abc")]
    fn bad_hex_is_rejected(#[case] blob: &str) {
        let text = format!("downtown,{blob}\n");
        let err = RegionIndex::load(text.as_bytes(), &RegionReaderConfig::default())
            .expect_err("bad hex");
        assert!(matches!(err, RegionLoadError::Hex { line: 1, .. }), "got {err:?}");
    }

    #[rstest]
    fn truncated_wkb_is_rejected() {
        let text = "downtown,0103000000\n";
        let err = RegionIndex::load(text.as_bytes(), &RegionReaderConfig::default())
            .expect_err("bad wkb");
        assert!(matches!(err, RegionLoadError::Wkb { .. }), "got {err:?}");
    }

    #[rstest]
    fn points_are_not_regions() {
        let text = format!("spot,{POINT_WKB}\n");
        let err = RegionIndex::load(text.as_bytes(), &RegionReaderConfig::default())
            .expect_err("point geometry");
        assert!(
            matches!(err, RegionLoadError::UnsupportedGeometry { kind: "Point", .. }),
            "got {err:?}"
        );
    }
}
