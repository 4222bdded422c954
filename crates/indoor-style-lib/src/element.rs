//! Records and the uniform element reference
//!
//! A dataset holds three kinds of records: [`Point`]s with a coordinate,
//! [`Path`]s listing point ids, and [`Composite`]s grouping other records by
//! role. [`ElementRef`] borrows exactly one of them and is what the style
//! engine and all geometry consumers operate on.

use crate::coordinate::{BoundingBox, Coordinate};
use crate::tag::{Tag, TagKey, tag_value};
use crate::{Config, DataSet};
use geo::{Coord, LineString};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Record identifier, unique only within one record kind
pub type Id = i64;

/// The kind of a record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Kind {
    Point,
    Path,
    Composite,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Point => "point",
            Kind::Path => "path",
            Kind::Composite => "composite",
        }
    }
}

/// A single location
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Point {
    pub id: Id,
    pub coordinate: Coordinate,
    pub tags: Vec<Tag>,
}

/// An ordered list of point ids, closed if the first and last id are equal
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub id: Id,
    /// Cached bounding box, see [`DataSet::recompute_bounding_boxes`]
    pub bbox: BoundingBox,
    pub points: Vec<Id>,
    pub tags: Vec<Tag>,
}

impl Path {
    /// Whether the path returns to its starting point
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.points.len() >= 2 && self.points.first() == self.points.last()
    }

    /// Bounding box of all resolvable points, ignoring the cached value
    pub fn compute_bounding_box(&self, dataset: &DataSet) -> BoundingBox {
        self.points
            .iter()
            .filter_map(|&id| dataset.point(id))
            .fold(BoundingBox::default(), |bbox, point| {
                bbox.unite(BoundingBox::from_coordinate(point.coordinate))
            })
    }
}

/// A reference from a composite to another record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: Id,
    pub kind: Kind,
    pub role: String,
}

impl Member {
    pub fn new(kind: Kind, id: Id, role: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            role: role.into(),
        }
    }
}

/// A group of member records, e.g. the rings of a multipolygon
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Composite {
    pub id: Id,
    /// Cached bounding box, see [`DataSet::recompute_bounding_boxes`]
    pub bbox: BoundingBox,
    pub members: Vec<Member>,
    pub tags: Vec<Tag>,
}

/// Borrowed reference to one record of any kind
///
/// Copyable and allocation free; the lifetime ties it to the owning [`DataSet`].
#[derive(Clone, Copy, Debug)]
pub enum ElementRef<'a> {
    Point(&'a Point),
    Path(&'a Path),
    Composite(&'a Composite),
}

impl<'a> From<&'a Point> for ElementRef<'a> {
    fn from(point: &'a Point) -> Self {
        ElementRef::Point(point)
    }
}

impl<'a> From<&'a Path> for ElementRef<'a> {
    fn from(path: &'a Path) -> Self {
        ElementRef::Path(path)
    }
}

impl<'a> From<&'a Composite> for ElementRef<'a> {
    fn from(composite: &'a Composite) -> Self {
        ElementRef::Composite(composite)
    }
}

impl PartialEq for ElementRef<'_> {
    /// Identity comparison: same kind and same id
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.id() == other.id()
    }
}

impl Eq for ElementRef<'_> {}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a> ElementRef<'a> {
    #[inline]
    pub fn kind(&self) -> Kind {
        match self {
            ElementRef::Point(_) => Kind::Point,
            ElementRef::Path(_) => Kind::Path,
            ElementRef::Composite(_) => Kind::Composite,
        }
    }

    #[inline]
    pub fn id(&self) -> Id {
        match self {
            ElementRef::Point(point) => point.id,
            ElementRef::Path(path) => path.id,
            ElementRef::Composite(composite) => composite.id,
        }
    }

    #[inline]
    pub fn tags(&self) -> &'a [Tag] {
        match self {
            ElementRef::Point(point) => &point.tags,
            ElementRef::Path(path) => &path.tags,
            ElementRef::Composite(composite) => &composite.tags,
        }
    }

    /// Value of the tag with the given key, if present
    #[inline]
    pub fn tag_value(&self, key: TagKey) -> Option<&'a str> {
        tag_value(self.tags(), key)
    }

    /// Value of the tag with the given name
    ///
    /// The name is resolved through the interner of `dataset`, which must be
    /// the dataset this element belongs to.
    pub fn tag_value_by_name(&self, dataset: &DataSet, name: &str) -> Option<&'a str> {
        self.tag_value(dataset.tag_key(name)?)
    }

    /// Iterate over `(key, value)` pairs in stored order
    pub fn tag_iter(&self) -> impl Iterator<Item = (TagKey, &'a str)> + 'a {
        self.tags().iter().map(|tag| (tag.key, tag.value.as_str()))
    }

    /// Cached bounding box; a degenerate box for points
    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            ElementRef::Point(point) => BoundingBox::from_coordinate(point.coordinate),
            ElementRef::Path(path) => path.bbox,
            ElementRef::Composite(composite) => composite.bbox,
        }
    }

    /// Own coordinate for points, bounding box center otherwise
    pub fn center(&self) -> Coordinate {
        match self {
            ElementRef::Point(point) => point.coordinate,
            ElementRef::Path(path) => path.bbox.center(),
            ElementRef::Composite(composite) => composite.bbox.center(),
        }
    }

    #[inline]
    pub fn as_point(&self) -> Option<&'a Point> {
        match self {
            ElementRef::Point(point) => Some(point),
            _ => None,
        }
    }

    #[inline]
    pub fn as_path(&self) -> Option<&'a Path> {
        match self {
            ElementRef::Path(path) => Some(path),
            _ => None,
        }
    }

    #[inline]
    pub fn as_composite(&self) -> Option<&'a Composite> {
        match self {
            ElementRef::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    /// Points describing the outer boundary of this element
    ///
    /// See [`ElementRef::outer_path_with`]; uses the default [`Config`] names.
    pub fn outer_path(&self, dataset: &'a DataSet) -> Vec<&'a Point> {
        self.outer_path_with(dataset, &Config::default())
    }

    /// Points describing the outer boundary of this element
    ///
    /// - a point yields itself
    /// - a path yields its resolvable points in order
    /// - a multipolygon composite yields its outer rings, stitched together
    ///   from the outer path members; any other composite yields nothing
    ///
    /// Ring assembly is greedy and has no defined ring order. Self-intersecting
    /// or disconnected input produces open or merged rings rather than an error.
    pub fn outer_path_with(&self, dataset: &'a DataSet, config: &Config) -> Vec<&'a Point> {
        match self {
            ElementRef::Point(point) => vec![*point],
            ElementRef::Path(path) => {
                let mut points = Vec::with_capacity(path.points.len());
                append_points(dataset, &mut points, path.points.iter().copied());
                points
            }
            ElementRef::Composite(composite) => {
                let is_multipolygon = dataset
                    .tag_key(&config.type_key)
                    .and_then(|key| self.tag_value(key))
                    .is_some_and(|value| value == config.multipolygon_type);
                if !is_multipolygon {
                    return Vec::new();
                }
                assemble_rings(dataset, composite, &config.outer_role)
            }
        }
    }

    /// Outer path as a `geo` line string in degrees (x = longitude)
    pub fn outer_line_string(&self, dataset: &'a DataSet) -> LineString<f64> {
        let coords: Vec<Coord<f64>> = self
            .outer_path(dataset)
            .iter()
            .filter_map(|point| point.coordinate.to_geo())
            .collect();
        LineString::from(coords)
    }
}

/// Resolve `ids` against the dataset, skipping ids that do not exist
fn append_points<'a>(
    dataset: &'a DataSet,
    points: &mut Vec<&'a Point>,
    ids: impl Iterator<Item = Id>,
) {
    points.extend(ids.filter_map(|id| dataset.point(id)));
}

/// Greedily stitch the outer path members of `composite` into rings
fn assemble_rings<'a>(dataset: &'a DataSet, composite: &Composite, outer_role: &str) -> Vec<&'a Point> {
    #[cfg(feature = "profiling")]
    profiling::scope!("element::assemble_rings");

    let mut pool: Vec<&'a Path> = composite
        .members
        .iter()
        .filter(|member| member.kind == Kind::Path && member.role == outer_role)
        .filter_map(|member| dataset.path(member.id))
        .filter(|path| !path.points.is_empty())
        .collect();

    let mut points = Vec::new();
    while !pool.is_empty() {
        let first = pool.remove(0);
        append_points(dataset, &mut points, first.points.iter().copied());

        let start = first.points[0];
        let mut last = first.points[first.points.len() - 1];
        while last != start {
            match splice_next_fragment(dataset, &mut points, last, &mut pool) {
                Some(next) => last = next,
                None => {
                    tracing::debug!(
                        composite = composite.id,
                        open_at = last,
                        "Outer ring could not be closed"
                    );
                    break;
                }
            }
        }
    }
    points
}

/// Find a fragment continuing at `last`, append it and return its new end
///
/// The shared junction point is not repeated. Fragments matching at their tail
/// are appended in reverse.
fn splice_next_fragment<'a>(
    dataset: &'a DataSet,
    points: &mut Vec<&'a Point>,
    last: Id,
    pool: &mut Vec<&'a Path>,
) -> Option<Id> {
    let index = pool.iter().position(|path| {
        path.points.first() == Some(&last) || path.points.last() == Some(&last)
    })?;
    let path = pool.remove(index);
    let ids = &path.points;
    if ids[0] == last {
        append_points(dataset, points, ids[1..].iter().copied());
        Some(ids[ids.len() - 1])
    } else {
        append_points(dataset, points, ids[..ids.len() - 1].iter().rev().copied());
        Some(ids[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four corner points (ids 1-4) and loose path fragments around them
    fn create_test_dataset() -> DataSet {
        let mut dataset = DataSet::new();
        let name = dataset.intern("name");
        for (id, lat, lon) in [(1, 0.0, 0.0), (2, 0.0, 1.0), (3, 1.0, 1.0), (4, 1.0, 0.0)] {
            dataset.add_point(Point {
                id,
                coordinate: Coordinate::new(lat, lon),
                tags: vec![Tag::new(name, format!("corner {id}"))],
            });
        }
        for (id, points) in [
            (100, vec![1, 2, 3]),
            (101, vec![3, 4, 1]),
            (102, vec![1, 4, 3]),
            (103, vec![99, 2, 98]),
        ] {
            dataset.add_path(Path {
                id,
                points,
                ..Default::default()
            });
        }
        dataset.recompute_bounding_boxes();
        dataset
    }

    fn multipolygon(dataset: &mut DataSet, id: Id, outer: &[Id]) {
        let type_key = dataset.intern("type");
        dataset.add_composite(Composite {
            id,
            members: outer
                .iter()
                .map(|&way| Member::new(Kind::Path, way, "outer"))
                .collect(),
            tags: vec![Tag::new(type_key, "multipolygon")],
            ..Default::default()
        });
    }

    fn ids(points: &[&Point]) -> Vec<Id> {
        points.iter().map(|point| point.id).collect()
    }

    #[test]
    fn test_point_accessors() {
        let dataset = create_test_dataset();
        let elem = ElementRef::from(dataset.point(3).unwrap());
        assert_eq!(elem.kind(), Kind::Point);
        assert_eq!(elem.id(), 3);
        assert_eq!(elem.center(), Coordinate::new(1.0, 1.0));
        assert_eq!(elem.tag_value_by_name(&dataset, "name"), Some("corner 3"));
        assert_eq!(elem.tag_value_by_name(&dataset, "level"), None);
        assert_eq!(ids(&elem.outer_path(&dataset)), vec![3]);
    }

    #[test]
    fn test_path_outer_path_keeps_order_and_drops_unresolved() {
        let dataset = create_test_dataset();
        let elem = ElementRef::from(dataset.path(103).unwrap());
        assert_eq!(ids(&elem.outer_path(&dataset)), vec![2]);

        let elem = ElementRef::from(dataset.path(100).unwrap());
        assert_eq!(ids(&elem.outer_path(&dataset)), vec![1, 2, 3]);
        assert_eq!(elem.center(), Coordinate::new(0.5, 0.5));
    }

    #[test]
    fn test_multipolygon_stitches_ring() {
        let mut dataset = create_test_dataset();
        multipolygon(&mut dataset, 500, &[100, 101]);
        let elem = ElementRef::from(dataset.composite(500).unwrap());
        assert_eq!(ids(&elem.outer_path(&dataset)), vec![1, 2, 3, 4, 1]);
    }

    #[test]
    fn test_multipolygon_reverses_backward_fragment() {
        let mut dataset = create_test_dataset();
        multipolygon(&mut dataset, 501, &[100, 102]);
        let elem = ElementRef::from(dataset.composite(501).unwrap());
        assert_eq!(ids(&elem.outer_path(&dataset)), vec![1, 2, 3, 4, 1]);
    }

    #[test]
    fn test_multipolygon_with_two_rings_ignores_inner() {
        let mut dataset = create_test_dataset();
        for (id, lat, lon) in [(5, 2.0, 2.0), (6, 2.0, 3.0), (7, 3.0, 3.0)] {
            dataset.add_point(Point {
                id,
                coordinate: Coordinate::new(lat, lon),
                tags: Vec::new(),
            });
        }
        for (id, points) in [(200, vec![5, 6, 7]), (201, vec![7, 5])] {
            dataset.add_path(Path {
                id,
                points,
                ..Default::default()
            });
        }
        let type_key = dataset.intern("type");
        dataset.add_composite(Composite {
            id: 503,
            members: vec![
                Member::new(Kind::Path, 100, "outer"),
                Member::new(Kind::Path, 102, "inner"),
                Member::new(Kind::Path, 200, "outer"),
                Member::new(Kind::Path, 101, "outer"),
                Member::new(Kind::Path, 201, "outer"),
            ],
            tags: vec![Tag::new(type_key, "multipolygon")],
            ..Default::default()
        });

        let elem = ElementRef::from(dataset.composite(503).unwrap());
        assert_eq!(
            ids(&elem.outer_path(&dataset)),
            vec![1, 2, 3, 4, 1, 5, 6, 7, 5]
        );
    }

    #[test]
    fn test_multipolygon_skips_missing_members() {
        let mut dataset = create_test_dataset();
        multipolygon(&mut dataset, 502, &[100, 7777]);
        let elem = ElementRef::from(dataset.composite(502).unwrap());
        // The ring stays open, but assembly still returns what it has
        assert_eq!(ids(&elem.outer_path(&dataset)), vec![1, 2, 3]);
    }

    #[test]
    fn test_non_multipolygon_composite_has_no_outer_path() {
        let mut dataset = create_test_dataset();
        let type_key = dataset.intern("type");
        dataset.add_composite(Composite {
            id: 600,
            members: vec![Member::new(Kind::Path, 100, "outer")],
            tags: vec![Tag::new(type_key, "route")],
            ..Default::default()
        });
        let elem = ElementRef::from(dataset.composite(600).unwrap());
        assert!(elem.outer_path(&dataset).is_empty());
    }

    #[test]
    fn test_outer_line_string() {
        let mut dataset = create_test_dataset();
        multipolygon(&mut dataset, 500, &[100, 101]);
        let elem = ElementRef::from(dataset.composite(500).unwrap());
        let line = elem.outer_line_string(&dataset);
        assert_eq!(line.0.len(), 5);
        assert!(line.is_closed());
    }

    #[test]
    fn test_path_is_closed() {
        let dataset = create_test_dataset();
        assert!(!dataset.path(100).unwrap().is_closed());
        let ring = Path {
            id: 1,
            points: vec![1, 2, 3, 1],
            ..Default::default()
        };
        assert!(ring.is_closed());
    }
}
