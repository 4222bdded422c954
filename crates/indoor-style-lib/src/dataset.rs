//! DataSet - sorted record storage and the loader boundary
//!
//! The three record collections are kept sorted ascending by id so every
//! cross reference (path to point, composite to member) resolves by binary
//! search. Loaders are responsible for that order; the population helpers here
//! preserve it, and [`DataSet::validate`] checks it.

use crate::coordinate::BoundingBox;
use crate::element::{Composite, ElementRef, Id, Kind, Path, Point};
use crate::tag::{TagInterner, TagKey};
use crate::{DataError, Result};
use std::collections::HashSet;
use std::io::Read;
use std::ops::BitOr;

/// Selects which record kinds [`DataSet::elements`] yields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementFilter(u8);

impl ElementFilter {
    pub const COMPOSITES: ElementFilter = ElementFilter(1);
    pub const PATHS: ElementFilter = ElementFilter(2);
    pub const POINTS: ElementFilter = ElementFilter(4);
    pub const ALL: ElementFilter = ElementFilter(1 | 2 | 4);

    #[inline]
    pub fn contains(&self, other: ElementFilter) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ElementFilter {
    type Output = ElementFilter;

    fn bitor(self, rhs: Self) -> Self::Output {
        ElementFilter(self.0 | rhs.0)
    }
}

impl Default for ElementFilter {
    fn default() -> Self {
        Self::ALL
    }
}

/// A set of points, paths and composites sharing one tag interner
///
/// Records are treated as immutable while a style is compiled against or
/// evaluated on this dataset. Direct mutation of the public collections is
/// allowed, but the ascending id order has to be restored before the next
/// lookup, otherwise lookups silently miss.
#[derive(Debug, Default)]
pub struct DataSet {
    pub points: Vec<Point>,
    pub paths: Vec<Path>,
    pub composites: Vec<Composite>,
    interner: TagInterner,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for a tag name, creating it if needed (loader side)
    #[inline]
    pub fn intern(&mut self, name: &str) -> TagKey {
        self.interner.intern(name)
    }

    /// Key for a tag name if any record of this dataset can carry it
    #[inline]
    pub fn tag_key(&self, name: &str) -> Option<TagKey> {
        self.interner.get(name)
    }

    /// Name behind a key of this dataset
    #[inline]
    pub fn tag_name(&self, key: TagKey) -> Option<&str> {
        self.interner.name(key)
    }

    #[inline]
    pub fn interner(&self) -> &TagInterner {
        &self.interner
    }

    /// Generation shared by all keys of this dataset
    #[inline]
    pub fn generation(&self) -> u32 {
        self.interner.generation()
    }

    #[inline]
    pub fn point(&self, id: Id) -> Option<&Point> {
        find(&self.points, id, |point| point.id)
    }

    #[inline]
    pub fn path(&self, id: Id) -> Option<&Path> {
        find(&self.paths, id, |path| path.id)
    }

    #[inline]
    pub fn composite(&self, id: Id) -> Option<&Composite> {
        find(&self.composites, id, |composite| composite.id)
    }

    /// Look up any record by kind and id
    pub fn element(&self, kind: Kind, id: Id) -> Option<ElementRef<'_>> {
        match kind {
            Kind::Point => self.point(id).map(ElementRef::Point),
            Kind::Path => self.path(id).map(ElementRef::Path),
            Kind::Composite => self.composite(id).map(ElementRef::Composite),
        }
    }

    /// Insert a point, replacing an existing point with the same id
    pub fn add_point(&mut self, point: Point) {
        insert_sorted(&mut self.points, point, |point| point.id);
    }

    /// Insert a path, replacing an existing path with the same id
    pub fn add_path(&mut self, path: Path) {
        insert_sorted(&mut self.paths, path, |path| path.id);
    }

    /// Insert a composite, replacing an existing composite with the same id
    pub fn add_composite(&mut self, composite: Composite) {
        insert_sorted(&mut self.composites, composite, |composite| composite.id);
    }

    /// Merge everything collected in `buffer` in one pass per collection
    ///
    /// Records in the buffer replace records with the same id.
    pub fn merge(&mut self, buffer: MergeBuffer) {
        let MergeBuffer {
            points,
            paths,
            composites,
        } = buffer;
        merge_sorted(&mut self.points, points, |point| point.id);
        merge_sorted(&mut self.paths, paths, |path| path.id);
        merge_sorted(&mut self.composites, composites, |composite| composite.id);
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.points.len() + self.paths.len() + self.composites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over records: composites first, then paths, then points
    pub fn elements(&self, filter: ElementFilter) -> impl Iterator<Item = ElementRef<'_>> + '_ {
        let composites: &[Composite] = if filter.contains(ElementFilter::COMPOSITES) {
            &self.composites[..]
        } else {
            &[]
        };
        let paths: &[Path] = if filter.contains(ElementFilter::PATHS) {
            &self.paths[..]
        } else {
            &[]
        };
        let points: &[Point] = if filter.contains(ElementFilter::POINTS) {
            &self.points[..]
        } else {
            &[]
        };
        composites
            .iter()
            .map(ElementRef::Composite)
            .chain(paths.iter().map(ElementRef::Path))
            .chain(points.iter().map(ElementRef::Point))
    }

    /// Resolved members of `composite`, skipping members not in this dataset
    pub fn members<'a>(
        &'a self,
        composite: &'a Composite,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        composite
            .members
            .iter()
            .filter_map(move |member| self.element(member.kind, member.id))
    }

    /// Union of all point coordinates
    pub fn bounding_box(&self) -> BoundingBox {
        self.points.iter().fold(BoundingBox::default(), |bbox, point| {
            bbox.unite(BoundingBox::from_coordinate(point.coordinate))
        })
    }

    /// Recompute the cached bounding boxes of all paths and composites
    ///
    /// Needed when the loader's boxes cannot be trusted. Composite boxes are
    /// the union of their resolvable members, nested composites included.
    pub fn recompute_bounding_boxes(&mut self) {
        let path_boxes: Vec<BoundingBox> = self
            .paths
            .iter()
            .map(|path| path.compute_bounding_box(self))
            .collect();
        for (path, bbox) in self.paths.iter_mut().zip(path_boxes) {
            path.bbox = bbox;
        }

        let mut visiting = HashSet::new();
        let composite_boxes: Vec<BoundingBox> = self
            .composites
            .iter()
            .map(|composite| self.composite_bounding_box(composite, &mut visiting))
            .collect();
        for (composite, bbox) in self.composites.iter_mut().zip(composite_boxes) {
            composite.bbox = bbox;
        }
    }

    fn composite_bounding_box(&self, composite: &Composite, visiting: &mut HashSet<Id>) -> BoundingBox {
        if !visiting.insert(composite.id) {
            tracing::warn!(composite = composite.id, "Composite membership cycle, ignoring");
            return BoundingBox::default();
        }
        let mut bbox = BoundingBox::default();
        for member in self.members(composite) {
            let member_bbox = match member {
                ElementRef::Composite(nested) => self.composite_bounding_box(nested, visiting),
                other => other.bounding_box(),
            };
            bbox = bbox.unite(member_bbox);
        }
        visiting.remove(&composite.id);
        bbox
    }

    /// Check that every collection is strictly ascending by id
    pub fn validate(&self) -> Result<()> {
        check_sorted(&self.points, Kind::Point, |point| point.id)?;
        check_sorted(&self.paths, Kind::Path, |path| path.id)?;
        check_sorted(&self.composites, Kind::Composite, |composite| composite.id)?;
        Ok(())
    }
}

/// Records collected by a reader before they are merged into a [`DataSet`]
#[derive(Debug, Default)]
pub struct MergeBuffer {
    pub points: Vec<Point>,
    pub paths: Vec<Path>,
    pub composites: Vec<Composite>,
}

impl MergeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.paths.is_empty() && self.composites.is_empty()
    }
}

/// Destination a [`Reader`] writes records into
///
/// Tag keys are always interned in the dataset, even when records are routed
/// to a merge buffer, so buffered records stay tied to that dataset.
pub struct ReaderSink<'a> {
    dataset: &'a mut DataSet,
    buffer: Option<&'a mut MergeBuffer>,
}

impl<'a> ReaderSink<'a> {
    pub fn new(dataset: &'a mut DataSet) -> Self {
        Self {
            dataset,
            buffer: None,
        }
    }

    /// Route records into `buffer` instead of the dataset
    pub fn with_merge_buffer(mut self, buffer: &'a mut MergeBuffer) -> Self {
        self.buffer = Some(buffer);
        self
    }

    #[inline]
    pub fn intern(&mut self, name: &str) -> TagKey {
        self.dataset.intern(name)
    }

    pub fn add_point(&mut self, point: Point) {
        match self.buffer.as_deref_mut() {
            Some(buffer) => buffer.points.push(point),
            None => self.dataset.add_point(point),
        }
    }

    pub fn add_path(&mut self, path: Path) {
        match self.buffer.as_deref_mut() {
            Some(buffer) => buffer.paths.push(path),
            None => self.dataset.add_path(path),
        }
    }

    pub fn add_composite(&mut self, composite: Composite) {
        match self.buffer.as_deref_mut() {
            Some(buffer) => buffer.composites.push(composite),
            None => self.dataset.add_composite(composite),
        }
    }
}

/// A file format reader populating a dataset
pub trait Reader {
    fn read(&mut self, input: &mut dyn Read, sink: &mut ReaderSink<'_>) -> Result<()>;
}

#[inline]
fn find<T>(items: &[T], id: Id, key: impl Fn(&T) -> Id) -> Option<&T> {
    items
        .binary_search_by_key(&id, key)
        .ok()
        .map(|index| &items[index])
}

fn insert_sorted<T>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> Id) {
    match items.binary_search_by_key(&key(&item), &key) {
        Ok(index) => items[index] = item,
        Err(index) => items.insert(index, item),
    }
}

/// Merge `incoming` into the sorted `items`; incoming records win on equal ids
fn merge_sorted<T>(items: &mut Vec<T>, mut incoming: Vec<T>, key: impl Fn(&T) -> Id) {
    if incoming.is_empty() {
        return;
    }
    // Stable sort, so the last occurrence of a duplicate id is the one kept
    incoming.sort_by_key(&key);
    incoming.reverse();
    incoming.dedup_by_key(|item| key(item));
    incoming.reverse();

    let existing = std::mem::take(items);
    items.reserve(existing.len() + incoming.len());
    let mut existing = existing.into_iter().peekable();
    let mut incoming = incoming.into_iter().peekable();
    loop {
        let next = match (existing.peek(), incoming.peek()) {
            (Some(a), Some(b)) => match key(a).cmp(&key(b)) {
                std::cmp::Ordering::Less => existing.next(),
                std::cmp::Ordering::Greater => incoming.next(),
                std::cmp::Ordering::Equal => {
                    existing.next();
                    incoming.next()
                }
            },
            (Some(_), None) => existing.next(),
            (None, Some(_)) => incoming.next(),
            (None, None) => break,
        };
        items.extend(next);
    }
}

fn check_sorted<T>(items: &[T], kind: Kind, key: impl Fn(&T) -> Id) -> Result<()> {
    for (index, pair) in items.windows(2).enumerate() {
        let (prev, next) = (key(&pair[0]), key(&pair[1]));
        if prev == next {
            tracing::warn!(kind = kind.as_str(), id = next, "Duplicate id in dataset");
            return Err(DataError::DuplicateId { kind, id: next });
        }
        if prev > next {
            tracing::warn!(kind = kind.as_str(), index = index + 1, "Dataset is not sorted by id");
            return Err(DataError::UnsortedIds {
                kind,
                index: index + 1,
            });
        }
    }
    Ok(())
}
