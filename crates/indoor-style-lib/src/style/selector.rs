//! Selectors: which elements, at which zoom levels, a rule applies to
//!
//! - [`BasicSelector`]: object type, zoom range, conditions, class and layer
//! - [`ChainedSelector`]: all basic selectors must match the same state
//! - [`UnionSelector`]: any of its selectors matches (`a, b { ... }`)

use super::condition::Condition;
use super::state::{Overlay, State};
use crate::DataSet;
use crate::element::ElementRef;
use smallvec::SmallVec;
use std::fmt;

/// Layers a matching rule writes to; `None` is the default layer
pub(crate) type LayerList<'s> = SmallVec<[Option<&'s str>; 2]>;

/// Object type filter of a selector, and classification of an evaluation state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Point,
    Path,
    Composite,
    /// Closed path or multipolygon
    Area,
    /// Open path, or closed path tagged as not being an area
    Line,
    Canvas,
    #[default]
    Any,
}

impl ObjectType {
    /// Parse a MapCSS type selector
    pub fn from_name(name: &str) -> Option<ObjectType> {
        match name {
            "node" => Some(ObjectType::Point),
            "way" => Some(ObjectType::Path),
            "relation" => Some(ObjectType::Composite),
            "area" => Some(ObjectType::Area),
            "line" => Some(ObjectType::Line),
            "canvas" => Some(ObjectType::Canvas),
            "*" => Some(ObjectType::Any),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::Point => "node",
            ObjectType::Path => "way",
            ObjectType::Composite => "relation",
            ObjectType::Area => "area",
            ObjectType::Line => "line",
            ObjectType::Canvas => "canvas",
            ObjectType::Any => "*",
        }
    }
}

/// A selector without sub-selectors
#[derive(Clone, Debug, PartialEq)]
pub struct BasicSelector {
    object_type: ObjectType,
    zoom_low: u32,
    zoom_high: u32,
    conditions: Vec<Condition>,
    class: Option<String>,
    layer: Option<String>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl BasicSelector {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            zoom_low: 0,
            zoom_high: 0,
            conditions: Vec::new(),
            class: None,
            layer: None,
        }
    }

    /// Restrict to `low <= zoom < high`; a bound of 0 leaves that side open
    pub fn with_zoom(mut self, low: u32, high: u32) -> Self {
        self.zoom_low = low;
        self.zoom_high = high;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Require a class set by an earlier rule of the same evaluation
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Route the declarations of matching rules to a named layer
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn zoom_range(&self) -> (u32, u32) {
        (self.zoom_low, self.zoom_high)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    pub fn compile(&mut self, dataset: &DataSet) {
        for condition in &mut self.conditions {
            condition.compile(dataset);
        }
    }

    pub fn matches(&self, state: &State<'_>) -> bool {
        self.matches_with(state, &Overlay::default())
    }

    /// Canvas selectors only; the canvas has no tags, so conditions see nothing
    pub fn matches_canvas(&self, state: &State<'_>) -> bool {
        if self.object_type != ObjectType::Canvas || !self.matches_zoom(state.zoom_level) {
            return false;
        }
        let canvas = State::canvas(state.zoom_level);
        let overlay = Overlay::default();
        self.class.is_none()
            && self
                .conditions
                .iter()
                .all(|condition| condition.matches_with(&canvas, &overlay))
    }

    pub(crate) fn matches_with(&self, state: &State<'_>, overlay: &Overlay<'_>) -> bool {
        if !self.matches_object_type(state) || !self.matches_zoom(state.zoom_level) {
            return false;
        }
        if let Some(class) = &self.class {
            if !overlay.has_class(class) {
                return false;
            }
        }
        self.conditions
            .iter()
            .all(|condition| condition.matches_with(state, overlay))
    }

    fn matches_object_type(&self, state: &State<'_>) -> bool {
        match self.object_type {
            ObjectType::Any => state.object_type != ObjectType::Canvas && state.element.is_some(),
            ObjectType::Point => matches!(state.element, Some(ElementRef::Point(_))),
            ObjectType::Path => matches!(state.element, Some(ElementRef::Path(_))),
            ObjectType::Composite => matches!(state.element, Some(ElementRef::Composite(_))),
            ObjectType::Area => state.element.is_some() && state.object_type == ObjectType::Area,
            ObjectType::Line => state.element.is_some() && state.object_type == ObjectType::Line,
            ObjectType::Canvas => false,
        }
    }

    #[inline]
    fn matches_zoom(&self, zoom: f64) -> bool {
        (self.zoom_low == 0 || zoom >= self.zoom_low as f64)
            && (self.zoom_high == 0 || zoom < self.zoom_high as f64)
    }

    fn unresolved_conditions<'s>(&'s self, out: &mut Vec<&'s str>) {
        out.extend(
            self.conditions
                .iter()
                .filter(|condition| condition.key().is_none())
                .map(|condition| condition.key_name()),
        );
    }
}

impl fmt::Display for BasicSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.object_type.name())?;
        match (self.zoom_low, self.zoom_high) {
            (0, 0) => {}
            (low, 0) => write!(f, "|z{low}-")?,
            (0, high) => write!(f, "|z-{high}")?,
            (low, high) => write!(f, "|z{low}-{high}")?,
        }
        for condition in &self.conditions {
            write!(f, "{condition}")?;
        }
        if let Some(class) = &self.class {
            write!(f, ".{class}")?;
        }
        if let Some(layer) = &self.layer {
            write!(f, "::{layer}")?;
        }
        Ok(())
    }
}

/// Basic selectors that must all match the same element
///
/// Expresses compound attribute groups, not ancestor relations; there is no
/// element hierarchy. Declarations go to the layer of the last selector.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainedSelector {
    selectors: Vec<BasicSelector>,
}

impl ChainedSelector {
    pub fn new(selectors: Vec<BasicSelector>) -> Self {
        Self { selectors }
    }

    pub fn selectors(&self) -> &[BasicSelector] {
        &self.selectors
    }

    pub fn layer(&self) -> Option<&str> {
        self.selectors.last().and_then(|selector| selector.layer())
    }

    pub fn compile(&mut self, dataset: &DataSet) {
        for selector in &mut self.selectors {
            selector.compile(dataset);
        }
    }

    /// True when every selector of the chain matches; an empty chain matches
    pub fn matches(&self, state: &State<'_>) -> bool {
        let overlay = Overlay::default();
        self.selectors
            .iter()
            .all(|selector| selector.matches_with(state, &overlay))
    }
}

impl fmt::Display for ChainedSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}

/// Alternative selectors of one rule
#[derive(Clone, Debug, PartialEq)]
pub struct UnionSelector {
    selectors: Vec<Selector>,
}

impl UnionSelector {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self { selectors }
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn compile(&mut self, dataset: &DataSet) {
        for selector in &mut self.selectors {
            selector.compile(dataset);
        }
    }

    pub fn matches(&self, state: &State<'_>) -> bool {
        self.selectors.iter().any(|selector| selector.matches(state))
    }
}

impl fmt::Display for UnionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}

/// Any selector of a rule
#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    Basic(BasicSelector),
    Chained(ChainedSelector),
    Union(UnionSelector),
}

impl From<BasicSelector> for Selector {
    fn from(selector: BasicSelector) -> Self {
        Selector::Basic(selector)
    }
}

impl From<ChainedSelector> for Selector {
    fn from(selector: ChainedSelector) -> Self {
        Selector::Chained(selector)
    }
}

impl From<UnionSelector> for Selector {
    fn from(selector: UnionSelector) -> Self {
        Selector::Union(selector)
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Selector {
    /// Resolve every condition's tag name against `dataset`
    pub fn compile(&mut self, dataset: &DataSet) {
        match self {
            Selector::Basic(selector) => selector.compile(dataset),
            Selector::Chained(chain) => chain.compile(dataset),
            Selector::Union(union) => union.compile(dataset),
        }
    }

    pub fn matches(&self, state: &State<'_>) -> bool {
        let overlay = Overlay::default();
        self.matches_by(&|selector| selector.matches_with(state, &overlay))
    }

    pub fn matches_canvas(&self, state: &State<'_>) -> bool {
        self.matches_by(&|selector| selector.matches_canvas(state))
    }

    /// Tag names that did not resolve in the last compile
    pub fn unresolved_conditions(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_unresolved(&mut out);
        out
    }

    /// Push the layers of all matching sub-selectors, without duplicates
    pub(crate) fn collect_layers<'s>(
        &'s self,
        test: &dyn Fn(&BasicSelector) -> bool,
        out: &mut LayerList<'s>,
    ) {
        let layer = match self {
            Selector::Basic(selector) => {
                if !test(selector) {
                    return;
                }
                selector.layer()
            }
            Selector::Chained(chain) => {
                if !chain.selectors.iter().all(test) {
                    return;
                }
                chain.layer()
            }
            Selector::Union(union) => {
                for selector in &union.selectors {
                    selector.collect_layers(test, out);
                }
                return;
            }
        };
        if !out.contains(&layer) {
            out.push(layer);
        }
    }

    fn matches_by(&self, test: &dyn Fn(&BasicSelector) -> bool) -> bool {
        match self {
            Selector::Basic(selector) => test(selector),
            Selector::Chained(chain) => chain.selectors.iter().all(test),
            Selector::Union(union) => union.selectors.iter().any(|s| s.matches_by(test)),
        }
    }

    fn collect_unresolved<'s>(&'s self, out: &mut Vec<&'s str>) {
        match self {
            Selector::Basic(selector) => selector.unresolved_conditions(out),
            Selector::Chained(chain) => {
                for selector in &chain.selectors {
                    selector.unresolved_conditions(out);
                }
            }
            Selector::Union(union) => {
                for selector in &union.selectors {
                    selector.collect_unresolved(out);
                }
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Basic(selector) => write!(f, "{selector}"),
            Selector::Chained(chain) => write!(f, "{chain}"),
            Selector::Union(union) => write!(f, "{union}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Path, Point};
    use crate::tag::Tag;
    use crate::{Coordinate, Declaration};

    fn create_test_dataset() -> DataSet {
        let mut dataset = DataSet::new();
        let indoor = dataset.intern("indoor");
        let door = dataset.intern("door");
        for id in 1..=3 {
            dataset.add_point(Point {
                id,
                coordinate: Coordinate::new(id as f64 * 0.001, 0.0),
                tags: vec![Tag::new(door, "hinged")],
            });
        }
        dataset.add_path(Path {
            id: 10,
            points: vec![1, 2, 3, 1],
            tags: vec![Tag::new(indoor, "room")],
            ..Default::default()
        });
        dataset
    }

    fn state_for(dataset: &DataSet, object_type: ObjectType) -> State<'_> {
        let element = match object_type {
            ObjectType::Point => ElementRef::from(dataset.point(1).unwrap()),
            _ => ElementRef::from(dataset.path(10).unwrap()),
        };
        State {
            object_type,
            ..State::new(element)
        }
    }

    fn compiled(selector: impl Into<Selector>, dataset: &DataSet) -> Selector {
        let mut selector = selector.into();
        selector.compile(dataset);
        selector
    }

    #[test]
    fn test_zoom_range() {
        let dataset = create_test_dataset();
        let at = |zoom: f64| state_for(&dataset, ObjectType::Area).with_zoom(zoom);

        let open = BasicSelector::new(ObjectType::Any);
        assert!(open.matches(&at(0.0)));
        assert!(open.matches(&at(25.0)));

        let bounded = BasicSelector::new(ObjectType::Any).with_zoom(10, 15);
        assert!(!bounded.matches(&at(9.9)));
        assert!(bounded.matches(&at(10.0)));
        assert!(bounded.matches(&at(14.9)));
        assert!(!bounded.matches(&at(15.0)));

        let from = BasicSelector::new(ObjectType::Any).with_zoom(17, 0);
        assert!(!from.matches(&at(16.0)));
        assert!(from.matches(&at(21.0)));
    }

    #[test]
    fn test_object_type_filter() {
        let dataset = create_test_dataset();
        let area = state_for(&dataset, ObjectType::Area);
        let point = state_for(&dataset, ObjectType::Point);

        assert!(BasicSelector::new(ObjectType::Path).matches(&area));
        assert!(BasicSelector::new(ObjectType::Area).matches(&area));
        assert!(!BasicSelector::new(ObjectType::Line).matches(&area));
        assert!(!BasicSelector::new(ObjectType::Point).matches(&area));
        assert!(BasicSelector::new(ObjectType::Point).matches(&point));
        assert!(!BasicSelector::new(ObjectType::Composite).matches(&point));
        assert!(!BasicSelector::new(ObjectType::Canvas).matches(&point));
    }

    #[test]
    fn test_conditions_are_conjunctive() {
        let dataset = create_test_dataset();
        let state = state_for(&dataset, ObjectType::Area);
        let both = compiled(
            BasicSelector::new(ObjectType::Path)
                .with_condition(Condition::present("indoor"))
                .with_condition(Condition::equals("indoor", "room")),
            &dataset,
        );
        assert!(both.matches(&state));
        let mixed = compiled(
            BasicSelector::new(ObjectType::Path)
                .with_condition(Condition::present("indoor"))
                .with_condition(Condition::present("door")),
            &dataset,
        );
        assert!(!mixed.matches(&state));
    }

    #[test]
    fn test_chained_requires_all() {
        let dataset = create_test_dataset();
        let state = state_for(&dataset, ObjectType::Area);
        let chain = compiled(
            ChainedSelector::new(vec![
                BasicSelector::new(ObjectType::Path),
                BasicSelector::new(ObjectType::Any).with_condition(Condition::present("indoor")),
            ]),
            &dataset,
        );
        assert!(chain.matches(&state));

        let chain = compiled(
            ChainedSelector::new(vec![
                BasicSelector::new(ObjectType::Path),
                BasicSelector::new(ObjectType::Line),
            ]),
            &dataset,
        );
        assert!(!chain.matches(&state));
    }

    #[test]
    fn test_union_requires_any() {
        let dataset = create_test_dataset();
        let point = state_for(&dataset, ObjectType::Point);
        let area = state_for(&dataset, ObjectType::Area);
        let union = compiled(
            UnionSelector::new(vec![
                BasicSelector::new(ObjectType::Point).into(),
                BasicSelector::new(ObjectType::Line).into(),
            ]),
            &dataset,
        );
        assert!(union.matches(&point));
        assert!(!union.matches(&area));
    }

    #[test]
    fn test_chain_and_union_compile_directly() {
        let dataset = create_test_dataset();
        let area = state_for(&dataset, ObjectType::Area);
        let point = state_for(&dataset, ObjectType::Point);

        let mut chain = ChainedSelector::new(vec![
            BasicSelector::new(ObjectType::Path),
            BasicSelector::new(ObjectType::Any).with_condition(Condition::equals("indoor", "room")),
        ]);
        assert!(!chain.matches(&area));
        chain.compile(&dataset);
        assert!(chain.matches(&area));
        assert!(!chain.matches(&point));

        let mut union = UnionSelector::new(vec![
            BasicSelector::new(ObjectType::Line).into(),
            BasicSelector::new(ObjectType::Point)
                .with_condition(Condition::present("door"))
                .into(),
        ]);
        assert!(!union.matches(&point));
        union.compile(&dataset);
        assert!(union.matches(&point));
        assert!(!union.matches(&area));
    }

    #[test]
    fn test_class_needs_overlay() {
        let dataset = create_test_dataset();
        let state = state_for(&dataset, ObjectType::Area);
        let selector = BasicSelector::new(ObjectType::Area).with_class("highlight");
        assert!(!selector.matches(&state));

        let declaration = Declaration::class("highlight");
        let mut overlay = Overlay::default();
        overlay.apply(&declaration);
        assert!(selector.matches_with(&state, &overlay));
    }

    #[test]
    fn test_canvas_matching() {
        let canvas = BasicSelector::new(ObjectType::Canvas).with_zoom(10, 0);
        assert!(canvas.matches_canvas(&State::canvas(12.0)));
        assert!(!canvas.matches_canvas(&State::canvas(8.0)));
        assert!(!canvas.matches(&State::canvas(12.0)));
        assert!(!BasicSelector::new(ObjectType::Any).matches_canvas(&State::canvas(12.0)));
        assert!(!BasicSelector::new(ObjectType::Any).matches(&State::canvas(12.0)));
    }

    #[test]
    fn test_collect_layers_deduplicates() {
        let dataset = create_test_dataset();
        let state = state_for(&dataset, ObjectType::Area);
        let union = compiled(
            UnionSelector::new(vec![
                BasicSelector::new(ObjectType::Area).into(),
                BasicSelector::new(ObjectType::Path).into(),
                BasicSelector::new(ObjectType::Path).with_layer("link_forward").into(),
                BasicSelector::new(ObjectType::Point).with_layer("ignored").into(),
            ]),
            &dataset,
        );
        let overlay = Overlay::default();
        let mut layers = LayerList::new();
        union.collect_layers(&|s| s.matches_with(&state, &overlay), &mut layers);
        assert_eq!(layers.as_slice(), &[None, Some("link_forward")]);
    }

    #[test]
    fn test_unresolved_conditions() {
        let dataset = create_test_dataset();
        let selector = compiled(
            BasicSelector::new(ObjectType::Any)
                .with_condition(Condition::present("indoor"))
                .with_condition(Condition::present("shop")),
            &dataset,
        );
        assert_eq!(selector.unresolved_conditions(), vec!["shop"]);
    }

    #[test]
    fn test_display() {
        let selector = BasicSelector::new(ObjectType::Path)
            .with_zoom(10, 15)
            .with_condition(Condition::equals("key", "value"))
            .with_class("class")
            .with_layer("layer");
        assert_eq!(selector.to_string(), "way|z10-15[key=value].class::layer");

        let union = UnionSelector::new(vec![
            BasicSelector::new(ObjectType::Point).with_zoom(17, 0).into(),
            ChainedSelector::new(vec![
                BasicSelector::new(ObjectType::Area),
                BasicSelector::new(ObjectType::Any).with_condition(Condition::present("indoor")),
            ])
            .into(),
        ]);
        assert_eq!(union.to_string(), "node|z17-, area *[indoor]");
    }
}
