//! Single tag tests: `[key]`, `[key=value]`, `[key!=value]`

use super::state::{Overlay, State};
use crate::DataSet;
use crate::tag::TagKey;
use std::fmt;

/// Comparison applied by a [`Condition`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionOp {
    /// Tag exists with a non-empty value
    Present,
    Equals,
    NotEquals,
}

/// Test on one tag of the element being evaluated
///
/// The tag is looked up in the tags set by earlier declarations of the same
/// evaluation first, then on the element itself, then in the state's
/// [`TagCache`](super::TagCache). A tag found nowhere compares as the empty string.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    key_name: String,
    key: Option<TagKey>,
    op: ConditionOp,
    value: String,
}

impl Condition {
    pub fn present(key: impl Into<String>) -> Self {
        Self::new(key.into(), ConditionOp::Present, String::new())
    }

    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key.into(), ConditionOp::Equals, value.into())
    }

    pub fn not_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key.into(), ConditionOp::NotEquals, value.into())
    }

    fn new(key_name: String, op: ConditionOp, value: String) -> Self {
        Self {
            key_name,
            key: None,
            op,
            value,
        }
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn op(&self) -> ConditionOp {
        self.op
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Key resolved by the last [`compile`](Self::compile), if the dataset knows the name
    pub fn key(&self) -> Option<TagKey> {
        self.key
    }

    /// Resolve the tag name against `dataset`
    pub fn compile(&mut self, dataset: &DataSet) {
        self.key = dataset.tag_key(&self.key_name);
    }

    pub fn matches(&self, state: &State<'_>) -> bool {
        self.matches_with(state, &Overlay::default())
    }

    pub(crate) fn matches_with(&self, state: &State<'_>, overlay: &Overlay<'_>) -> bool {
        if let Some(value) = overlay.tag(&self.key_name) {
            return self.test(value);
        }
        if let Some(element) = state.element {
            if let Some(value) = self.key.and_then(|key| element.tag_value(key)) {
                return self.test(value);
            }
            let cached = state
                .cache
                .and_then(|cache| cache.get(element.kind(), element.id(), &self.key_name));
            if let Some(value) = cached {
                return self.test(&value);
            }
        }
        self.test("")
    }

    #[inline]
    fn test(&self, value: &str) -> bool {
        match self.op {
            ConditionOp::Present => !value.is_empty(),
            ConditionOp::Equals => value == self.value,
            ConditionOp::NotEquals => value != self.value,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            ConditionOp::Present => write!(f, "[{}]", self.key_name),
            ConditionOp::Equals => write!(f, "[{}={}]", self.key_name, self.value),
            ConditionOp::NotEquals => write!(f, "[{}!={}]", self.key_name, self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementRef, Point};
    use crate::style::{Declaration, TagCache};
    use crate::tag::Tag;
    use crate::{Coordinate, Kind};

    fn create_test_dataset() -> DataSet {
        let mut dataset = DataSet::new();
        let shop = dataset.intern("shop");
        let name = dataset.intern("name");
        dataset.add_point(Point {
            id: 1,
            coordinate: Coordinate::new(48.0, 11.0),
            tags: vec![Tag::new(shop, "bakery"), Tag::new(name, "")],
        });
        dataset
    }

    fn compiled(mut condition: Condition, dataset: &DataSet) -> Condition {
        condition.compile(dataset);
        condition
    }

    #[test]
    fn test_present_requires_non_empty_value() {
        let dataset = create_test_dataset();
        let state = State::new(dataset.point(1).unwrap());
        assert!(compiled(Condition::present("shop"), &dataset).matches(&state));
        assert!(!compiled(Condition::present("name"), &dataset).matches(&state));
        assert!(!compiled(Condition::present("amenity"), &dataset).matches(&state));
    }

    #[test]
    fn test_equality_is_exact_and_case_sensitive() {
        let dataset = create_test_dataset();
        let state = State::new(dataset.point(1).unwrap());
        assert!(compiled(Condition::equals("shop", "bakery"), &dataset).matches(&state));
        assert!(!compiled(Condition::equals("shop", "Bakery"), &dataset).matches(&state));
        assert!(compiled(Condition::not_equals("shop", "Bakery"), &dataset).matches(&state));
        assert!(!compiled(Condition::not_equals("shop", "bakery"), &dataset).matches(&state));
        // Absent tags compare as the empty string
        assert!(compiled(Condition::not_equals("amenity", "cafe"), &dataset).matches(&state));
        assert!(compiled(Condition::equals("amenity", ""), &dataset).matches(&state));
    }

    #[test]
    fn test_uncompiled_condition_sees_tags_as_absent() {
        let dataset = create_test_dataset();
        let state = State::new(dataset.point(1).unwrap());
        let condition = Condition::present("shop");
        assert!(condition.key().is_none());
        assert!(!condition.matches(&state));
    }

    #[test]
    fn test_key_from_other_dataset_never_matches() {
        let dataset = create_test_dataset();
        let other = create_test_dataset();
        let condition = compiled(Condition::present("shop"), &other);
        assert!(condition.key().is_some());
        assert!(!condition.matches(&State::new(dataset.point(1).unwrap())));
    }

    #[test]
    fn test_overlay_and_cache_lookup_order() {
        let dataset = create_test_dataset();
        let cache = TagCache::new();
        cache.insert(Kind::Point, 1, "opening_hours:state", "open");
        cache.insert(Kind::Point, 1, "shop", "ignored");
        let state = State::new(ElementRef::from(dataset.point(1).unwrap())).with_cache(&cache);

        let condition = compiled(Condition::equals("opening_hours:state", "open"), &dataset);
        assert!(condition.matches(&state));
        // Element tags take precedence over the cache
        assert!(compiled(Condition::equals("shop", "bakery"), &dataset).matches(&state));

        let declaration = Declaration::tag("shop", "closed");
        let mut overlay = Overlay::default();
        overlay.apply(&declaration);
        let condition = compiled(Condition::equals("shop", "closed"), &dataset);
        assert!(condition.matches_with(&state, &overlay));
        assert!(!condition.matches(&state));
    }

    #[test]
    fn test_canvas_state_has_no_tags() {
        let condition = Condition::not_equals("shop", "bakery");
        assert!(condition.matches(&State::canvas(10.0)));
        assert!(!Condition::present("shop").matches(&State::canvas(10.0)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Condition::present("indoor").to_string(), "[indoor]");
        assert_eq!(Condition::equals("indoor", "room").to_string(), "[indoor=room]");
        assert_eq!(Condition::not_equals("level", "0").to_string(), "[level!=0]");
    }
}
