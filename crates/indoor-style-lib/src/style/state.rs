//! Evaluation state, the per-call overlay and the shared side-lookup cache

use super::declaration::{Declaration, DeclarationType};
use super::selector::ObjectType;
use crate::element::{ElementRef, Id, Kind};
use dashmap::DashMap;
use smallvec::SmallVec;

/// Input of one style evaluation
#[derive(Clone, Copy, Debug)]
pub struct State<'a> {
    /// Element being styled, `None` for the canvas
    pub element: Option<ElementRef<'a>>,
    pub zoom_level: f64,
    /// Floor level in tenths, so half levels can be represented
    pub floor_level: i32,
    /// Classification of `element`, filled in by [`Style::initialize_state`](super::Style::initialize_state)
    pub object_type: ObjectType,
    /// Caller-owned side lookups, read when a tag is found nowhere else
    pub cache: Option<&'a TagCache>,
}

impl Default for State<'_> {
    fn default() -> Self {
        Self {
            element: None,
            zoom_level: 0.0,
            floor_level: 0,
            object_type: ObjectType::Any,
            cache: None,
        }
    }
}

impl<'a> State<'a> {
    pub fn new(element: impl Into<ElementRef<'a>>) -> Self {
        Self {
            element: Some(element.into()),
            ..Default::default()
        }
    }

    /// State for the canvas pseudo-element
    pub fn canvas(zoom_level: f64) -> Self {
        Self {
            zoom_level,
            object_type: ObjectType::Canvas,
            ..Default::default()
        }
    }

    pub fn with_zoom(mut self, zoom_level: f64) -> Self {
        self.zoom_level = zoom_level;
        self
    }

    pub fn with_floor(mut self, floor_level: i32) -> Self {
        self.floor_level = floor_level;
        self
    }

    pub fn with_cache(mut self, cache: &'a TagCache) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// Computed tag values keyed by element, e.g. the current opening hours state
///
/// Populated by the caller, possibly from several threads; the engine only reads.
#[derive(Debug, Default)]
pub struct TagCache {
    entries: DashMap<(Kind, Id), Vec<(String, String)>>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value` for one element, replacing an earlier value
    pub fn insert(&self, kind: Kind, id: Id, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let mut entry = self.entries.entry((kind, id)).or_default();
        match entry.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => entry.push((name, value)),
        }
    }

    pub fn get(&self, kind: Kind, id: Id, name: &str) -> Option<String> {
        let entry = self.entries.get(&(kind, id))?;
        entry
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.clone())
    }

    /// Drop all values of one element
    pub fn remove(&self, kind: Kind, id: Id) {
        self.entries.remove(&(kind, id));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of elements with cached values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tags and classes set by declarations during one evaluate call
///
/// Lives on the stack of that call only, so class side effects never leak into
/// another evaluation.
#[derive(Debug, Default)]
pub(crate) struct Overlay<'s> {
    tags: SmallVec<[(&'s str, &'s str); 4]>,
    classes: SmallVec<[&'s str; 4]>,
}

impl<'s> Overlay<'s> {
    /// Record the tag or class a declaration sets; property declarations are ignored
    pub(crate) fn apply(&mut self, declaration: &'s Declaration) {
        match declaration.declaration_type() {
            DeclarationType::Property => {}
            DeclarationType::Tag => {
                let value = declaration.string_value().unwrap_or_default();
                self.set_tag(declaration.name(), value);
            }
            DeclarationType::Class => {
                if !self.has_class(declaration.name()) {
                    self.classes.push(declaration.name());
                }
            }
        }
    }

    pub(crate) fn tag(&self, name: &str) -> Option<&'s str> {
        self.tags
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    pub(crate) fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|class| *class == name)
    }

    fn set_tag(&mut self, name: &'s str, value: &'s str) {
        match self.tags.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.tags.push((name, value)),
        }
    }
}
