//! Tag keys and the per-dataset interner
//!
//! Tag names are interned into small [`TagKey`] handles when a dataset is
//! populated. Every interner carries a process-unique generation number that is
//! baked into each key it hands out, so keys from two different datasets never
//! compare equal, even for identical names.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Source of interner generations
static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

/// Interned tag name, only meaningful for the interner (dataset) that created it
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagKey {
    generation: u32,
    index: u32,
}

impl TagKey {
    /// Generation of the interner this key belongs to
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagKey({}:{})", self.generation, self.index)
    }
}

/// A key/value pair attached to a record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub key: TagKey,
    pub value: String,
}

impl Tag {
    pub fn new(key: TagKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Maps tag names to [`TagKey`]s for one dataset
///
/// Deliberately not `Clone`: a cloned interner would hand out colliding keys
/// for different names under the same generation.
#[derive(Debug)]
pub struct TagInterner {
    generation: u32,
    names: Vec<Box<str>>,
    lookup: HashMap<Box<str>, u32>,
}

impl Default for TagInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TagInterner {
    pub fn new() -> Self {
        Self {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            names: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Return the key for `name`, creating it if necessary
    pub fn intern(&mut self, name: &str) -> TagKey {
        if let Some(&index) = self.lookup.get(name) {
            return self.key(index);
        }
        let index = self.names.len() as u32;
        self.names.push(name.into());
        self.lookup.insert(name.into(), index);
        self.key(index)
    }

    /// Return the key for `name` if it has been interned before
    ///
    /// A name that was never interned cannot occur on any record of the dataset.
    pub fn get(&self, name: &str) -> Option<TagKey> {
        self.lookup.get(name).map(|&index| self.key(index))
    }

    /// Name of a key created by this interner
    pub fn name(&self, key: TagKey) -> Option<&str> {
        if key.generation != self.generation {
            return None;
        }
        self.names.get(key.index as usize).map(|name| &**name)
    }

    /// Whether `key` was created by this interner
    #[inline]
    pub fn owns(&self, key: TagKey) -> bool {
        key.generation == self.generation && (key.index as usize) < self.names.len()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[inline]
    fn key(&self, index: u32) -> TagKey {
        TagKey {
            generation: self.generation,
            index,
        }
    }
}

/// Linear scan of a tag list
///
/// Tag lists only hold a handful of entries, so they are kept in source order.
#[inline]
pub fn tag_value(tags: &[Tag], key: TagKey) -> Option<&str> {
    tags.iter()
        .find(|tag| tag.key == key)
        .map(|tag| tag.value.as_str())
}
