//! Output of a style evaluation
//!
//! A [`StyleResult`] borrows the declarations of the [`Style`](super::Style)
//! that produced it and is meant to be reused across evaluations: `clear()`
//! keeps every allocated layer around for the next element. Since the layers
//! point into the style's rules, a buffer cannot be kept across a
//! `Style::compile` or `Style::push_rule` of the style that filled it.

use super::declaration::{Declaration, DeclarationType, Property, PropertyFlags};
use smallvec::SmallVec;

/// Winning declarations of one layer
#[derive(Debug, Default)]
pub struct ResultLayer<'s> {
    name: Option<&'s str>,
    declarations: Vec<&'s Declaration>,
    flags: PropertyFlags,
    tags: SmallVec<[(&'s str, &'s str); 2]>,
    classes: SmallVec<[&'s str; 2]>,
}

impl<'s> ResultLayer<'s> {
    /// Layer name, `None` for the default layer
    pub fn name(&self) -> Option<&'s str> {
        self.name
    }

    pub fn is_default(&self) -> bool {
        self.name.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.tags.is_empty() && self.classes.is_empty()
    }

    /// Winning declaration for `property`
    pub fn declaration(&self, property: Property) -> Option<&'s Declaration> {
        self.declarations
            .iter()
            .find(|declaration| declaration.property_kind() == Some(property))
            .copied()
    }

    /// Winning property declarations in first-set order
    pub fn declarations(&self) -> impl Iterator<Item = &'s Declaration> + '_ {
        self.declarations.iter().copied()
    }

    /// Union of the flags of every applied declaration, overridden ones included
    pub fn property_flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn has_area_properties(&self) -> bool {
        self.flags.contains(PropertyFlags::AREA)
    }

    pub fn has_line_properties(&self) -> bool {
        self.flags.contains(PropertyFlags::LINE)
    }

    pub fn has_label_properties(&self) -> bool {
        self.flags.contains(PropertyFlags::LABEL)
    }

    pub fn has_extrude_properties(&self) -> bool {
        self.flags.contains(PropertyFlags::EXTRUDE)
    }

    /// Value set by a tag declaration
    pub fn tag_value(&self, name: &str) -> Option<&'s str> {
        self.tags
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    pub fn classes(&self) -> &[&'s str] {
        &self.classes
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|class| *class == name)
    }

    /// Fold one declaration into this layer, last write wins
    pub(crate) fn apply(&mut self, declaration: &'s Declaration) {
        if !declaration.is_valid() {
            return;
        }
        match declaration.declaration_type() {
            DeclarationType::Property => {
                self.flags |= declaration.property_flags();
                let slot = self
                    .declarations
                    .iter_mut()
                    .find(|existing| existing.property_kind() == declaration.property_kind());
                match slot {
                    Some(slot) => *slot = declaration,
                    None => self.declarations.push(declaration),
                }
            }
            DeclarationType::Tag => {
                let name = declaration.name();
                let value = declaration.string_value().unwrap_or_default();
                match self.tags.iter_mut().find(|(key, _)| *key == name) {
                    Some((_, slot)) => *slot = value,
                    None => self.tags.push((name, value)),
                }
            }
            DeclarationType::Class => {
                if !self.has_class(declaration.name()) {
                    self.classes.push(declaration.name());
                }
            }
        }
    }

    fn clear(&mut self) {
        self.name = None;
        self.declarations.clear();
        self.flags = PropertyFlags::NONE;
        self.tags.clear();
        self.classes.clear();
    }
}

/// Layers produced by one evaluation, in order of first use
#[derive(Debug, Default)]
pub struct StyleResult<'s> {
    layers: Vec<ResultLayer<'s>>,
    active: usize,
}

impl<'s> StyleResult<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for the next evaluation, keeping allocations
    pub fn clear(&mut self) {
        for layer in &mut self.layers[..self.active] {
            layer.clear();
        }
        self.active = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.layers().iter().all(ResultLayer::is_empty)
    }

    pub fn layers(&self) -> &[ResultLayer<'s>] {
        &self.layers[..self.active]
    }

    pub fn default_layer(&self) -> Option<&ResultLayer<'s>> {
        self.layers().iter().find(|layer| layer.is_default())
    }

    /// Named layer, e.g. `link_forward`
    pub fn layer(&self, name: &str) -> Option<&ResultLayer<'s>> {
        self.layers().iter().find(|layer| layer.name == Some(name))
    }

    /// Layer to write into, taken from the pool if it is not active yet
    pub(crate) fn layer_mut(&mut self, name: Option<&'s str>) -> &mut ResultLayer<'s> {
        let index = match self.layers().iter().position(|layer| layer.name == name) {
            Some(index) => index,
            None => {
                if self.active == self.layers.len() {
                    self.layers.push(ResultLayer::default());
                }
                let index = self.active;
                self.layers[index].name = name;
                self.active += 1;
                index
            }
        };
        &mut self.layers[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Value;

    #[test]
    fn test_last_write_wins_and_flags_accumulate() {
        let declarations = [
            Declaration::property("width", Value::Double(1.0)),
            Declaration::property("fill-color", Value::Color(crate::Color::rgb(1, 2, 3))),
            Declaration::property("width", Value::Double(3.0)),
            Declaration::property("bogus", Value::Double(9.0)),
        ];
        let mut result = StyleResult::new();
        let layer = result.layer_mut(None);
        for declaration in &declarations {
            layer.apply(declaration);
        }

        let layer = result.default_layer().unwrap();
        let width = layer.declaration(Property::Width).unwrap();
        assert_eq!(width.double_value(), Some(3.0));
        assert_eq!(layer.declarations().count(), 2);
        assert!(layer.has_line_properties());
        assert!(layer.has_area_properties());
        assert!(!layer.has_label_properties());
        assert!(!layer.has_extrude_properties());
    }

    #[test]
    fn test_tags_and_classes() {
        let declarations = [
            Declaration::tag("level", "1"),
            Declaration::class("toilets"),
            Declaration::tag("level", "2"),
            Declaration::class("toilets"),
        ];
        let mut result = StyleResult::new();
        let layer = result.layer_mut(None);
        for declaration in &declarations {
            layer.apply(declaration);
        }
        let layer = result.default_layer().unwrap();
        assert_eq!(layer.tag_value("level"), Some("2"));
        assert_eq!(layer.classes(), &["toilets"]);
        assert!(layer.property_flags().is_empty());
    }

    #[test]
    fn test_named_layers_and_reuse() {
        let width = Declaration::property("width", Value::Int(2));
        let mut result = StyleResult::new();
        result.layer_mut(None).apply(&width);
        result.layer_mut(Some("link_forward")).apply(&width);
        result.layer_mut(None).apply(&width);
        assert_eq!(result.layers().len(), 2);
        assert!(result.layer("link_forward").is_some());
        assert!(result.layer("link_backward").is_none());

        result.clear();
        assert!(result.layers().is_empty());
        assert!(result.is_empty());
        assert!(result.default_layer().is_none());

        // Pooled layers come back empty and renamed
        result.layer_mut(Some("link_backward"));
        let layer = result.layer("link_backward").unwrap();
        assert!(layer.is_empty());
        assert!(layer.property_flags().is_empty());
    }
}
