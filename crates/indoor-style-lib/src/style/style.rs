//! Style - ordered rule list, compilation and the cascade
//!
//! Rules are evaluated in source order. For every matching rule, each
//! declaration overwrites the value of the same property in the destination
//! layer, so the last matching rule wins. Tag and class declarations also
//! become visible to the conditions of later rules within the same call.

use super::declaration::{Declaration, PropertyFlags};
use super::result::StyleResult;
use super::selector::{LayerList, ObjectType, Selector};
use super::state::{Overlay, State};
use crate::element::ElementRef;
use crate::tag::TagKey;
use crate::{Config, DataSet, ElementFilter};
use rayon::prelude::*;
use std::fmt;

/// One `selector { declarations }` block
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub selector: Selector,
    pub declarations: Vec<Declaration>,
}

impl Rule {
    pub fn new(selector: impl Into<Selector>, declarations: Vec<Declaration>) -> Self {
        Self {
            selector: selector.into(),
            declarations,
        }
    }

    pub fn compile(&mut self, dataset: &DataSet) {
        self.selector.compile(dataset);
        for declaration in &mut self.declarations {
            declaration.compile(dataset);
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.selector)?;
        for declaration in &self.declarations {
            write!(f, " {declaration}")?;
        }
        f.write_str(" }")
    }
}

/// A stylesheet, compiled against one dataset at a time
///
/// Evaluation only reads from the style, so a compiled style can be shared
/// between threads as long as the dataset is not mutated.
#[derive(Debug, Default)]
pub struct Style {
    rules: Vec<Rule>,
    config: Config,
    area_key: Option<TagKey>,
    type_key: Option<TagKey>,
    /// Generation of the dataset compiled against
    generation: Option<u32>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Style {
    /// Empty style using the default [`Config`]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            ..Default::default()
        }
    }

    /// Append a rule; the style has to be compiled again before evaluation
    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
        self.generation = None;
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve all tag names against `dataset`
    ///
    /// Required whenever the dataset instance changes, since tag keys are only
    /// valid for the dataset that interned them. Calling it again for the same
    /// dataset is harmless.
    pub fn compile(&mut self, dataset: &DataSet) {
        #[cfg(feature = "profiling")]
        profiling::scope!("Style::compile");

        self.area_key = dataset.tag_key(&self.config.area_key);
        self.type_key = dataset.tag_key(&self.config.type_key);
        for rule in &mut self.rules {
            rule.compile(dataset);
        }
        self.generation = Some(dataset.generation());

        let unresolved: Vec<&str> = self
            .rules
            .iter()
            .flat_map(|rule| rule.selector.unresolved_conditions())
            .collect();
        let invalid = self
            .rules
            .iter()
            .flat_map(|rule| &rule.declarations)
            .filter(|declaration| !declaration.is_valid())
            .count();
        tracing::debug!(
            rules = self.rules.len(),
            invalid_declarations = invalid,
            unresolved = ?unresolved,
            "Compiled style"
        );
    }

    /// Whether the last compile was against `dataset`
    pub fn is_compiled_for(&self, dataset: &DataSet) -> bool {
        self.generation == Some(dataset.generation())
    }

    /// Classify the element of `state` for object type matching
    pub fn initialize_state(&self, state: &mut State<'_>) {
        state.object_type = match state.element {
            None => ObjectType::Canvas,
            Some(ElementRef::Point(_)) => ObjectType::Point,
            Some(element @ ElementRef::Path(path)) => {
                let not_area = self
                    .area_key
                    .and_then(|key| element.tag_value(key))
                    .is_some_and(|value| value == "no");
                if path.is_closed() && !not_area {
                    ObjectType::Area
                } else {
                    ObjectType::Line
                }
            }
            Some(element @ ElementRef::Composite(_)) => {
                let multipolygon = self
                    .type_key
                    .and_then(|key| element.tag_value(key))
                    .is_some_and(|value| value == self.config.multipolygon_type);
                if multipolygon {
                    ObjectType::Area
                } else {
                    ObjectType::Composite
                }
            }
        };
    }

    /// Fold the declarations of every matching rule into `result`
    ///
    /// `result` is not cleared first, so callers reusing it across elements
    /// call [`StyleResult::clear`] in between.
    pub fn evaluate<'s>(&'s self, state: &State<'_>, result: &mut StyleResult<'s>) {
        #[cfg(feature = "profiling")]
        profiling::scope!("Style::evaluate");

        let mut state = *state;
        self.initialize_state(&mut state);

        let mut overlay = Overlay::default();
        let mut layers = LayerList::new();
        for rule in &self.rules {
            layers.clear();
            rule.selector
                .collect_layers(&|selector| selector.matches_with(&state, &overlay), &mut layers);
            if layers.is_empty() {
                continue;
            }
            for &layer in &layers {
                let target = result.layer_mut(layer);
                for declaration in &rule.declarations {
                    target.apply(declaration);
                }
            }
            for declaration in &rule.declarations {
                overlay.apply(declaration);
            }
        }
    }

    /// Cascade for the canvas pseudo-element
    ///
    /// Only canvas selectors are tested, and only canvas properties applied.
    pub fn evaluate_canvas<'s>(&'s self, state: &State<'_>, result: &mut StyleResult<'s>) {
        let mut layers = LayerList::new();
        for rule in &self.rules {
            layers.clear();
            rule.selector
                .collect_layers(&|selector| selector.matches_canvas(state), &mut layers);
            for &layer in &layers {
                let target = result.layer_mut(layer);
                for declaration in &rule.declarations {
                    if declaration.property_flags().contains(PropertyFlags::CANVAS) {
                        target.apply(declaration);
                    }
                }
            }
        }
    }

    /// Evaluate every element of `dataset` and map each result through `f`
    ///
    /// `template` supplies zoom, floor and cache; its element is ignored.
    /// Output follows [`DataSet::elements`] order. Datasets smaller than
    /// [`Config::parallel_threshold`] are evaluated on the calling thread.
    pub fn evaluate_dataset_par<'s, 'd, T, F>(
        &'s self,
        dataset: &'d DataSet,
        template: &State<'d>,
        f: F,
    ) -> Vec<T>
    where
        T: Send,
        F: Fn(ElementRef<'d>, &StyleResult<'s>) -> T + Sync + Send,
    {
        #[cfg(feature = "profiling")]
        profiling::scope!("Style::evaluate_dataset_par");

        if !self.is_compiled_for(dataset) {
            tracing::warn!("Evaluating a style that was not compiled for this dataset");
        }

        let evaluate_one = |result: &mut StyleResult<'s>, element: ElementRef<'d>| {
            result.clear();
            let state = State {
                element: Some(element),
                ..*template
            };
            self.evaluate(&state, result);
            f(element, result)
        };

        if dataset.len() < self.config.parallel_threshold {
            let mut result = StyleResult::new();
            return dataset
                .elements(ElementFilter::ALL)
                .map(|element| evaluate_one(&mut result, element))
                .collect();
        }

        let elements: Vec<ElementRef<'d>> = dataset.elements(ElementFilter::ALL).collect();
        elements
            .into_par_iter()
            .map_init(StyleResult::new, |result, element| evaluate_one(result, element))
            .collect()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}
