//! Indoor Style Library - Tagged Element Model and Cascading Style Engine
//!
//! This library holds tagged geographic data (points, paths and composites of
//! paths, each with a free-form key/value tag list) and evaluates MapCSS-like
//! stylesheets against it, producing per-element rendering directives grouped
//! into named layers.
//!
//! # Architecture
//!
//! - **[`DataSet`]**: Id-sorted record storage and the dataset-scoped [`TagInterner`]
//! - **[`ElementRef`]**: Borrowed reference to any record, with outer path assembly
//! - **[`Selector`]** / **[`Declaration`]**: Predicates over an evaluation [`State`]
//!   and the typed properties they set
//! - **[`Style`]**: Ordered rule list with `compile` (tag key resolution) and
//!   `evaluate` (last-write-wins cascade into a [`StyleResult`])
//!
//! # Usage
//!
//! ```ignore
//! let mut style = Style::new();
//! style.push_rule(Rule::new(
//!     BasicSelector::new(ObjectType::Path).with_condition(Condition::present("highway")),
//!     vec![Declaration::property("width", Value::Double(2.0))],
//! ));
//! style.compile(&dataset);
//!
//! let mut result = StyleResult::new();
//! for element in dataset.elements(ElementFilter::ALL) {
//!     result.clear();
//!     style.evaluate(&State::new(element).with_zoom(18.0), &mut result);
//! }
//! ```
//!
//! # Performance Characteristics
//!
//! - **Lookup**: O(log N) by id, O(T) tag lookup for T tags on a record
//! - **Evaluate**: O(R × C) for R rules with C conditions, allocation free once
//!   the result buffer has warmed up

mod config;
mod coordinate;
mod dataset;
mod element;
mod style;
mod tag;
pub mod utils;

// Public API exports
pub use config::Config;
pub use coordinate::{BoundingBox, Coordinate};
pub use dataset::{DataSet, ElementFilter, MergeBuffer, Reader, ReaderSink};
pub use element::{Composite, ElementRef, Id, Kind, Member, Path, Point};
pub use style::{
    BasicSelector, Capitalization, ChainedSelector, Color, Condition, ConditionOp, Declaration,
    DeclarationType, LineCap, LineJoin, ObjectType, Property, PropertyFlags, ResultLayer, Rule,
    Selector, State, Style, StyleResult, TagCache, TextPosition, UnionSelector, Unit, Value,
};
pub use tag::{Tag, TagInterner, TagKey};

/// Error types for loading and validating datasets
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reader error: {reason}")]
    Reader { reason: String },

    #[error("{} records are not sorted by id at index {index}", kind.as_str())]
    UnsortedIds { kind: Kind, index: usize },

    #[error("Duplicate {} id {id}", kind.as_str())]
    DuplicateId { kind: Kind, id: Id },

    #[error("Invalid coordinate: lat {lat}, lon {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn() -> DataSet = DataSet::new;
        let _: fn() -> Style = Style::new;
        let _: fn(Config) -> Style = Style::with_config;
        let _: fn() -> Config = Config::default;
    }

    #[test]
    fn test_error_messages() {
        let err = DataError::DuplicateId {
            kind: Kind::Path,
            id: 42,
        };
        assert_eq!(err.to_string(), "Duplicate path id 42");
        let err = DataError::UnsortedIds {
            kind: Kind::Point,
            index: 3,
        };
        assert_eq!(err.to_string(), "point records are not sorted by id at index 3");
    }
}
