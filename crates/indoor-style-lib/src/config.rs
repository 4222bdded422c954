//! Naming conventions and tuning knobs shared by the data model and the style engine

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for geometry assembly and style evaluation
///
/// The defaults follow OpenStreetMap tagging conventions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Tag distinguishing closed lines from areas (`area=no` marks a closed line)
    pub area_key: String,
    /// Tag holding the composite type
    pub type_key: String,
    /// Composite type value describing area geometry
    pub multipolygon_type: String,
    /// Member role of the outer rings of a multipolygon
    pub outer_role: String,
    /// Minimum number of elements before dataset-wide evaluation is spread
    /// over the rayon thread pool. Smaller datasets are evaluated inline.
    pub parallel_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            area_key: "area".to_string(),
            type_key: "type".to_string(),
            multipolygon_type: "multipolygon".to_string(),
            outer_role: "outer".to_string(),
            parallel_threshold: 1024,
        }
    }
}
