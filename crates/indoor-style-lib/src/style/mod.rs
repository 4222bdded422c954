//! MapCSS-like cascading style engine
//!
//! A [`Style`] is an ordered list of [`Rule`]s. Each rule pairs a [`Selector`]
//! with a list of [`Declaration`]s. After [`Style::compile`] has resolved all tag
//! names against a [`DataSet`](crate::DataSet), [`Style::evaluate`] folds the
//! declarations of every matching rule into a [`StyleResult`], later rules
//! overriding earlier ones.

mod condition;
mod declaration;
mod result;
mod selector;
mod state;
#[allow(clippy::module_inception)]
mod style;

pub use condition::{Condition, ConditionOp};
pub use declaration::{
    Capitalization, Color, Declaration, DeclarationType, LineCap, LineJoin, Property,
    PropertyFlags, TextPosition, Unit, Value,
};
pub use result::{ResultLayer, StyleResult};
pub use selector::{BasicSelector, ChainedSelector, ObjectType, Selector, UnionSelector};
pub use state::{State, TagCache};
pub use style::{Rule, Style};
