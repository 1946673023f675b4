//! EntForge Domain - Template data model, merge algebra, and value objects
//!
//! This crate is pure: no I/O, no global state, no engine dependencies.
//! It defines the structured value model templates are parsed into, the
//! [`EntityTemplate`] type with its additive merge algebra, and the value
//! objects component conversion targets (dice notation, script snippets).

pub mod template;
pub mod value;
pub mod value_objects;

pub use template::EntityTemplate;
pub use value::{ScalarValue, TemplateValue};
pub use value_objects::{DiceExpression, DiceParseError, ScriptExpression, ScriptParseError};
