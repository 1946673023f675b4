//! Value objects - Immutable objects defined by their attributes

mod dice;
mod script;

pub use dice::{DiceExpression, DiceParseError};
pub use script::{ScriptExpression, ScriptParseError};
