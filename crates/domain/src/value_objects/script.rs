//! Embedded script expression value object.
//!
//! Templates may carry small script snippets as component values (e.g. an
//! on-interact behavior). The engine does not evaluate scripts; it only
//! validates and transports the source text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error when constructing a [`ScriptExpression`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptParseError {
    /// The script source is empty or whitespace-only
    #[error("Empty script source")]
    Empty,
}

/// Source text of an embedded script, guaranteed non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptExpression {
    source: String,
}

impl ScriptExpression {
    pub fn new(source: impl Into<String>) -> Result<Self, ScriptParseError> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(ScriptParseError::Empty);
        }
        Ok(Self { source })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl FromStr for ScriptExpression {
    type Err = ScriptParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ScriptExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
