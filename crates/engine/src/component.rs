//! Typed component instances.
//!
//! [`ComponentValue`] is what the component factory produces and what the
//! storage engine stores: either a single converted value (for value-shaped
//! components) or an ordered set of named, typed fields (for structured
//! components, possibly nested).

use serde::Serialize;

use entforge_domain::{DiceExpression, ScriptExpression};

/// A constructed, strongly-typed component value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Dice(DiceExpression),
    Script(ScriptExpression),
    /// Structured component body: declared fields in schema order.
    Struct(Vec<(String, ComponentValue)>),
}

impl ComponentValue {
    /// Case-insensitive field lookup on a structured value.
    pub fn field(&self, name: &str) -> Option<&ComponentValue> {
        match self {
            Self::Struct(fields) => fields
                .iter()
                .find(|(field, _)| field.eq_ignore_ascii_case(name))
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_dice(&self) -> Option<&DiceExpression> {
        match self {
            Self::Dice(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_script(&self) -> Option<&ScriptExpression> {
        match self {
            Self::Script(v) => Some(v),
            _ => None,
        }
    }
}
