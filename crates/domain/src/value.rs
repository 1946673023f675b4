//! Structured value model shared by the template loader and the component factory.
//!
//! Every template element is expressed in this model after raw parsing,
//! regardless of whether the source file was YAML or JSON. Values are
//! immutable once produced by a parser adapter.

use std::fmt;

/// A single scalar leaf: string, number, or boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// Returns a short name for the scalar's runtime type, used in
    /// conversion error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Returns the string payload if this scalar is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
        }
    }
}

/// A parsed semi-structured value: scalar leaf, ordered sequence, or
/// ordered mapping with unique, case-insensitively compared string keys.
///
/// Key uniqueness is the parser's responsibility; lookups here assume it.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Scalar(ScalarValue),
    Sequence(Vec<TemplateValue>),
    Mapping(Vec<(String, TemplateValue)>),
}

impl TemplateValue {
    /// Convenience constructor for a string scalar.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Scalar(ScalarValue::String(value.into()))
    }

    /// Convenience constructor for an integer scalar.
    pub fn int(value: i64) -> Self {
        Self::Scalar(ScalarValue::Int(value))
    }

    /// Convenience constructor for a float scalar.
    pub fn float(value: f64) -> Self {
        Self::Scalar(ScalarValue::Float(value))
    }

    /// Convenience constructor for a boolean scalar.
    pub fn bool(value: bool) -> Self {
        Self::Scalar(ScalarValue::Bool(value))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[TemplateValue]> {
        match self {
            Self::Sequence(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(String, TemplateValue)]> {
        match self {
            Self::Mapping(entries) => Some(entries.as_slice()),
            _ => None,
        }
    }

    /// Case-insensitive key lookup on a mapping. Returns `None` for
    /// non-mapping values.
    pub fn get(&self, key: &str) -> Option<&TemplateValue> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Nested lookup: descends through `path` segments (each a mapping key),
    /// then resolves `key` in the mapping reached. An empty path is a plain
    /// [`get`](Self::get).
    pub fn get_at_path(&self, path: &[String], key: &str) -> Option<&TemplateValue> {
        let mut current = self;
        for segment in path {
            current = current.get(segment)?;
        }
        current.get(key)
    }
}
