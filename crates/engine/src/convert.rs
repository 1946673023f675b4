//! Pluggable scalar conversion layer.
//!
//! Maps a parsed scalar onto a typed [`ComponentValue`], keyed by a target
//! type name. Built-in targets cover the primitive types plus the dice and
//! script mini-languages; callers register additional targets for their own
//! conversions (the way custom scalar notations get first-class template
//! support).

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use entforge_domain::{DiceExpression, ScalarValue, ScriptExpression};

use crate::component::ComponentValue;

/// A scalar → typed-value conversion. Returns a human-readable reason on
/// failure; the caller wraps it with field context.
pub type ConversionFn = dyn Fn(&ScalarValue) -> Result<ComponentValue, String> + Send + Sync;

/// Failure converting a scalar to a declared target type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {source_type} to {target_type}: {reason}")]
pub struct ConvertError {
    pub source_type: &'static str,
    pub target_type: String,
    pub reason: String,
}

/// Registry of scalar conversions, keyed case-insensitively by target type
/// name.
#[derive(Clone)]
pub struct ConversionRegistry {
    conversions: HashMap<String, Arc<ConversionFn>>,
}

impl ConversionRegistry {
    /// A registry with the built-in targets: `int`, `float`, `bool`,
    /// `string`, `dice`, `script`.
    pub fn new() -> Self {
        let mut registry = Self {
            conversions: HashMap::new(),
        };
        registry.register("int", convert_int);
        registry.register("float", convert_float);
        registry.register("bool", convert_bool);
        registry.register("string", convert_string);
        registry.register("dice", convert_dice);
        registry.register("script", convert_script);
        registry
    }

    /// Registers a conversion for `target_type`, replacing any existing one.
    pub fn register<F>(&mut self, target_type: impl Into<String>, conversion: F)
    where
        F: Fn(&ScalarValue) -> Result<ComponentValue, String> + Send + Sync + 'static,
    {
        self.conversions
            .insert(target_type.into().to_ascii_lowercase(), Arc::new(conversion));
    }

    pub fn supports(&self, target_type: &str) -> bool {
        self.conversions
            .contains_key(&target_type.to_ascii_lowercase())
    }

    /// Converts `scalar` to the named target type.
    pub fn convert(
        &self,
        target_type: &str,
        scalar: &ScalarValue,
    ) -> Result<ComponentValue, ConvertError> {
        let conversion = self
            .conversions
            .get(&target_type.to_ascii_lowercase())
            .ok_or_else(|| ConvertError {
                source_type: scalar.type_name(),
                target_type: target_type.to_string(),
                reason: "no conversion registered for target type".to_string(),
            })?;
        conversion(scalar).map_err(|reason| ConvertError {
            source_type: scalar.type_name(),
            target_type: target_type.to_string(),
            reason,
        })
    }
}

impl Default for ConversionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_int(scalar: &ScalarValue) -> Result<ComponentValue, String> {
    match scalar {
        ScalarValue::Int(v) => Ok(ComponentValue::Int(*v)),
        ScalarValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map(ComponentValue::Int)
            .map_err(|e| e.to_string()),
        other => Err(format!("{} is not an integer", other.type_name())),
    }
}

fn convert_float(scalar: &ScalarValue) -> Result<ComponentValue, String> {
    match scalar {
        ScalarValue::Float(v) => Ok(ComponentValue::Float(*v)),
        ScalarValue::Int(v) => Ok(ComponentValue::Float(*v as f64)),
        ScalarValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map(ComponentValue::Float)
            .map_err(|e| e.to_string()),
        other => Err(format!("{} is not a number", other.type_name())),
    }
}

fn convert_bool(scalar: &ScalarValue) -> Result<ComponentValue, String> {
    match scalar {
        ScalarValue::Bool(v) => Ok(ComponentValue::Bool(*v)),
        ScalarValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(ComponentValue::Bool(true)),
            "false" => Ok(ComponentValue::Bool(false)),
            other => Err(format!("'{}' is not a boolean", other)),
        },
        other => Err(format!("{} is not a boolean", other.type_name())),
    }
}

fn convert_string(scalar: &ScalarValue) -> Result<ComponentValue, String> {
    // Any scalar renders to its textual form; strings keep their case.
    Ok(ComponentValue::Str(scalar.to_string()))
}

fn convert_dice(scalar: &ScalarValue) -> Result<ComponentValue, String> {
    let source = scalar
        .as_str()
        .ok_or_else(|| format!("dice notation must be a string, got {}", scalar.type_name()))?;
    DiceExpression::parse(source)
        .map(ComponentValue::Dice)
        .map_err(|e| e.to_string())
}

fn convert_script(scalar: &ScalarValue) -> Result<ComponentValue, String> {
    let source = scalar
        .as_str()
        .ok_or_else(|| format!("script source must be a string, got {}", scalar.type_name()))?;
    ScriptExpression::new(source)
        .map(ComponentValue::Script)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_string_converts_to_int() {
        let registry = ConversionRegistry::new();
        let value = registry
            .convert("int", &ScalarValue::String("42".to_string()))
            .unwrap();
        assert_eq!(value, ComponentValue::Int(42));
    }

    #[test]
    fn test_int_widens_to_float() {
        let registry = ConversionRegistry::new();
        let value = registry.convert("float", &ScalarValue::Int(3)).unwrap();
        assert_eq!(value, ComponentValue::Float(3.0));
    }

    #[test]
    fn test_bool_from_string() {
        let registry = ConversionRegistry::new();
        assert_eq!(
            registry
                .convert("bool", &ScalarValue::String("True".to_string()))
                .unwrap(),
            ComponentValue::Bool(true)
        );
    }

    #[test]
    fn test_string_preserves_case() {
        let registry = ConversionRegistry::new();
        let value = registry
            .convert("string", &ScalarValue::String("Darkvision".to_string()))
            .unwrap();
        assert_eq!(value, ComponentValue::Str("Darkvision".to_string()));
    }

    #[test]
    fn test_dice_round_trip() {
        let registry = ConversionRegistry::new();
        let value = registry
            .convert("dice", &ScalarValue::String("5d6".to_string()))
            .unwrap();
        let dice = value.as_dice().expect("expected a dice value");
        assert_eq!(dice.to_string(), "5d6");
    }

    #[test]
    fn test_dice_rejects_non_string() {
        let registry = ConversionRegistry::new();
        let err = registry.convert("dice", &ScalarValue::Int(6)).unwrap_err();
        assert_eq!(err.target_type, "dice");
        assert_eq!(err.source_type, "int");
    }

    #[test]
    fn test_unknown_target_type() {
        let registry = ConversionRegistry::new();
        let err = registry
            .convert("hologram", &ScalarValue::Int(1))
            .unwrap_err();
        assert!(err.reason.contains("no conversion registered"));
    }

    #[test]
    fn test_custom_conversion_is_registrable() {
        let mut registry = ConversionRegistry::new();
        registry.register("percent", |scalar: &ScalarValue| match scalar {
            ScalarValue::String(s) => s
                .trim_end_matches('%')
                .parse::<f64>()
                .map(|v| ComponentValue::Float(v / 100.0))
                .map_err(|e| e.to_string()),
            other => Err(format!("{} is not a percentage", other.type_name())),
        });

        let value = registry
            .convert("percent", &ScalarValue::String("45%".to_string()))
            .unwrap();
        assert_eq!(value, ComponentValue::Float(0.45));
    }
}
