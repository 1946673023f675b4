//! Component factory.
//!
//! Converts a raw [`TemplateValue`] payload into a typed [`ComponentValue`]
//! instance, given a schema. Value-shaped schemas take a single scalar;
//! structured schemas walk their declared fields against the payload
//! mapping. Construction is fail-fast: the first failing field aborts the
//! whole instance.

use tracing::debug;

use entforge_domain::TemplateValue;

use crate::component::ComponentValue;
use crate::convert::ConversionRegistry;
use crate::error::ComponentError;
use crate::registry::{ComponentSchema, FieldKind, FieldSchema, SchemaShape};

/// Builds typed component instances from raw template payloads.
///
/// Purely functional over its inputs; one factory may serve concurrent
/// construction calls.
pub struct ComponentFactory {
    conversions: ConversionRegistry,
}

impl ComponentFactory {
    /// A factory with the built-in conversions (int/float/bool/string/
    /// dice/script).
    pub fn new() -> Self {
        Self {
            conversions: ConversionRegistry::new(),
        }
    }

    pub fn with_conversions(conversions: ConversionRegistry) -> Self {
        Self { conversions }
    }

    /// Access to the conversion layer, for registering custom scalar→type
    /// mappings before construction begins.
    pub fn conversions_mut(&mut self) -> &mut ConversionRegistry {
        &mut self.conversions
    }

    /// Constructs a value-shaped component from a single scalar payload.
    pub fn create_value(
        &self,
        schema: &ComponentSchema,
        payload: &TemplateValue,
    ) -> Result<ComponentValue, ComponentError> {
        let SchemaShape::Value { value_type } = schema.shape() else {
            return Err(ComponentError::TypeMismatch {
                expected: "a value-shaped schema",
                actual: "structured schema",
            });
        };
        let scalar = payload
            .as_scalar()
            .ok_or(ComponentError::TypeMismatch {
                expected: "scalar payload",
                actual: "non-scalar payload",
            })?;

        debug!(component = schema.name(), %value_type, "constructing value component");
        self.conversions
            .convert(value_type, scalar)
            .map_err(|err| ComponentError::ConversionFailed {
                field: schema.name().to_string(),
                source_type: err.source_type,
                target_type: err.target_type,
                reason: err.reason,
            })
    }

    /// Constructs a structured component from a mapping payload, walking
    /// every declared field of the schema. Fields absent from the input
    /// retain their defaults.
    pub fn create_structured(
        &self,
        schema: &ComponentSchema,
        payload: &TemplateValue,
    ) -> Result<ComponentValue, ComponentError> {
        let SchemaShape::Structured { fields } = schema.shape() else {
            return Err(ComponentError::TypeMismatch {
                expected: "a structured schema",
                actual: "value-shaped schema",
            });
        };
        if !payload.is_mapping() {
            return Err(ComponentError::TypeMismatch {
                expected: "mapping payload",
                actual: "non-mapping payload",
            });
        }

        debug!(component = schema.name(), "constructing structured component");
        self.build_struct(fields, payload)
    }

    fn build_struct(
        &self,
        fields: &[FieldSchema],
        payload: &TemplateValue,
    ) -> Result<ComponentValue, ComponentError> {
        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            match payload.get_at_path(field.path(), field.name()) {
                Some(found) => {
                    let value = self.build_field(field, found)?;
                    values.push((field.name().to_string(), value));
                }
                None => {
                    if let Some(default) = self.default_for(field.kind()) {
                        values.push((field.name().to_string(), default));
                    }
                    // No sensible default exists for named conversion
                    // targets; those fields are omitted when absent.
                }
            }
        }
        Ok(ComponentValue::Struct(values))
    }

    fn build_field(
        &self,
        field: &FieldSchema,
        found: &TemplateValue,
    ) -> Result<ComponentValue, ComponentError> {
        match (field.kind(), found) {
            // Nested structured sub-object: recurse with the field's own
            // schema.
            (FieldKind::Struct(nested), TemplateValue::Mapping(_)) => {
                self.build_struct(nested, found)
            }
            (FieldKind::Struct(_), other) => Err(ComponentError::ConversionFailed {
                field: field.name().to_string(),
                source_type: shape_name(other),
                target_type: "struct".to_string(),
                reason: "expected a mapping".to_string(),
            }),
            (kind, TemplateValue::Scalar(scalar)) => {
                let target = kind
                    .conversion_target()
                    .unwrap_or("struct");
                self.conversions.convert(target, scalar).map_err(|err| {
                    ComponentError::ConversionFailed {
                        field: field.name().to_string(),
                        source_type: err.source_type,
                        target_type: err.target_type,
                        reason: err.reason,
                    }
                })
            }
            (kind, other) => Err(ComponentError::ConversionFailed {
                field: field.name().to_string(),
                source_type: shape_name(other),
                target_type: kind
                    .conversion_target()
                    .unwrap_or("struct")
                    .to_string(),
                reason: "expected a scalar".to_string(),
            }),
        }
    }

    fn default_for(&self, kind: &FieldKind) -> Option<ComponentValue> {
        match kind {
            FieldKind::Int => Some(ComponentValue::Int(0)),
            FieldKind::Float => Some(ComponentValue::Float(0.0)),
            FieldKind::Bool => Some(ComponentValue::Bool(false)),
            FieldKind::Str => Some(ComponentValue::Str(String::new())),
            FieldKind::Struct(nested) => {
                let defaults = nested
                    .iter()
                    .filter_map(|field| {
                        self.default_for(field.kind())
                            .map(|value| (field.name().to_string(), value))
                    })
                    .collect();
                Some(ComponentValue::Struct(defaults))
            }
            FieldKind::Named(_) => None,
        }
    }
}

impl Default for ComponentFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn shape_name(value: &TemplateValue) -> &'static str {
    match value {
        TemplateValue::Scalar(scalar) => scalar.type_name(),
        TemplateValue::Sequence(_) => "sequence",
        TemplateValue::Mapping(_) => "mapping",
    }
}
