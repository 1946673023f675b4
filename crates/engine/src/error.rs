//! Error types shared across the engine pipeline.
//!
//! Parse-time failures ([`ParseError`]) surface malformed template sources
//! and meta-property misuse; construction-time failures ([`BuildError`]) are
//! fatal to the current create/resolve call and carry enough context
//! (template, component, field) to locate the offending source key.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while parsing a template source into an [`EntityTemplate`]
/// (malformed structured value, unrecognized key, meta-property misuse, or
/// an I/O failure while following a reference).
///
/// [`EntityTemplate`]: entforge_domain::EntityTemplate
#[derive(Debug, Error)]
pub enum ParseError {
    /// The raw source text failed to deserialize
    #[error("Malformed {format} template: {reason}")]
    Syntax { format: &'static str, reason: String },

    /// The top-level document is not a mapping
    #[error("Template document must be a mapping of keys to values")]
    NotAMapping,

    /// A mapping key was not a string
    #[error("Template mapping keys must be strings (found '{key}')")]
    NonStringKey { key: String },

    /// A value shape the structured model cannot represent
    #[error("Unsupported value in template: {0}")]
    UnsupportedValue(String),

    /// A recognized template property carried the wrong payload shape
    #[error("Property '{key}' must be a {expected}")]
    MalformedProperty { key: String, expected: &'static str },

    /// A string-valued key that is not `$ref` or `$merge-ref`
    #[error(
        "Unrecognized meta-property '{key}'. Property name must be either '$ref' or '$merge-ref'"
    )]
    UnrecognizedMetaProperty { key: String },

    /// A key that fits none of the four dispatch shapes
    #[error("Unexpected property '{key}'. Check whether the template schema is correct")]
    UnexpectedProperty { key: String },

    /// Failed to read a template file (including `$ref` targets)
    #[error("Failed to read template file '{}': {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    /// Template files must be .yaml, .yml, or .json
    #[error("Template file '{}' must have a .yaml, .yml, or .json extension", path.display())]
    UnsupportedExtension { path: PathBuf },

    /// A `$ref`/`$merge-ref` chain revisited a file already being loaded
    #[error("Circular template reference through '{}'", path.display())]
    CircularReference { path: PathBuf },
}

/// Failure while constructing a single component instance.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// The wrong construction entry point was used for the schema shape
    #[error("Schema/input mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A field value could not be converted to its declared type
    #[error("Failed to convert field '{field}' from {source_type} to {target_type}: {reason}")]
    ConversionFailed {
        field: String,
        source_type: &'static str,
        target_type: String,
        reason: String,
    },
}

/// Construction-time failure, fatal to the current create/resolve call.
/// Planning is pure, so none of these leave partial state in the store.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No template with this name exists in the repository
    #[error("Template '{name}' not found")]
    UnknownTemplate { name: String },

    /// An inherited template name could not be resolved
    #[error("Inherited template '{parent}' not found (check template '{child}')")]
    MissingInheritance { parent: String, child: String },

    /// A template graph revisited a name already on the current path
    #[error("Cyclic template graph detected at '{name}'")]
    CyclicTemplateGraph { name: String },

    /// A component name with no registered schema
    #[error("Component '{component}' in template '{template}' is not registered. Check the spelling of the component name")]
    UnknownComponent { template: String, component: String },

    /// Payload shape does not match the schema shape
    #[error("Component '{component}' in template '{template}' expects a {expected} payload, got {actual}")]
    ShapeMismatch {
        template: String,
        component: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A component instance failed to construct
    #[error("Failed to construct component '{component}' in template '{template}': {source}")]
    Component {
        template: String,
        component: String,
        #[source]
        source: ComponentError,
    },
}
