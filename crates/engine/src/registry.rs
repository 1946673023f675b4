//! Component type registry.
//!
//! Maps a textual component name (as written in template files) to a
//! concrete component schema. Registration is an explicit manifest executed
//! once at startup; after [`RegistryBuilder::build`] the registry is
//! immutable and safe for unsynchronized concurrent lookups.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

/// Stable identifier for a registered component type, issued at
/// registry-build time. The storage engine keys type-erased attachments by
/// this id, so no runtime type lookup is ever needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component-type#{}", self.0)
    }
}

/// Declared type of a single schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    Str,
    /// Converted through a named entry in the conversion registry
    /// (e.g. "dice", "script", or a custom registration).
    Named(String),
    /// A nested structured sub-object with its own fields.
    Struct(Vec<FieldSchema>),
}

impl FieldKind {
    /// The conversion-registry key this kind resolves through, for scalar
    /// kinds. `Struct` fields recurse instead of converting.
    pub fn conversion_target(&self) -> Option<&str> {
        match self {
            Self::Int => Some("int"),
            Self::Float => Some("float"),
            Self::Bool => Some("bool"),
            Self::Str => Some("string"),
            Self::Named(name) => Some(name.as_str()),
            Self::Struct(_) => None,
        }
    }
}

/// One declared, typed field of a structured component.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    name: String,
    /// Mapping keys to descend through before resolving `name`; empty for
    /// top-level fields. Supports schemas that flatten nested payloads.
    path: Vec<String>,
    kind: FieldKind,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            path: Vec::new(),
            kind,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Str)
    }

    /// A field converted through a named conversion-registry entry.
    pub fn named(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Named(target_type.into()))
    }

    pub fn dice(name: impl Into<String>) -> Self {
        Self::named(name, "dice")
    }

    pub fn script(name: impl Into<String>) -> Self {
        Self::named(name, "script")
    }

    /// A nested structured sub-object.
    pub fn nested(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self::new(name, FieldKind::Struct(fields))
    }

    /// Looks the field up under the given mapping path instead of at the
    /// payload's top level.
    pub fn at_path<S: Into<String>>(mut self, path: impl IntoIterator<Item = S>) -> Self {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// The two component shapes the factory knows how to construct.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaShape {
    /// Holds a single converted scalar value.
    Value { value_type: String },
    /// Holds named, typed fields, themselves possibly nested.
    Structured { fields: Vec<FieldSchema> },
}

/// Registry entry describing one component type.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSchema {
    name: String,
    shape: SchemaShape,
    is_shared: bool,
}

impl ComponentSchema {
    /// A value-shaped component converting its scalar through the named
    /// conversion target.
    pub fn value(name: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: SchemaShape::Value {
                value_type: value_type.into(),
            },
            is_shared: false,
        }
    }

    /// A structured component with the given declared fields.
    pub fn structured(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            shape: SchemaShape::Structured { fields },
            is_shared: false,
        }
    }

    /// Marks the component as shared: attached once per storage engine and
    /// referenced, not copied, by every entity that declares it.
    pub fn shared(mut self) -> Self {
        self.is_shared = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &SchemaShape {
        &self.shape
    }

    pub fn is_shared(&self) -> bool {
        self.is_shared
    }
}

/// Two distinct schemas claimed the same component name.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to add component type, component with name '{name}' already exists")]
    DuplicateComponentName { name: String },
}

/// Startup-time builder for [`ComponentTypeRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<ComponentSchema>,
    index: HashMap<String, usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema. Names are compared case-insensitively; a second
    /// schema claiming an existing name is a startup integrity error.
    pub fn register(&mut self, schema: ComponentSchema) -> Result<&mut Self, RegistryError> {
        let key = schema.name().to_ascii_lowercase();
        if self.index.contains_key(&key) {
            return Err(RegistryError::DuplicateComponentName {
                name: schema.name().to_string(),
            });
        }
        debug!(component = schema.name(), "registered component schema");
        self.index.insert(key, self.entries.len());
        self.entries.push(schema);
        Ok(self)
    }

    /// Freezes the manifest into a read-only registry, issuing sequential
    /// type ids in registration order.
    pub fn build(self) -> ComponentTypeRegistry {
        info!(count = self.entries.len(), "component type registry built");
        ComponentTypeRegistry {
            entries: self.entries,
            index: self.index,
        }
    }
}

/// Read-only name → schema index. Built once at startup; concurrent lookups
/// need no synchronization.
#[derive(Debug)]
pub struct ComponentTypeRegistry {
    entries: Vec<ComponentSchema>,
    index: HashMap<String, usize>,
}

impl ComponentTypeRegistry {
    /// Case-insensitive schema lookup by component name.
    pub fn resolve(&self, name: &str) -> Option<(ComponentTypeId, &ComponentSchema)> {
        let position = *self.index.get(&name.to_ascii_lowercase())?;
        let id = ComponentTypeId(u32::try_from(position).ok()?);
        self.entries.get(position).map(|schema| (id, schema))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
