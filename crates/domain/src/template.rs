//! Entity template data model and the additive merge algebra.
//!
//! A template is a named bag of raw component payloads plus inheritance
//! references, tags, and embedded sub-templates. Merging another template in
//! is additive and non-destructive: existing component keys are never
//! overwritten (first-writer-wins) while inherits, tags, and embedded
//! templates form insertion-ordered unions. Local declarations therefore
//! always win over anything merged in later.
//!
//! Identifiers (names, component keys, tags) are compared ASCII
//! case-insensitively throughout.

use std::hash::{Hash, Hasher};

use crate::value::TemplateValue;

/// Declarative description of an entity: its components, tags, inheritance
/// chain, and embedded sub-entities.
///
/// Equality and hashing are defined solely by the case-insensitive `name`;
/// two templates are "the same" iff their names match, regardless of payload.
#[derive(Debug, Clone, Default)]
pub struct EntityTemplate {
    name: Option<String>,
    components: Vec<(String, TemplateValue)>,
    inherits: Vec<String>,
    tags: Vec<String>,
    embedded: Vec<EntityTemplate>,
}

impl EntityTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty template with a name already assigned.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// The template's identity key, if one has been assigned yet.
    /// Nameless templates get their name from the repository or loader
    /// context that produced them.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Raw component payloads in declaration order.
    pub fn components(&self) -> &[(String, TemplateValue)] {
        &self.components
    }

    /// Case-insensitive component payload lookup.
    pub fn component(&self, name: &str) -> Option<&TemplateValue> {
        self.components
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Names of the templates this one derives from, in declaration order.
    /// Declaration order fixes merge precedence, so it is preserved exactly.
    pub fn inherits(&self) -> &[String] {
        &self.inherits
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// True when the template carries every one of `tags`.
    pub fn has_all_tags<T: AsRef<str>>(&self, tags: &[T]) -> bool {
        tags.iter().all(|tag| self.has_tag(tag.as_ref()))
    }

    /// Embedded sub-templates in declaration order, each representing a
    /// child entity to be created when this template is instantiated.
    pub fn embedded(&self) -> &[EntityTemplate] {
        &self.embedded
    }

    /// Case-insensitive embedded template lookup by name.
    pub fn embedded_by_name(&self, name: &str) -> Option<&EntityTemplate> {
        self.embedded.iter().find(|t| t.is_named(name))
    }

    /// Adds a component payload unless the key is already present
    /// (first-writer-wins).
    pub fn add_component(&mut self, name: impl Into<String>, value: TemplateValue) {
        let name = name.into();
        if self.component(&name).is_none() {
            self.components.push((name, value));
        }
    }

    /// Appends an inheritance reference, deduplicating case-insensitively.
    pub fn add_inherit(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.inherits.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            self.inherits.push(name);
        }
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.has_tag(&tag) {
            self.tags.push(tag);
        }
    }

    /// Adds an embedded template unless one with the same name is already
    /// present. Name-keyed identity means merges never duplicate an embedded
    /// template.
    pub fn add_embedded(&mut self, template: EntityTemplate) {
        if !self.embedded.iter().any(|existing| *existing == template) {
            self.embedded.push(template);
        }
    }

    /// Merges `other` into this template without overwriting existing data:
    /// component keys already present are kept, while inherits, tags, and
    /// embedded templates are unioned in `other`'s declaration order.
    pub fn merge_with(&mut self, other: &EntityTemplate) {
        for (name, value) in &other.components {
            self.add_component(name.clone(), value.clone());
        }
        for name in &other.inherits {
            self.add_inherit(name.clone());
        }
        for tag in &other.tags {
            self.add_tag(tag.clone());
        }
        for embedded in &other.embedded {
            self.add_embedded(embedded.clone());
        }
    }

    fn is_named(&self, name: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(name))
    }
}

impl PartialEq for EntityTemplate {
    fn eq(&self, other: &Self) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for EntityTemplate {}

impl Hash for EntityTemplate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Some(name) = &self.name {
            name.to_ascii_lowercase().hash(state);
        }
    }
}
