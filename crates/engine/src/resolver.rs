//! Inheritance resolver.
//!
//! Computes the effective (fully merged) template for a given template by
//! recursively folding in every inherited template, depth-first, parent
//! resolved before application. First-writer-wins merging gives the child's
//! own components precedence over anything inherited, and earlier-declared
//! parents precedence over later ones.
//!
//! The resolver never mutates templates held by the repository; it works on
//! independent copies and returns a transient effective template per call.

use entforge_domain::EntityTemplate;

use crate::error::BuildError;

/// Resolves template inheritance through an injected lookup strategy.
pub struct InheritanceResolver<F>
where
    F: Fn(&str) -> Option<EntityTemplate>,
{
    lookup: F,
}

impl<F> InheritanceResolver<F>
where
    F: Fn(&str) -> Option<EntityTemplate>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Traverses the inheritance chain and returns the effective template.
    ///
    /// Fails with [`BuildError::MissingInheritance`] when an inherited name
    /// cannot be resolved and with [`BuildError::CyclicTemplateGraph`] when
    /// a name reappears on the current resolution path.
    pub fn effective_template(
        &self,
        template: &EntityTemplate,
    ) -> Result<EntityTemplate, BuildError> {
        let mut path = Vec::new();
        self.resolve_on_path(template, &mut path)
    }

    fn resolve_on_path(
        &self,
        template: &EntityTemplate,
        path: &mut Vec<String>,
    ) -> Result<EntityTemplate, BuildError> {
        let own_name = template.name().map(str::to_ascii_lowercase);
        if let Some(name) = &own_name {
            if path.contains(name) {
                return Err(BuildError::CyclicTemplateGraph {
                    name: template.name().unwrap_or_default().to_string(),
                });
            }
            path.push(name.clone());
        }

        let mut working = template.clone();
        for parent_name in template.inherits() {
            let parent = (self.lookup)(parent_name).ok_or_else(|| {
                BuildError::MissingInheritance {
                    parent: parent_name.clone(),
                    child: template.name().unwrap_or("<unnamed>").to_string(),
                }
            })?;
            let parent_effective = self.resolve_on_path(&parent, path)?;
            working.merge_with(&parent_effective);
        }

        if own_name.is_some() {
            path.pop();
        }
        Ok(working)
    }
}
