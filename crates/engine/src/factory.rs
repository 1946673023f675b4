//! Entity factory.
//!
//! Orchestrates the whole pipeline: resolve the effective template,
//! construct every component instance, dispatch them to the storage engine,
//! and recursively build embedded templates as child entities.
//!
//! Construction is two-phase. The planning phase is pure: inheritance
//! resolution, schema lookups, shape checks, and component construction all
//! happen against buffered data, so any failure aborts before the store has
//! seen a single call. The commit phase then creates entities, attaches the
//! buffered components, and wires parent/child links.

use std::sync::Arc;

use tracing::debug;

use entforge_domain::{EntityTemplate, TemplateValue};

use crate::component::ComponentValue;
use crate::component_factory::ComponentFactory;
use crate::error::BuildError;
use crate::graph::{TemplateGraphIterator, TraversalOrder};
use crate::registry::{ComponentTypeId, ComponentTypeRegistry, SchemaShape};
use crate::repository::TemplateRepository;
use crate::resolver::InheritanceResolver;
use crate::store::{EntityId, EntityStore};

/// A fully constructed component, buffered until commit.
struct PlannedComponent {
    type_id: ComponentTypeId,
    shared: bool,
    value: ComponentValue,
}

/// The buffered construction plan for one entity and its children.
struct EntityPlan {
    name: String,
    components: Vec<PlannedComponent>,
    children: Vec<EntityPlan>,
}

/// Constructs entities from templates against a storage engine.
pub struct EntityFactory<S: EntityStore> {
    repository: Arc<TemplateRepository>,
    registry: Arc<ComponentTypeRegistry>,
    components: ComponentFactory,
    store: Arc<S>,
}

impl<S: EntityStore> EntityFactory<S> {
    pub fn new(
        repository: Arc<TemplateRepository>,
        registry: Arc<ComponentTypeRegistry>,
        store: Arc<S>,
    ) -> Self {
        Self {
            repository,
            registry,
            components: ComponentFactory::new(),
            store,
        }
    }

    /// Uses a caller-configured component factory (e.g. with custom scalar
    /// conversions registered).
    pub fn with_component_factory(
        repository: Arc<TemplateRepository>,
        registry: Arc<ComponentTypeRegistry>,
        store: Arc<S>,
        components: ComponentFactory,
    ) -> Self {
        Self {
            repository,
            registry,
            components,
            store,
        }
    }

    /// Whether a template with this name exists in the repository.
    pub fn has_template(&self, name: &str) -> bool {
        self.repository.contains(name)
    }

    /// Creates an entity from the named template.
    pub fn create(&self, name: &str) -> Result<EntityId, BuildError> {
        let template = self
            .repository
            .get(name)
            .ok_or_else(|| BuildError::UnknownTemplate {
                name: name.to_string(),
            })?;
        self.create_from_template(&template)
    }

    /// Creates an entity from an already-loaded template.
    pub fn create_from_template(&self, template: &EntityTemplate) -> Result<EntityId, BuildError> {
        // Pre-commit guard over the declared embedded tree: a looping graph
        // fails here, before the store sees any side effect.
        TemplateGraphIterator::new(template, TraversalOrder::Bfs).traverse(|_| {})?;

        let plan = self.plan_template(template, &mut Vec::new())?;
        Ok(self.commit(&plan))
    }

    fn plan_template(
        &self,
        template: &EntityTemplate,
        planning_path: &mut Vec<String>,
    ) -> Result<EntityPlan, BuildError> {
        let resolver = InheritanceResolver::new(|name: &str| self.repository.get(name));
        let effective = resolver.effective_template(template)?;
        let template_name = effective.name().unwrap_or("<unnamed>").to_string();

        // Inheritance can merge new embedded templates in; guard the plan
        // recursion itself so such a graph cannot recurse forever.
        let path_key = template_name.to_ascii_lowercase();
        if planning_path.contains(&path_key) {
            return Err(BuildError::CyclicTemplateGraph {
                name: template_name,
            });
        }
        planning_path.push(path_key);

        let mut components = Vec::with_capacity(effective.components().len());
        for (component_name, payload) in effective.components() {
            components.push(self.plan_component(&template_name, component_name, payload)?);
        }

        let mut children = Vec::with_capacity(effective.embedded().len());
        for embedded in effective.embedded() {
            children.push(self.plan_template(embedded, planning_path)?);
        }

        planning_path.pop();
        Ok(EntityPlan {
            name: template_name,
            components,
            children,
        })
    }

    fn plan_component(
        &self,
        template_name: &str,
        component_name: &str,
        payload: &TemplateValue,
    ) -> Result<PlannedComponent, BuildError> {
        let (type_id, schema) = self.registry.resolve(component_name).ok_or_else(|| {
            BuildError::UnknownComponent {
                template: template_name.to_string(),
                component: component_name.to_string(),
            }
        })?;

        // Consistency check: value schemas take scalars, structured schemas
        // take mappings.
        let value = match (schema.shape(), payload) {
            (SchemaShape::Value { .. }, TemplateValue::Scalar(_)) => self
                .components
                .create_value(schema, payload)
                .map_err(|source| BuildError::Component {
                    template: template_name.to_string(),
                    component: component_name.to_string(),
                    source,
                })?,
            (SchemaShape::Structured { .. }, TemplateValue::Mapping(_)) => self
                .components
                .create_structured(schema, payload)
                .map_err(|source| BuildError::Component {
                    template: template_name.to_string(),
                    component: component_name.to_string(),
                    source,
                })?,
            (shape, payload) => {
                let expected = match shape {
                    SchemaShape::Value { .. } => "scalar",
                    SchemaShape::Structured { .. } => "mapping",
                };
                return Err(BuildError::ShapeMismatch {
                    template: template_name.to_string(),
                    component: component_name.to_string(),
                    expected,
                    actual: payload_shape(payload),
                });
            }
        };

        Ok(PlannedComponent {
            type_id,
            shared: schema.is_shared(),
            value,
        })
    }

    fn commit(&self, plan: &EntityPlan) -> EntityId {
        let entity = self.store.create_entity();

        for component in &plan.components {
            if component.shared {
                // Shared components populate the process-wide slot once;
                // every declaring entity references that slot instead of
                // owning a copy.
                if !self.store.has_shared(component.type_id) {
                    self.store
                        .set_shared(component.type_id, component.value.clone());
                }
                self.store.attach_shared_reference(entity, component.type_id);
            } else {
                self.store
                    .attach(entity, component.type_id, component.value.clone());
            }
        }

        for child_plan in &plan.children {
            let child = self.commit(child_plan);
            self.store.set_parent(entity, child);
        }

        debug!(template = plan.name, %entity, "entity created");
        entity
    }
}

fn payload_shape(payload: &TemplateValue) -> &'static str {
    match payload {
        TemplateValue::Scalar(_) => "scalar",
        TemplateValue::Sequence(_) => "sequence",
        TemplateValue::Mapping(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SourceFormat;
    use crate::registry::{ComponentSchema, FieldSchema, RegistryBuilder};
    use crate::store::{InMemoryEntityStore, MockEntityStore};

    fn standard_registry() -> ComponentTypeRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .register(ComponentSchema::structured(
                "health",
                vec![FieldSchema::int("max"), FieldSchema::int("current")],
            ))
            .expect("register health");
        builder
            .register(ComponentSchema::value("attack", "dice"))
            .expect("register attack");
        builder
            .register(ComponentSchema::value("light", "int"))
            .expect("register light");
        builder
            .register(
                ComponentSchema::structured("weather", vec![FieldSchema::string("current")])
                    .shared(),
            )
            .expect("register weather");
        builder.build()
    }

    fn factory_over(
        templates: &[(&str, &str)],
    ) -> (EntityFactory<InMemoryEntityStore>, Arc<InMemoryEntityStore>) {
        let repository = Arc::new(TemplateRepository::new());
        for (name, text) in templates {
            repository
                .load_str(name, text, SourceFormat::Yaml)
                .expect("template should load");
        }
        let store = Arc::new(InMemoryEntityStore::new());
        let factory = EntityFactory::new(
            repository,
            Arc::new(standard_registry()),
            Arc::clone(&store),
        );
        (factory, store)
    }

    #[test]
    fn test_create_attaches_constructed_components() {
        let (factory, store) = factory_over(&[(
            "goblin",
            "components:\n  health:\n    max: 10\n    current: 10\n  attack: 1d6\n",
        )]);

        let entity = factory.create("goblin").expect("create");

        let registry = standard_registry();
        let (health_id, _) = registry.resolve("health").expect("health");
        let (attack_id, _) = registry.resolve("attack").expect("attack");

        let health = store.component(entity, health_id).expect("health attached");
        assert_eq!(health.field("max").and_then(|v| v.as_int()), Some(10));

        let attack = store.component(entity, attack_id).expect("attack attached");
        assert_eq!(attack.as_dice().map(ToString::to_string), Some("1d6".into()));
    }

    #[test]
    fn test_create_unknown_template_name() {
        let (factory, _) = factory_over(&[]);
        let err = factory.create("ghost").unwrap_err();
        assert!(matches!(err, BuildError::UnknownTemplate { name } if name == "ghost"));
    }

    #[test]
    fn test_unknown_component_leaves_store_untouched() {
        let repository = Arc::new(TemplateRepository::new());
        repository
            .load_str(
                "goblin",
                "components:\n  health:\n    max: 10\n  mystery: 1\n",
                SourceFormat::Yaml,
            )
            .expect("load");
        // A mock with no expectations panics on any call: planning must
        // fail before the store is touched.
        let store = Arc::new(MockEntityStore::new());
        let factory = EntityFactory::new(repository, Arc::new(standard_registry()), store);

        let err = factory.create("goblin").unwrap_err();
        assert!(
            matches!(err, BuildError::UnknownComponent { component, .. } if component == "mystery")
        );
    }

    #[test]
    fn test_conversion_failure_leaves_store_untouched() {
        let repository = Arc::new(TemplateRepository::new());
        repository
            .load_str(
                "goblin",
                "components:\n  attack: not-dice\n",
                SourceFormat::Yaml,
            )
            .expect("load");
        let store = Arc::new(MockEntityStore::new());
        let factory = EntityFactory::new(repository, Arc::new(standard_registry()), store);

        let err = factory.create("goblin").unwrap_err();
        assert!(matches!(err, BuildError::Component { .. }));
    }

    #[test]
    fn test_scalar_payload_for_structured_schema_is_shape_mismatch() {
        let (factory, _) = factory_over(&[("goblin", "components:\n  health: 10\n")]);
        let err = factory.create("goblin").unwrap_err();
        match err {
            BuildError::ShapeMismatch {
                component,
                expected,
                actual,
                ..
            } => {
                assert_eq!(component, "health");
                assert_eq!(expected, "mapping");
                assert_eq!(actual, "scalar");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mapping_payload_for_value_schema_is_shape_mismatch() {
        let (factory, _) = factory_over(&[("goblin", "components:\n  attack:\n    sides: 6\n")]);
        let err = factory.create("goblin").unwrap_err();
        assert!(
            matches!(err, BuildError::ShapeMismatch { component, expected, .. } if component == "attack" && expected == "scalar")
        );
    }

    #[test]
    fn test_inherited_components_reach_the_entity() {
        let (factory, store) = factory_over(&[
            ("creature", "components:\n  health:\n    max: 50\n"),
            ("goblin", "inherits:\n  - creature\ncomponents:\n  attack: 1d6\n"),
        ]);

        let entity = factory.create("goblin").expect("create");
        assert_eq!(store.component_count(entity), 2);
    }

    #[test]
    fn test_embedded_templates_become_child_entities() {
        let (factory, store) = factory_over(&[(
            "lantern-bearer",
            r#"
components:
  health:
    max: 10
torch:
  components:
    light: 3
  spark:
    components:
      light: 1
"#,
        )]);

        let root = factory.create("lantern-bearer").expect("create");

        let children = store.children(root);
        assert_eq!(children.len(), 1);
        let torch = children[0];
        let grandchildren = store.children(torch);
        assert_eq!(grandchildren.len(), 1);

        let registry = standard_registry();
        let (light_id, _) = registry.resolve("light").expect("light");
        assert_eq!(
            store.component(torch, light_id),
            Some(ComponentValue::Int(3))
        );
        assert_eq!(
            store.component(grandchildren[0], light_id),
            Some(ComponentValue::Int(1))
        );
    }

    #[test]
    fn test_shared_component_is_attached_once_and_referenced() {
        let (factory, store) = factory_over(&[
            ("scout", "components:\n  weather:\n    current: rainy\n"),
            ("guard", "components:\n  weather:\n    current: sunny\n"),
        ]);

        let scout = factory.create("scout").expect("create scout");
        let guard = factory.create("guard").expect("create guard");

        let registry = standard_registry();
        let (weather_id, _) = registry.resolve("weather").expect("weather");

        let slot_a = store
            .shared_component_of(scout, weather_id)
            .expect("scout slot");
        let slot_b = store
            .shared_component_of(guard, weather_id)
            .expect("guard slot");
        assert!(Arc::ptr_eq(&slot_a, &slot_b));

        // First writer populated the slot; the second entity referenced it
        // without re-attaching a fresh instance.
        assert_eq!(
            slot_b
                .read()
                .expect("lock")
                .field("current")
                .and_then(|v| v.as_str())
                .map(ToString::to_string),
            Some("rainy".to_string())
        );
    }

    #[test]
    fn test_cyclic_inheritance_through_embedded_templates_fails() {
        let (factory, _) = factory_over(&[
            (
                "haunted-armor",
                "components:\n  light: 1\nghost:\n  inherits:\n    - phantom\n",
            ),
            ("phantom", "haunted-armor:\n  components:\n    light: 2\n"),
        ]);

        let err = factory.create("haunted-armor").unwrap_err();
        assert!(matches!(err, BuildError::CyclicTemplateGraph { .. }));
    }
}
