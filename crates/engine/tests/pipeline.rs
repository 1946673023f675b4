//! End-to-end pipeline tests: template files on disk, loaded through the
//! repository, materialized by the entity factory into the in-memory store.

use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use entforge_domain::ScalarValue;
use entforge_engine::{
    ComponentFactory, ComponentSchema, ComponentTypeRegistry, ComponentValue, EntityFactory,
    FieldSchema, InMemoryEntityStore, RegistryBuilder, TemplateRepository,
};

fn game_registry() -> ComponentTypeRegistry {
    let mut builder = RegistryBuilder::new();
    builder
        .register(ComponentSchema::structured(
            "health",
            vec![
                FieldSchema::int("max"),
                FieldSchema::int("current"),
                FieldSchema::float("regen"),
            ],
        ))
        .expect("register health");
    builder
        .register(ComponentSchema::value("attack", "dice"))
        .expect("register attack");
    builder
        .register(ComponentSchema::value("on-death", "script"))
        .expect("register on-death");
    builder
        .register(ComponentSchema::value("light", "int"))
        .expect("register light");
    builder
        .register(ComponentSchema::structured(
            "loot",
            vec![FieldSchema::dice("gold"), FieldSchema::bool("cursed")],
        ))
        .expect("register loot");
    builder
        .register(
            ComponentSchema::structured("dungeon-clock", vec![FieldSchema::int("turn")]).shared(),
        )
        .expect("register dungeon-clock");
    builder.build()
}

struct Harness {
    _dir: tempfile::TempDir,
    repository: Arc<TemplateRepository>,
    registry: Arc<ComponentTypeRegistry>,
    store: Arc<InMemoryEntityStore>,
    factory: EntityFactory<InMemoryEntityStore>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn harness(files: &[(&str, &str)]) -> Harness {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, text) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, text).expect("write template");
    }

    let repository = Arc::new(TemplateRepository::new());
    repository.load_dir(dir.path()).expect("load templates");

    let registry = Arc::new(game_registry());
    let store = Arc::new(InMemoryEntityStore::new());
    let factory = EntityFactory::new(
        Arc::clone(&repository),
        Arc::clone(&registry),
        Arc::clone(&store),
    );
    Harness {
        _dir: dir,
        repository,
        registry,
        store,
        factory,
    }
}

#[test]
fn creates_an_entity_with_inherited_and_converted_components() {
    let h = harness(&[
        (
            "creature.yaml",
            r#"
tags:
  - creature
components:
  health:
    max: 50
    current: 50
  on-death: "drop(inventory)"
"#,
        ),
        (
            "goblin.yaml",
            r#"
tags:
  - monster
inherits:
  - creature
components:
  health:
    max: 10
    current: 10
  attack: 1d6+1
"#,
        ),
    ]);

    let goblin = h.factory.create("goblin").expect("create goblin");

    let (health_id, _) = h.registry.resolve("health").expect("health schema");
    let health = h.store.component(goblin, health_id).expect("health");
    // The goblin's own health wins over the inherited one.
    assert_eq!(health.field("max").and_then(|v| v.as_int()), Some(10));
    // Absent field falls back to its default.
    assert_eq!(health.field("regen").and_then(|v| v.as_float()), Some(0.0));

    let (attack_id, _) = h.registry.resolve("attack").expect("attack schema");
    let attack = h.store.component(goblin, attack_id).expect("attack");
    assert_eq!(
        attack.as_dice().map(ToString::to_string),
        Some("1d6+1".to_string())
    );

    // The inherited script component came along.
    let (script_id, _) = h.registry.resolve("on-death").expect("script schema");
    let script = h.store.component(goblin, script_id).expect("script");
    assert_eq!(
        script.as_script().map(|s| s.source().to_string()),
        Some("drop(inventory)".to_string())
    );
}

#[test]
fn ref_and_inline_embedded_templates_become_children() {
    let h = harness(&[
        ("torch.yaml", "components:\n  light: 3\n"),
        (
            "lantern-bearer.yaml",
            r#"
components:
  health:
    max: 8
$ref: torch.yaml
familiar:
  components:
    light: 1
"#,
        ),
    ]);

    let bearer = h.factory.create("lantern-bearer").expect("create");
    let children = h.store.children(bearer);
    assert_eq!(children.len(), 2);

    let (light_id, _) = h.registry.resolve("light").expect("light schema");
    let lights: Vec<i64> = children
        .iter()
        .filter_map(|child| h.store.component(*child, light_id))
        .filter_map(|v| v.as_int())
        .collect();
    assert_eq!(lights, vec![3, 1]);
}

#[test]
fn merge_ref_composes_templates_with_local_precedence() {
    let h = harness(&[
        (
            "base-loot.yaml",
            "components:\n  loot:\n    gold: 2d8\n    cursed: false\n",
        ),
        (
            "mimic.yaml",
            "$merge-ref: base-loot.yaml\ncomponents:\n  health:\n    max: 20\n",
        ),
    ]);

    let mimic = h.factory.create("mimic").expect("create");
    let (loot_id, _) = h.registry.resolve("loot").expect("loot schema");
    let loot = h.store.component(mimic, loot_id).expect("loot");
    assert_eq!(
        loot.field("gold").and_then(|v| v.as_dice()).map(ToString::to_string),
        Some("2d8".to_string())
    );
}

#[test]
fn shared_component_instance_is_visible_across_entities() {
    let h = harness(&[
        ("scout.yaml", "components:\n  dungeon-clock:\n    turn: 1\n"),
        ("guard.yaml", "components:\n  dungeon-clock:\n    turn: 9\n"),
    ]);

    let scout = h.factory.create("scout").expect("create scout");
    let guard = h.factory.create("guard").expect("create guard");

    let (clock_id, _) = h.registry.resolve("dungeon-clock").expect("clock schema");
    let scout_slot = h
        .store
        .shared_component_of(scout, clock_id)
        .expect("scout references the clock");
    let guard_slot = h
        .store
        .shared_component_of(guard, clock_id)
        .expect("guard references the clock");
    assert!(Arc::ptr_eq(&scout_slot, &guard_slot));

    // Mutating through one entity is visible through the other.
    *scout_slot.write().expect("lock") =
        ComponentValue::Struct(vec![("turn".to_string(), ComponentValue::Int(2))]);
    assert_eq!(
        guard_slot
            .read()
            .expect("lock")
            .field("turn")
            .and_then(|v| v.as_int()),
        Some(2)
    );
}

#[test]
fn custom_conversions_apply_to_template_payloads() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("warden.yaml"),
        "components:\n  alarm: \"75%\"\n",
    )
    .expect("write template");

    let repository = Arc::new(TemplateRepository::new());
    repository.load_dir(dir.path()).expect("load templates");

    let mut builder = RegistryBuilder::new();
    builder
        .register(ComponentSchema::value("alarm", "percent"))
        .expect("register alarm");
    let registry = Arc::new(builder.build());

    let mut components = ComponentFactory::new();
    components
        .conversions_mut()
        .register("percent", |scalar: &ScalarValue| match scalar {
            ScalarValue::String(s) => s
                .trim_end_matches('%')
                .parse::<f64>()
                .map(|v| ComponentValue::Float(v / 100.0))
                .map_err(|e| e.to_string()),
            other => Err(format!("{} is not a percentage", other.type_name())),
        });

    let store = Arc::new(InMemoryEntityStore::new());
    let factory =
        EntityFactory::with_component_factory(repository, registry.clone(), store.clone(), components);

    let warden = factory.create("warden").expect("create warden");
    let (alarm_id, _) = registry.resolve("alarm").expect("alarm schema");
    assert_eq!(
        store.component(warden, alarm_id),
        Some(ComponentValue::Float(0.75))
    );
}

#[test]
fn failed_construction_attaches_nothing() {
    let h = harness(&[(
        "broken.yaml",
        "components:\n  health:\n    max: banana\n",
    )]);

    let err = h.factory.create("broken");
    assert!(err.is_err());
    assert_eq!(h.store.entity_count(), 0);
}

#[test]
fn disposing_a_parent_cascades_to_template_built_children() {
    let h = harness(&[
        ("torch.yaml", "components:\n  light: 3\n"),
        (
            "bearer.yaml",
            "components:\n  health:\n    max: 8\n$ref: torch.yaml\n",
        ),
    ]);

    let bearer = h.factory.create("bearer").expect("create");
    let children = h.store.children(bearer);
    assert_eq!(children.len(), 1);

    h.store.dispose(bearer);
    assert!(!h.store.is_alive(bearer));
    assert!(!h.store.is_alive(children[0]));
}

#[test]
fn repository_queries_by_tags() {
    let h = harness(&[
        (
            "monsters/goblin.yaml",
            "tags:\n  - monster\n  - green\ncomponents:\n  light: 1\n",
        ),
        (
            "monsters/slime.yaml",
            "tags:\n  - monster\ncomponents:\n  light: 1\n",
        ),
        ("props/torch.yaml", "components:\n  light: 3\n"),
    ]);

    assert_eq!(h.repository.len(), 3);
    assert_eq!(h.repository.get_by_tags(&["monster"]).len(), 2);
    let green = h.repository.get_by_tags(&["monster", "green"]);
    assert_eq!(green.len(), 1);
    assert_eq!(green[0].name(), Some("goblin"));
}
