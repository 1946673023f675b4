//! In-memory reference implementation of the [`EntityStore`] port.
//!
//! Shared components live in process-wide slots behind `Arc<RwLock<..>>`;
//! every entity that declares one holds a reference to the same slot, so a
//! mutation through one entity is visible through every other. Disposal
//! cascades through the parent/child tree, skipping entities already
//! disposed.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tracing::debug;

use crate::component::ComponentValue;
use crate::registry::ComponentTypeId;
use crate::store::{EntityId, EntityStore};

/// A process-wide shared component slot.
pub type SharedSlot = Arc<RwLock<ComponentValue>>;

#[derive(Debug, Default)]
struct EntityRecord {
    components: HashMap<ComponentTypeId, ComponentValue>,
    shared_refs: Vec<ComponentTypeId>,
    children: Vec<EntityId>,
    disposed: bool,
}

/// Thread-safe in-memory entity/component store.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    next_id: AtomicU64,
    entities: DashMap<EntityId, EntityRecord>,
    shared: DashMap<ComponentTypeId, SharedSlot>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owned component lookup (not shared references).
    pub fn component(&self, entity: EntityId, type_id: ComponentTypeId) -> Option<ComponentValue> {
        self.entities
            .get(&entity)
            .and_then(|record| record.components.get(&type_id).cloned())
    }

    /// The shared slot an entity references, if it references one for this
    /// component type.
    pub fn shared_component_of(
        &self,
        entity: EntityId,
        type_id: ComponentTypeId,
    ) -> Option<SharedSlot> {
        let record = self.entities.get(&entity)?;
        if !record.shared_refs.contains(&type_id) {
            return None;
        }
        self.shared.get(&type_id).map(|slot| Arc::clone(slot.value()))
    }

    pub fn has_component(&self, entity: EntityId, type_id: ComponentTypeId) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|record| {
                record.components.contains_key(&type_id) || record.shared_refs.contains(&type_id)
            })
    }

    /// Number of components (owned + shared references) on an entity.
    pub fn component_count(&self, entity: EntityId) -> usize {
        self.entities
            .get(&entity)
            .map_or(0, |record| record.components.len() + record.shared_refs.len())
    }

    pub fn children(&self, entity: EntityId) -> Vec<EntityId> {
        self.entities
            .get(&entity)
            .map(|record| record.children.clone())
            .unwrap_or_default()
    }

    /// All descendants of an entity in level order, the root excluded.
    /// A visited set keeps a malformed parent graph from looping.
    pub fn descendants(&self, entity: EntityId) -> Vec<EntityId> {
        let mut visited = HashSet::from([entity]);
        let mut queue = VecDeque::from([entity]);
        let mut found = Vec::new();
        while let Some(current) = queue.pop_front() {
            for child in self.children(current) {
                if visited.insert(child) {
                    found.push(child);
                    queue.push_back(child);
                }
            }
        }
        found
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|record| !record.disposed)
    }

    /// Disposes an entity and, transitively, all of its children.
    /// Already-disposed entities are skipped.
    pub fn dispose(&self, entity: EntityId) {
        let children = {
            let Some(mut record) = self.entities.get_mut(&entity) else {
                return;
            };
            if record.disposed {
                return;
            }
            record.disposed = true;
            // Guard dropped before recursing into children.
            std::mem::take(&mut record.children)
        };
        debug!(%entity, "disposing entity");
        for child in children {
            self.dispose(child);
        }
    }
}

impl EntityStore for InMemoryEntityStore {
    fn create_entity(&self) -> EntityId {
        let id = EntityId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entities.insert(id, EntityRecord::default());
        id
    }

    fn attach(&self, entity: EntityId, type_id: ComponentTypeId, component: ComponentValue) {
        if let Some(mut record) = self.entities.get_mut(&entity) {
            record.components.insert(type_id, component);
        }
    }

    fn has_shared(&self, type_id: ComponentTypeId) -> bool {
        self.shared.contains_key(&type_id)
    }

    fn set_shared(&self, type_id: ComponentTypeId, component: ComponentValue) {
        self.shared
            .insert(type_id, Arc::new(RwLock::new(component)));
    }

    fn attach_shared_reference(&self, entity: EntityId, type_id: ComponentTypeId) {
        if let Some(mut record) = self.entities.get_mut(&entity) {
            if !record.shared_refs.contains(&type_id) {
                record.shared_refs.push(type_id);
            }
        }
    }

    fn set_parent(&self, parent: EntityId, child: EntityId) {
        if let Some(mut record) = self.entities.get_mut(&parent) {
            if !record.children.contains(&child) {
                record.children.push(child);
            }
        }
    }
}
