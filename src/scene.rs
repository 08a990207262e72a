//! Live entity graph
//!
//! Single-threaded, cooperatively ticked graph of entities. All mutation
//! happens from the context that owns the [`Scene`]; there is no interior
//! locking. The deferred load queue is the one scheduling primitive the
//! crate needs: a single-shot task that fires exactly one tick after it was
//! enqueued, and is dropped if its entity died in the meantime.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use glam::Vec3;

use crate::bag::StateBag;
use crate::record::{EntityRecord, fresh_identity};

/// Handle to a live entity within one [`Scene`].
pub type EntityId = u32;

/// Callback invoked during capture to let behavior code write bag entries.
pub type SaveHandler = Box<dyn FnMut(&mut StateBag)>;

/// Callback invoked one tick after instantiation with the entity's record.
/// Receives the scene so cross-entity identity lookups resolve against the
/// fully rebuilt graph.
pub type LoadHandler = Rc<dyn Fn(&Scene, &EntityRecord)>;

/// A live, identifiable object in the graph.
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,

    /// Unique among all live instances. Equals `template_identity` from
    /// creation until the first tick re-keys it.
    pub identity: String,
    /// Identity of the originating template; empty for plain container
    /// entities. Never mutated after creation.
    pub template_identity: String,

    pub name: String,
    pub tag: String,
    pub layer: i32,
    pub position: Vec3,
    pub rotation_euler: Vec3,
    pub scale: Vec3,

    /// Inactive entities are skipped by capture.
    pub active: bool,
    /// Whether this entity participates in save/load at all.
    pub saveable: bool,

    /// Last captured or loaded state.
    pub bag: StateBag,

    pub(crate) save_handlers: Vec<SaveHandler>,
    pub(crate) load_handlers: Vec<LoadHandler>,
}

impl Entity {
    fn new(id: EntityId, name: &str) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            identity: String::new(),
            template_identity: String::new(),
            name: name.to_string(),
            tag: String::new(),
            layer: 0,
            position: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
            active: true,
            saveable: false,
            bag: StateBag::new(),
            save_handlers: Vec::new(),
            load_handlers: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("template_identity", &self.template_identity)
            .field("name", &self.name)
            .field("active", &self.active)
            .field("saveable", &self.saveable)
            .field("children", &self.children)
            .finish()
    }
}

struct DeferredLoad {
    entity: EntityId,
    record: EntityRecord,
    due_tick: u64,
}

/// The live graph: entity storage, a designated root container, and the
/// deferred load queue.
#[derive(Default)]
pub struct Scene {
    nodes: HashMap<EntityId, Entity>,
    root: Option<EntityId>,
    next_id: EntityId,
    tick_count: u64,
    deferred: Vec<DeferredLoad>,
}

impl Scene {
    /// Create an empty scene with no root container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the designated root container. Dynamic entities live under it.
    pub fn spawn_root(&mut self, name: &str) -> EntityId {
        let id = self.alloc();
        self.nodes.insert(id, Entity::new(id, name));
        self.root = Some(id);
        id
    }

    /// The designated root container, if one has been spawned.
    pub fn root(&self) -> Option<EntityId> {
        self.root
    }

    /// Spawn a plain entity under the given parent.
    pub fn spawn(&mut self, parent: EntityId, name: &str) -> EntityId {
        let id = self.alloc();
        let mut entity = Entity::new(id, name);
        entity.parent = Some(parent);
        self.nodes.insert(id, entity);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    fn alloc(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Destroy an entity and its whole subtree. Pending deferred loads for
    /// destroyed entities are dropped when they come due.
    pub fn despawn(&mut self, id: EntityId) {
        let parent = self.nodes.get(&id).and_then(|e| e.parent);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|&c| c != id);
            }
        }
        self.despawn_subtree(id);
        if self.root == Some(id) {
            self.root = None;
        }
    }

    fn despawn_subtree(&mut self, id: EntityId) {
        let Some(entity) = self.nodes.remove(&id) else {
            return;
        };
        for child in entity.children {
            self.despawn_subtree(child);
        }
    }

    /// Move an entity under a new parent, keeping its subtree intact.
    pub fn reparent(&mut self, id: EntityId, new_parent: EntityId) {
        if !self.nodes.contains_key(&id) || !self.nodes.contains_key(&new_parent) {
            return;
        }
        if let Some(old) = self.nodes.get(&id).and_then(|e| e.parent) {
            if let Some(p) = self.nodes.get_mut(&old) {
                p.children.retain(|&c| c != id);
            }
        }
        self.nodes.get_mut(&id).unwrap().parent = Some(new_parent);
        self.nodes.get_mut(&new_parent).unwrap().children.push(id);
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.nodes.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.nodes.get_mut(&id)
    }

    /// Child handles of the given entity, in attach order.
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.nodes.get(&id).map(|e| e.children()).unwrap_or(&[])
    }

    /// The identity of an entity, if it is live and participates in
    /// save/load.
    pub fn identity_of(&self, id: EntityId) -> Option<&str> {
        self.nodes
            .get(&id)
            .filter(|e| e.saveable)
            .map(|e| e.identity.as_str())
    }

    /// Register a save capture callback on an entity. Callbacks run in
    /// registration order.
    pub fn on_save(&mut self, id: EntityId, handler: impl FnMut(&mut StateBag) + 'static) {
        if let Some(entity) = self.nodes.get_mut(&id) {
            entity.save_handlers.push(Box::new(handler));
        }
    }

    /// Register a load callback on an entity; it fires one tick after the
    /// entity is rebuilt from a record.
    pub fn on_load(&mut self, id: EntityId, handler: impl Fn(&Scene, &EntityRecord) + 'static) {
        if let Some(entity) = self.nodes.get_mut(&id) {
            entity.load_handlers.push(Rc::new(handler));
        }
    }

    /// Enqueue the single-shot deferred load dispatch for an entity: due
    /// exactly one tick from now, dropped if the entity dies first.
    pub fn schedule_load(&mut self, id: EntityId, record: EntityRecord) {
        self.deferred.push(DeferredLoad {
            entity: id,
            record,
            due_tick: self.tick_count + 1,
        });
    }

    /// Number of ticks the scene has advanced.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Advance the scene by one cooperative tick.
    ///
    /// Re-keys newly activated instances away from their template identity
    /// (exactly once per instance), then dispatches every deferred load that
    /// came due. All instantiations from one load happen inside a single
    /// tick, so by the time their callbacks fire here the whole batch is
    /// live and cross-entity identity lookups resolve.
    pub fn tick(&mut self) {
        self.tick_count += 1;

        let ids: Vec<EntityId> = self.nodes.keys().copied().collect();
        for id in ids {
            let entity = self.nodes.get_mut(&id).expect("id collected above");
            if entity.active
                && entity.saveable
                && !entity.template_identity.is_empty()
                && entity.identity == entity.template_identity
            {
                entity.identity = fresh_identity();
            }
        }

        let now = self.tick_count;
        let (due, pending): (Vec<_>, Vec<_>) = self
            .deferred
            .drain(..)
            .partition(|task| task.due_tick <= now);
        self.deferred = pending;

        for task in due {
            let Some(entity) = self.nodes.get(&task.entity) else {
                // Owner destroyed before the task ran: cancelled.
                continue;
            };
            let handlers: Vec<LoadHandler> = entity.load_handlers.to_vec();
            for handler in handlers {
                handler(self, &task.record);
            }
        }
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("entities", &self.nodes.len())
            .field("root", &self.root)
            .field("tick_count", &self.tick_count)
            .field("pending_loads", &self.deferred.len())
            .finish()
    }
}
