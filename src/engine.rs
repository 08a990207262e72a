//! Reconciliation engine
//!
//! Orchestrates the two whole-graph operations: walking the live graph into
//! an ordered record sequence on save, and destroying/rebuilding the graph
//! from a document on load. Record order is child-before-parent so a
//! rebuild never instantiates a parent's record ahead of records the
//! parent's behavior may depend on, and so the sequence is deterministic
//! for a fixed traversal order.

use std::fs;
use std::path::Path;

use crate::bag::StateBag;
use crate::codec;
use crate::error::{Result, SaveError};
use crate::record::EntityRecord;
use crate::registry::TemplateRegistry;
use crate::scene::{EntityId, Scene};

/// Saves and loads the dynamic population under a scene's root container.
#[derive(Debug)]
pub struct SaveEngine {
    registry: TemplateRegistry,
}

impl SaveEngine {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Save the scene's dynamic entities to a document at `path`,
    /// overwriting any existing content.
    ///
    /// The whole sequence is serialized before any I/O happens, so a failed
    /// write never leaves a partially valid file behind.
    pub fn save(&self, scene: &mut Scene, path: &Path) -> Result<()> {
        let records = self.capture(scene)?;
        let text = codec::encode_records(&records)?;
        fs::write(path, text)?;
        log::info!("saved {} entities to {}", records.len(), path.display());
        Ok(())
    }

    /// Destroy the current dynamic population and rebuild it from the
    /// document at `path`.
    ///
    /// Once the old population is destroyed, any remaining failure (a
    /// malformed document, an unknown template) surfaces loudly and leaves
    /// the graph partially rebuilt; nothing is silently skipped.
    pub fn load(&self, scene: &mut Scene, path: &Path) -> Result<()> {
        let root = self.require_root(scene)?;
        if !path.exists() {
            log::error!("save file does not exist: {}", path.display());
            return Err(SaveError::MissingSaveFile(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;

        // Point of no return: the old population is gone.
        for child in scene.children(root).to_vec() {
            if scene.entity(child).is_some_and(|e| e.saveable) {
                scene.despawn(child);
            }
        }

        let records = codec::decode_records(&text)?;
        let count = records.len();
        self.apply(scene, records)?;
        log::info!("loaded {count} entities from {}", path.display());
        Ok(())
    }

    /// Walk the live graph and produce the ordered record sequence.
    ///
    /// Direct children of the root are visited in attach order; within each
    /// subtree, an entity's children are captured before the entity itself.
    pub fn capture(&self, scene: &mut Scene) -> Result<Vec<EntityRecord>> {
        let root = self.require_root(scene)?;
        let mut records = Vec::new();
        for child in scene.children(root).to_vec() {
            capture_subtree(scene, child, &mut records);
        }
        Ok(records)
    }

    /// Instantiate every record, in document order, under the root.
    ///
    /// Each entity's load callbacks are scheduled for the next tick, so by
    /// the time any of them runs the entire batch is live.
    pub fn apply(&self, scene: &mut Scene, records: Vec<EntityRecord>) -> Result<()> {
        let root = self.require_root(scene)?;
        for record in records {
            let template = self
                .registry
                .resolve(&record.template_identity)
                .ok_or_else(|| SaveError::MissingTemplate(record.template_identity.clone()))?;
            let id = template.instantiate(scene, root);

            let entity = scene.entity_mut(id).expect("entity just instantiated");
            entity.identity = record.identity.clone();
            entity.name = record.name.clone();
            entity.tag = record.tag.clone();
            entity.layer = record.layer;
            entity.position = record.position;
            entity.rotation_euler = record.rotation_euler;
            entity.scale = record.scale;
            entity.bag = record.bag.clone();

            scene.schedule_load(id, record);
        }
        Ok(())
    }

    fn require_root(&self, scene: &Scene) -> Result<EntityId> {
        scene.root().ok_or_else(|| {
            log::error!("no root save container designated in the scene");
            SaveError::MissingRootContainer
        })
    }
}

/// Depth-first capture: children first, then the entity's own record.
///
/// Only saveable, active entities belong to the dynamic population: a
/// non-saveable or inactive entity is skipped together with its whole
/// subtree. This is the same boundary load's destructive clear uses, so
/// save and load always agree on which entities they own.
fn capture_subtree(scene: &mut Scene, id: EntityId, out: &mut Vec<EntityRecord>) {
    let Some(entity) = scene.entity(id) else {
        return;
    };
    if !entity.saveable || !entity.active {
        return;
    }

    for child in scene.children(id).to_vec() {
        capture_subtree(scene, child, out);
    }
    out.push(capture_entity(scene, id));
}

/// Snapshot one entity: fresh bag, save handlers in registration order,
/// then metadata and transform from current live state.
fn capture_entity(scene: &mut Scene, id: EntityId) -> EntityRecord {
    let entity = scene.entity_mut(id).expect("checked live by caller");

    let mut bag = StateBag::new();
    for handler in &mut entity.save_handlers {
        handler(&mut bag);
    }
    entity.bag = bag.clone();

    EntityRecord {
        identity: entity.identity.clone(),
        template_identity: entity.template_identity.clone(),
        name: entity.name.clone(),
        tag: entity.tag.clone(),
        layer: entity.layer,
        position: entity.position,
        rotation_euler: entity.rotation_euler,
        scale: entity.scale,
        bag,
    }
}
