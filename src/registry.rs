//! Template registry and identity lookup
//!
//! Templates are the blueprints entities spawn from. The registry is built
//! once from the full template set and queried during load to turn a
//! record's template identity back into something instantiable. The live
//! half of identity resolution is [`find_by_identity`], which scans a
//! subtree for the entity currently carrying a given identity.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use glam::Vec3;

use crate::error::{Result, SaveError};
use crate::scene::{EntityId, Scene};

/// Hook run on every freshly instantiated entity to wire up its behavior
/// handlers (save/load callbacks) before the instance goes live.
pub type AttachHook = Rc<dyn Fn(&mut Scene, EntityId)>;

/// Blueprint for spawning entities.
///
/// Carries the stable template identity plus the default metadata and
/// transform a new instance starts with.
#[derive(Clone)]
pub struct Template {
    pub identity: String,
    pub name: String,
    pub tag: String,
    pub layer: i32,
    pub position: Vec3,
    pub rotation_euler: Vec3,
    pub scale: Vec3,
    attach: Option<AttachHook>,
}

impl Template {
    pub fn new(identity: &str, name: &str) -> Self {
        Self {
            identity: identity.to_string(),
            name: name.to_string(),
            tag: String::new(),
            layer: 0,
            position: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
            attach: None,
        }
    }

    /// Set the hook that registers save/load handlers on each new instance.
    pub fn with_attach(mut self, hook: impl Fn(&mut Scene, EntityId) + 'static) -> Self {
        self.attach = Some(Rc::new(hook));
        self
    }

    /// Spawn a new live instance of this template under the given parent.
    ///
    /// The instance starts with `identity == template_identity`; the next
    /// scene tick re-keys it to a fresh unique value.
    pub fn instantiate(&self, scene: &mut Scene, parent: EntityId) -> EntityId {
        let id = scene.spawn(parent, &self.name);
        if let Some(entity) = scene.entity_mut(id) {
            entity.saveable = true;
            entity.identity = self.identity.clone();
            entity.template_identity = self.identity.clone();
            entity.tag = self.tag.clone();
            entity.layer = self.layer;
            entity.position = self.position;
            entity.rotation_euler = self.rotation_euler;
            entity.scale = self.scale;
        }
        if let Some(hook) = &self.attach {
            hook(scene, id);
        }
        id
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("identity", &self.identity)
            .field("name", &self.name)
            .field("has_attach", &self.attach.is_some())
            .finish()
    }
}

/// Maps template identity to template, built once from the available set.
#[derive(Debug)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Build the registry. Two templates sharing an identity is ambiguous
    /// and rejected outright.
    pub fn new(templates: impl IntoIterator<Item = Template>) -> Result<Self> {
        let mut map = HashMap::new();
        for template in templates {
            let identity = template.identity.clone();
            if map.insert(identity.clone(), template).is_some() {
                return Err(SaveError::DuplicateTemplate(identity));
            }
        }
        Ok(Self { templates: map })
    }

    /// Resolve a template identity to its template.
    pub fn resolve(&self, template_identity: &str) -> Option<&Template> {
        self.templates.get(template_identity)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Find the live entity under `root` (inclusive) whose current identity
/// matches. First match in depth-first order wins.
///
/// Behavior code uses this from load callbacks to resolve cross-entity
/// references stored in a bag.
pub fn find_by_identity(scene: &Scene, root: EntityId, identity: &str) -> Option<EntityId> {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if let Some(entity) = scene.entity(id) {
            if entity.saveable && entity.identity == identity {
                return Some(id);
            }
            stack.extend(entity.children().iter().rev().copied());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_identity_rejected() {
        let result = TemplateRegistry::new([
            Template::new("crate-template", "Crate"),
            Template::new("crate-template", "Other Crate"),
        ]);
        assert!(matches!(result, Err(SaveError::DuplicateTemplate(id)) if id == "crate-template"));
    }

    #[test]
    fn test_resolve() {
        let registry = TemplateRegistry::new([Template::new("door-template", "Door")]).unwrap();
        assert!(registry.resolve("door-template").is_some());
        assert!(registry.resolve("unknown-xyz").is_none());
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert!(TemplateRegistry::new([]).unwrap().is_empty());
    }

    #[test]
    fn test_instantiate_defaults() {
        let mut scene = Scene::new();
        let root = scene.spawn_root("root");

        let mut template = Template::new("door-template", "Door");
        template.tag = "doors".to_string();
        template.position = Vec3::new(1.0, 0.0, 2.0);
        let id = template.instantiate(&mut scene, root);

        let entity = scene.entity(id).unwrap();
        assert!(entity.saveable);
        assert_eq!(entity.identity, "door-template");
        assert_eq!(entity.template_identity, "door-template");
        assert_eq!(entity.tag, "doors");
        assert_eq!(entity.position, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(scene.children(root), &[id]);
    }

    #[test]
    fn test_attach_hook_runs_per_instance() {
        let mut scene = Scene::new();
        let root = scene.spawn_root("root");

        let template = Template::new("lamp-template", "Lamp").with_attach(|scene, id| {
            scene.on_save(id, |bag| bag.set("lit", true));
        });
        let a = template.instantiate(&mut scene, root);
        let b = template.instantiate(&mut scene, root);
        assert!(!scene.entity(a).unwrap().save_handlers.is_empty());
        assert!(!scene.entity(b).unwrap().save_handlers.is_empty());
    }

    #[test]
    fn test_find_by_identity_scoped_to_subtree() {
        let mut scene = Scene::new();
        let root = scene.spawn_root("root");
        let template = Template::new("key-template", "Key");

        let inside = template.instantiate(&mut scene, root);
        let other_root = scene.spawn_root("other");
        let outside = template.instantiate(&mut scene, other_root);

        scene.tick(); // re-key both instances
        let inside_identity = scene.entity(inside).unwrap().identity.clone();
        let outside_identity = scene.entity(outside).unwrap().identity.clone();

        assert_eq!(
            find_by_identity(&scene, root, &inside_identity),
            Some(inside)
        );
        assert_eq!(find_by_identity(&scene, root, &outside_identity), None);
    }
}
