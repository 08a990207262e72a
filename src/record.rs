//! Point-in-time entity snapshots
//!
//! A record is transient: built during capture and discarded once written,
//! or built during decode and discarded once the entity it describes has
//! been instantiated. It is never aliased back to the live entity.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bag::StateBag;

/// Snapshot of one live entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Unique identifier of the live instance, stable for its lifetime.
    pub identity: String,
    /// Identifier of the originating template; shared by every instance
    /// spawned from that template and never mutated after creation.
    pub template_identity: String,
    pub name: String,
    pub tag: String,
    pub layer: i32,
    pub position: Vec3,
    /// Euler angles, degrees.
    pub rotation_euler: Vec3,
    pub scale: Vec3,
    /// Behavior-specific restorable state.
    pub bag: StateBag,
}

/// Mint a fresh unique identity, used when re-keying a newly activated
/// instance away from its template's identity.
pub fn fresh_identity() -> String {
    Uuid::new_v4().to_string()
}
