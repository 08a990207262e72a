//! Savegraph - snapshot and restore a dynamic scene graph
//!
//! Persists the population of template-spawned entities under a designated
//! root container to a document, and rebuilds an equivalent population from
//! that document later.
//!
//! Core modules:
//! - `scene`: Live entity graph with cooperative tick scheduling
//! - `bag` / `value`: Schema-less per-entity state with typed accessors
//! - `codec`: Self-describing document format, exact value shape preserved
//! - `record`: Transient per-entity snapshots
//! - `registry`: Template lookup and live identity resolution
//! - `engine`: Whole-graph save/load orchestration
//!
//! Saving walks the graph depth-first, children before parents, letting
//! each entity's save callbacks fill a fresh state bag. Loading destroys
//! the current population, instantiates every record in document order,
//! and defers load callbacks by one tick so cross-entity references always
//! resolve against the fully rebuilt graph.

pub mod bag;
pub mod codec;
pub mod engine;
pub mod error;
pub mod record;
pub mod registry;
pub mod scene;
pub mod value;

pub use bag::StateBag;
pub use engine::SaveEngine;
pub use error::{Result, SaveError};
pub use record::{EntityRecord, fresh_identity};
pub use registry::{Template, TemplateRegistry, find_by_identity};
pub use scene::{Entity, EntityId, Scene};
pub use value::Value;
