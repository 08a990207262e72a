//! Save/load errors

use std::path::PathBuf;

use thiserror::Error;

/// Save/load result type
pub type Result<T> = std::result::Result<T, SaveError>;

/// Errors raised by save/load operations and bag accessors
#[derive(Debug, Error)]
pub enum SaveError {
    /// No designated root container exists in the scene.
    #[error("no root save container designated in the scene")]
    MissingRootContainer,

    /// Load was requested against a path that does not exist.
    #[error("save file does not exist: {0}")]
    MissingSaveFile(PathBuf),

    /// A record's template identity has no match in the registry.
    /// Fatal during load: the previous graph has already been cleared.
    #[error("template not found: {0}")]
    MissingTemplate(String),

    /// Two templates were registered under the same identity.
    #[error("duplicate template identity: {0}")]
    DuplicateTemplate(String),

    /// A bag accessor was called with a key that is not present.
    #[error("key not found in state bag: {0}")]
    KeyNotFound(String),

    /// A stored value could not be coerced to the requested type.
    #[error("cannot convert {found} value to {requested} for key {key}")]
    TypeConversion {
        key: String,
        found: &'static str,
        requested: &'static str,
    },

    /// The document could not be parsed; the whole load aborts.
    #[error("malformed save document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// File read/write failure.
    #[error("save file i/o error: {0}")]
    Io(#[from] std::io::Error),
}
