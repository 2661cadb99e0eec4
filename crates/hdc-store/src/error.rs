use std::path::PathBuf;

/// Errors from storage group operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested leaf or group does not exist.
    #[error("node not found: {group}/{name}")]
    NotFound { group: String, name: String },

    /// The node name is not acceptable to this backend.
    #[error("invalid node name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The backend cannot store values of this type.
    #[error("cannot store value of type {type_name} at {name:?}")]
    UnsupportedType { name: String, type_name: String },

    /// A leaf was addressed as a group or vice versa.
    #[error("node {name:?} in {group} is not a {expected}")]
    NodeKindMismatch {
        group: String,
        name: String,
        expected: &'static str,
    },

    /// Stored bytes failed their integrity check.
    #[error("corrupt leaf {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding in-memory state was poisoned.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
