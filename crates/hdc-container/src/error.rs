use hdc_store::StoreError;
use hdc_types::TypeError;

/// Errors from container and codec operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Integer index or position beyond the container bounds.
    #[error("index {index} out of range for container of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// String key not present in the container.
    #[error("key not found: {0:?}")]
    KeyNotFound(String),

    /// The key cannot address a slot.
    #[error("invalid key: {0}")]
    InvalidKeyType(String),

    /// Mutation attempted on a read-only container in [`LockMode::Error`].
    ///
    /// [`LockMode::Error`]: crate::lock::LockMode::Error
    #[error("{operation} called on a read-only container")]
    ReadOnlyViolation { operation: &'static str },

    /// The storage backend rejected a leaf value's type.
    #[error("cannot save {value} (key {key}): unsupported value type {type_name:?}")]
    UnsupportedValueType {
        key: String,
        type_name: String,
        value: String,
    },

    /// Unrecognized wire version marker.
    #[error("unrecognized wire version {0:?}")]
    VersionMismatch(String),

    /// Integer-like initializer key that does not match its position.
    #[error(
        "keys in initializer must be strings or match their position, \
         got {key} at position {position}"
    )]
    InitializerOrderError { key: usize, position: usize },

    /// The value cannot initialize a container.
    #[error("cannot initialize a container from {0}")]
    InvalidInitializer(String),

    /// A user key contains the reserved wire token.
    #[error("key {0:?} clashes with the reserved \"__index_\" token")]
    NamingCollision(String),

    /// A node name in the store does not follow the wire naming scheme.
    #[error("malformed node name {0:?}")]
    InvalidNodeName(String),

    /// A required marker node is absent.
    #[error("missing {marker:?} in group {group}")]
    MissingMarker { marker: &'static str, group: String },

    /// A path walked through a leaf.
    #[error("value at {key:?} is not a container")]
    NotAContainer { key: String },

    /// A lazily loaded value was reached without a realizer registry.
    #[error("value at {key:?} is not realized yet")]
    Unrealized { key: String },

    /// A search found the key in more than one place.
    #[error("key {0:?} exists more than once")]
    AmbiguousSearch(String),

    /// Storage backend failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Type conversion failure.
    #[error("type error: {0}")]
    Type(TypeError),
}

impl From<TypeError> for ContainerError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::InvalidKeyType(reason) => Self::InvalidKeyType(reason),
            other => Self::Type(other),
        }
    }
}

/// Result alias for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;
