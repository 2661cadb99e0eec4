use serde::{Deserialize, Serialize};

/// Type name of the plain container, used for the `NAME` marker and as the
/// realizer registry key.
pub const CONTAINER_NAME: &str = "OrderedContainer";

/// Fully qualified type of the plain container, used for the `TYPE` marker.
pub const CONTAINER_TYPE: &str = "hdc_container::OrderedContainer";

/// Current in-memory schema version of the plain container.
pub const CONTAINER_VERSION: &str = "0.1.0";

/// Identity and in-memory schema version of a container.
///
/// Containers specialized for a fixed layout carry their own name, type and
/// version here; the codec writes them as the `NAME`, `TYPE` and `VERSION`
/// markers and restores them on read. The schema version is independent of
/// the wire version.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub type_path: String,
    pub version: String,
}

impl Schema {
    pub fn new(
        name: impl Into<String>,
        type_path: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_path: type_path.into(),
            version: version.into(),
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(CONTAINER_NAME, CONTAINER_TYPE, CONTAINER_VERSION)
    }
}
