//! Node naming for the persisted layout.
//!
//! Each item of a container is stored under `"{key}__index_{position}"`,
//! where `key` is empty for unkeyed items. The group also holds a fixed set
//! of reserved marker leaves that never name an item.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, ContainerResult};

/// Separator between key and position in an item node name.
pub const INDEX_TOKEN: &str = "__index_";

/// Type name marker.
pub const NAME: &str = "NAME";
/// Fully qualified type marker.
pub const TYPE: &str = "TYPE";
/// Object marker, reserved for stored objects that are not containers.
pub const OBJECT: &str = "OBJECT";
/// In-memory schema version marker.
pub const VERSION: &str = "VERSION";
/// Wire version marker.
pub const HDF_VERSION: &str = "HDF_VERSION";
/// Read-only flag marker.
pub const READ_ONLY: &str = "READ_ONLY";

/// Node names that never hold container items.
pub const RESERVED_NAMES: [&str; 6] = [NAME, TYPE, OBJECT, VERSION, HDF_VERSION, READ_ONLY];

/// Payload node of the legacy layout.
pub const LEGACY_DATA: &str = "data";
/// Read-only flag of the legacy layout.
pub const LEGACY_READ_ONLY: &str = "read_only";

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Node name of the item at `position`.
///
/// ```
/// use hdc_container::wire::encode_name;
///
/// assert_eq!(encode_name(Some("foo"), 3), "foo__index_3");
/// assert_eq!(encode_name(None, 0), "__index_0");
/// ```
pub fn encode_name(key: Option<&str>, position: usize) -> String {
    format!("{}{INDEX_TOKEN}{position}", key.unwrap_or(""))
}

/// A decoded item node name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireName {
    /// Position at write time, absent for names without the index token.
    pub position: Option<usize>,
    /// Key of the item, absent for unkeyed items.
    pub key: Option<String>,
}

/// Split an item node name into key and position.
///
/// Names without the index token are treated as keyed items with no
/// recorded position.
pub fn decode_name(name: &str) -> ContainerResult<WireName> {
    let Some((key, position)) = name.split_once(INDEX_TOKEN) else {
        return Ok(WireName {
            position: None,
            key: Some(name.to_string()),
        });
    };
    let position = position
        .parse::<usize>()
        .map_err(|_| ContainerError::InvalidNodeName(name.to_string()))?;
    Ok(WireName {
        position: Some(position),
        key: (!key.is_empty()).then(|| key.to_string()),
    })
}

/// Fails with [`ContainerError::NamingCollision`] if `key` contains the
/// index token.
pub fn check_key(key: &str) -> ContainerResult<()> {
    if key.contains(INDEX_TOKEN) {
        return Err(ContainerError::NamingCollision(key.to_string()));
    }
    Ok(())
}

/// On-disk naming convention of a container group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireVersion {
    /// Whole payload in one `data` node, no per-item positions.
    #[serde(rename = "0.1.0")]
    Legacy,
    /// One node per item, named with key and position.
    #[default]
    #[serde(rename = "0.2.0")]
    Current,
}

impl WireVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "0.1.0",
            Self::Current => "0.2.0",
        }
    }
}

impl FromStr for WireVersion {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0.1.0" => Ok(Self::Legacy),
            "0.2.0" => Ok(Self::Current),
            other => Err(ContainerError::VersionMismatch(other.to_string())),
        }
    }
}

impl fmt::Display for WireVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_keyed_name() {
        let w = decode_name("foo__index_12").unwrap();
        assert_eq!(w.position, Some(12));
        assert_eq!(w.key.as_deref(), Some("foo"));
    }

    #[test]
    fn decode_unkeyed_name() {
        let w = decode_name("__index_0").unwrap();
        assert_eq!(w, WireName { position: Some(0), key: None });
    }

    #[test]
    fn decode_plain_name() {
        let w = decode_name("extra").unwrap();
        assert_eq!(w, WireName { position: None, key: Some("extra".into()) });
    }

    #[test]
    fn decode_bad_position() {
        assert!(matches!(
            decode_name("a__index_x").unwrap_err(),
            ContainerError::InvalidNodeName(_)
        ));
        assert!(decode_name("a__index_").is_err());
    }

    #[test]
    fn collision_detected() {
        assert!(check_key("a__index_3").is_err());
        assert!(check_key("a_index_3").is_ok());
    }

    #[test]
    fn reserved_markers() {
        assert!(is_reserved("HDF_VERSION"));
        assert!(is_reserved("OBJECT"));
        assert!(!is_reserved("data"));
    }

    #[test]
    fn version_parsing() {
        assert_eq!("0.1.0".parse::<WireVersion>().unwrap(), WireVersion::Legacy);
        assert_eq!("0.2.0".parse::<WireVersion>().unwrap(), WireVersion::Current);
        assert!(matches!(
            "9.9.9".parse::<WireVersion>().unwrap_err(),
            ContainerError::VersionMismatch(_)
        ));
        assert_eq!(WireVersion::default().to_string(), "0.2.0");
    }
}
