use std::fmt;

use hdc_store::GroupHandle;
use hdc_types::Leaf;
use tracing::debug;

use crate::error::ContainerResult;
use crate::registry::RealizerRegistry;
use crate::value::Value;
use crate::wire;

/// A stored value that has not been read yet.
///
/// A stub is only a location: the group holding the value and the value's
/// node name inside it. Nothing is read until [`realize`](Self::realize).
#[derive(Clone)]
pub struct LazyStub {
    group: GroupHandle,
    name: String,
}

impl LazyStub {
    pub fn new(group: GroupHandle, name: impl Into<String>) -> Self {
        Self {
            group,
            name: name.into(),
        }
    }

    /// Group that holds the stored value.
    pub fn group(&self) -> &GroupHandle {
        &self.group
    }

    /// Node name of the stored value.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"{group path}/{name}"`, for diagnostics.
    pub fn location(&self) -> String {
        let path = self.group.path();
        if path.ends_with('/') {
            format!("{path}{}", self.name)
        } else {
            format!("{path}/{}", self.name)
        }
    }

    pub fn repr(&self) -> String {
        format!("LazyStub({})", self.location())
    }

    /// Returns `true` if the stored value is a group. Unreadable locations
    /// count as leaves.
    pub fn is_group(&self) -> bool {
        self.group.has_group(&self.name).unwrap_or(false)
    }

    /// Read the stored value.
    ///
    /// A leaf is read directly. A group is handed to the realizer registered
    /// for its `NAME` marker, or to the registry's generic fallback.
    pub fn realize(&self, registry: &RealizerRegistry) -> ContainerResult<Value> {
        if self.group.has_leaf(&self.name)? {
            return Ok(Value::Leaf(self.group.read_leaf(&self.name)?));
        }
        let sub = self.group.open_subgroup(&self.name)?;
        let type_name = match sub.read_leaf_opt(wire::NAME)? {
            Some(Leaf::Str(name)) => Some(name),
            _ => None,
        };
        debug!(
            location = %self.location(),
            type_name = type_name.as_deref().unwrap_or("<none>"),
            "realizing lazy value"
        );
        registry.realize(type_name.as_deref(), &sub)
    }
}

impl PartialEq for LazyStub {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.group.path() == other.group.path()
    }
}

impl fmt::Debug for LazyStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyStub")
            .field("location", &self.location())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdc_store::{InMemoryGroup, StorageGroup};

    #[test]
    fn realize_leaf_matches_direct_read() {
        let root = InMemoryGroup::new().handle();
        root.write_leaf("x", &Leaf::FloatArray(vec![1.0, 2.5])).unwrap();
        let stub = LazyStub::new(root.clone(), "x");
        let registry = RealizerRegistry::new();
        assert_eq!(stub.realize(&registry).unwrap(), root.read_leaf("x").unwrap());
        assert!(!stub.is_group());
    }

    #[test]
    fn realize_missing_fails() {
        let root = InMemoryGroup::new().handle();
        let stub = LazyStub::new(root, "missing");
        assert!(stub.realize(&RealizerRegistry::new()).is_err());
    }

    #[test]
    fn location_and_equality() {
        let root = InMemoryGroup::new().handle();
        let sub = root.open_or_create_subgroup("g").unwrap();
        let a = LazyStub::new(sub.clone(), "v");
        let b = LazyStub::new(root.open_subgroup("g").unwrap(), "v");
        assert_eq!(a.location(), "/g/v");
        assert_eq!(LazyStub::new(root, "top").location(), "/top");
        assert_eq!(a, b);
        assert_ne!(a, LazyStub::new(sub, "w"));
        assert_eq!(a.repr(), "LazyStub(/g/v)");
    }
}
