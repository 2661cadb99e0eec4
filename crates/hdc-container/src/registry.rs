//! Type-name to realizer lookup for lazily loaded groups.

use std::collections::HashMap;
use std::fmt;

use hdc_store::{GroupHandle, StorageGroup};
use tracing::{debug, warn};

use crate::codec::{read_raw, CodecOptions, PersistenceCodec};
use crate::container::OrderedContainer;
use crate::error::ContainerResult;
use crate::schema::CONTAINER_NAME;
use crate::value::Value;
use crate::wire;

/// Rebuilds a value from the group it was stored in.
pub type Realizer =
    Box<dyn Fn(&GroupHandle, &RealizerRegistry) -> ContainerResult<Value> + Send + Sync>;

/// Realizers keyed by the `NAME` marker of the stored group.
///
/// The registry is meant to be filled once at startup and then shared by
/// reference. Registration is append-only: a name cannot be re-registered
/// or removed.
#[derive(Default)]
pub struct RealizerRegistry {
    realizers: HashMap<String, Realizer>,
}

impl RealizerRegistry {
    /// An empty registry. Every group goes through the generic fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that knows the plain container. Nested containers are
    /// realized lazily, one level at a time.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CONTAINER_NAME, |group, registry| {
            let options = CodecOptions {
                lazy: true,
                ..CodecOptions::default()
            };
            let codec = PersistenceCodec::with_options(registry, options);
            Ok(Value::Nested(codec.read(group)?))
        });
        registry
    }

    /// Register `realizer` for groups whose `NAME` marker equals `type_name`.
    ///
    /// Returns `false`, leaving the existing realizer in place, if the name
    /// is already registered.
    pub fn register<F>(&mut self, type_name: impl Into<String>, realizer: F) -> bool
    where
        F: Fn(&GroupHandle, &RealizerRegistry) -> ContainerResult<Value> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self.realizers.contains_key(&type_name) {
            warn!(type_name = %type_name, "realizer already registered, ignoring");
            return false;
        }
        self.realizers.insert(type_name, Box::new(realizer));
        true
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.realizers.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.realizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.realizers.is_empty()
    }

    /// Rebuild the value stored in `group`.
    ///
    /// Without a realizer for `type_name`, a group carrying a `TYPE` marker
    /// is read eagerly as a container, and any other group is read raw.
    pub fn realize(&self, type_name: Option<&str>, group: &GroupHandle) -> ContainerResult<Value> {
        if let Some(realizer) = type_name.and_then(|name| self.realizers.get(name)) {
            return realizer(group, self);
        }
        if group.has_leaf(wire::TYPE)? {
            debug!(group = %group.path(), "no realizer registered, reading typed group");
            let codec = PersistenceCodec::new(self);
            return Ok(Value::Nested(codec.read(group)?));
        }
        debug!(group = %group.path(), "no markers, reading raw group");
        Ok(Value::Nested(OrderedContainer::from_builtin(read_raw(group)?)?))
    }
}

impl fmt::Debug for RealizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.realizers.keys().collect();
        names.sort();
        f.debug_struct("RealizerRegistry")
            .field("types", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdc_store::InMemoryGroup;
    use hdc_types::Leaf;

    #[test]
    fn defaults_know_container() {
        let registry = RealizerRegistry::with_defaults();
        assert!(registry.contains(CONTAINER_NAME));
        assert_eq!(registry.len(), 1);
        assert!(RealizerRegistry::new().is_empty());
    }

    #[test]
    fn registration_is_append_only() {
        let mut registry = RealizerRegistry::new();
        assert!(registry.register("Thing", |_, _| Ok(Value::from(1i64))));
        assert!(!registry.register("Thing", |_, _| Ok(Value::from(2i64))));

        let group = InMemoryGroup::new().handle();
        assert_eq!(
            registry.realize(Some("Thing"), &group).unwrap(),
            Value::from(1i64)
        );
    }

    #[test]
    fn unmarked_group_read_raw() {
        let group = InMemoryGroup::new().handle();
        group.write_leaf("b", &Leaf::Int(2)).unwrap();
        group.write_leaf("a", &Leaf::Int(1)).unwrap();

        let value = RealizerRegistry::new().realize(None, &group).unwrap();
        let c = value.as_container().unwrap();
        assert_eq!(c.get("a").unwrap(), &Leaf::Int(1));
        assert_eq!(c.get(1usize).unwrap(), &Leaf::Int(2));
    }

    #[test]
    fn debug_lists_types() {
        let debug = format!("{:?}", RealizerRegistry::with_defaults());
        assert!(debug.contains("OrderedContainer"));
    }
}
