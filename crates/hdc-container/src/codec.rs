//! Persistence of containers in a hierarchical store.
//!
//! Two layouts exist, selected by the `HDF_VERSION` marker of each group:
//!
//! - **0.2.0** (current): marker leaves `NAME`, `TYPE`, `VERSION`,
//!   `HDF_VERSION` and `READ_ONLY`, then one node per item named
//!   `"{key}__index_{position}"`. Nested containers are subgroups laid out
//!   the same way.
//! - **0.1.0** (legacy): the whole payload in one `data` node plus a
//!   `read_only` leaf. Only unkeyed items record their position, so keyed
//!   items come back in name order around them.
//!
//! A group without `HDF_VERSION` is read as legacy.

use std::collections::BTreeSet;

use hdc_store::names::validate_file_name;
use hdc_store::{GroupHandle, StorageGroup, StoreError};
use hdc_types::{is_decimal, Builtin, Key, Leaf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::container::OrderedContainer;
use crate::error::{ContainerError, ContainerResult};
use crate::registry::RealizerRegistry;
use crate::schema::Schema;
use crate::stub::LazyStub;
use crate::value::Value;
use crate::wire::{self, decode_name, encode_name, WireVersion};

/// Codec behaviour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Read items as [`LazyStub`]s instead of loading them.
    pub lazy: bool,
    /// Layout to write.
    pub wire_version: WireVersion,
    /// Delete children of the target group that this write did not produce.
    pub prune_stale: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            lazy: false,
            wire_version: WireVersion::Current,
            prune_stale: true,
        }
    }
}

/// Writes containers to and reads them from a [`StorageGroup`].
#[derive(Debug)]
pub struct PersistenceCodec<'r> {
    registry: &'r RealizerRegistry,
    options: CodecOptions,
}

impl<'r> PersistenceCodec<'r> {
    pub fn new(registry: &'r RealizerRegistry) -> Self {
        Self::with_options(registry, CodecOptions::default())
    }

    pub fn with_options(registry: &'r RealizerRegistry, options: CodecOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    // ---------------------------------------------------------------
    // Write
    // ---------------------------------------------------------------

    /// Write `container` into `group`.
    ///
    /// Lazy values are loaded first, and every key in the hierarchy is
    /// checked against the index token before anything is written.
    pub fn write(&self, container: &OrderedContainer, group: &GroupHandle) -> ContainerResult<()> {
        if container.has_lazy() {
            let loaded = container.deep_copy(self.registry)?;
            return self.write_loaded(&loaded, group);
        }
        self.write_loaded(container, group)
    }

    fn write_loaded(&self, container: &OrderedContainer, group: &GroupHandle) -> ContainerResult<()> {
        check_names(container)?;
        match self.options.wire_version {
            WireVersion::Current => self.write_current(container, group),
            WireVersion::Legacy => self.write_legacy(container, group),
        }
    }

    fn write_current(&self, container: &OrderedContainer, group: &GroupHandle) -> ContainerResult<()> {
        write_schema(container.schema(), WireVersion::Current, group)?;
        group.write_leaf(wire::READ_ONLY, &Leaf::Bool(container.read_only()))?;

        let mut written = BTreeSet::new();
        for (position, (key, value)) in container.entries().enumerate() {
            let name = encode_name(key, position);
            match value {
                Value::Nested(child) => {
                    if group.has_leaf(&name)? {
                        group.delete(&name)?;
                    }
                    let sub = group.open_or_create_subgroup(&name)?;
                    self.write_current(child, &sub)?;
                }
                Value::Leaf(leaf) => {
                    if group.has_group(&name)? {
                        group.delete(&name)?;
                    }
                    group
                        .write_leaf(&name, leaf)
                        .map_err(|e| leaf_error(e, item_label(key, position), leaf))?;
                }
                Value::Lazy(_) => {
                    return Err(ContainerError::Unrealized {
                        key: item_label(key, position),
                    })
                }
            }
            written.insert(name);
        }

        debug!(group = %group.path(), items = written.len(), "wrote container");
        if self.options.prune_stale {
            prune(group, |name| !wire::is_reserved(name) && !written.contains(name))?;
        }
        Ok(())
    }

    fn write_legacy(&self, container: &OrderedContainer, group: &GroupHandle) -> ContainerResult<()> {
        let data = container.to_builtin(false)?;
        write_schema(container.schema(), WireVersion::Legacy, group)?;
        group.delete(wire::READ_ONLY)?;
        group.delete(wire::LEGACY_DATA)?;
        write_builtin(group, wire::LEGACY_DATA, &data)?;
        group.write_leaf(wire::LEGACY_READ_ONLY, &Leaf::Bool(container.read_only()))?;

        debug!(group = %group.path(), "wrote legacy container");
        if self.options.prune_stale {
            prune(group, |name| {
                !wire::is_reserved(name)
                    && name != wire::LEGACY_DATA
                    && name != wire::LEGACY_READ_ONLY
            })?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Read
    // ---------------------------------------------------------------

    /// Read the container stored in `group`.
    pub fn read(&self, group: &GroupHandle) -> ContainerResult<OrderedContainer> {
        let mut container = OrderedContainer::new();
        self.read_into(group, &mut container)?;
        Ok(container)
    }

    /// Replace the contents of `container` with the container stored in
    /// `group`, keeping its lock mode and table name.
    pub fn read_into(&self, group: &GroupHandle, container: &mut OrderedContainer) -> ContainerResult<()> {
        let version = match group.read_leaf_opt(wire::HDF_VERSION)? {
            None => WireVersion::Legacy,
            Some(Leaf::Str(s)) => s.parse()?,
            Some(other) => return Err(ContainerError::VersionMismatch(other.repr())),
        };
        debug!(group = %group.path(), version = %version, lazy = self.options.lazy, "reading container");

        let mut fresh = OrderedContainer::with_schema(read_schema(group)?)
            .with_lock_mode(container.lock_mode());
        if let Some(name) = container.table_name() {
            fresh = fresh.with_table_name(name);
        }
        match version {
            WireVersion::Current => self.read_current(group, &mut fresh)?,
            WireVersion::Legacy => self.read_legacy(group, &mut fresh)?,
        }
        *container = fresh;
        Ok(())
    }

    fn read_current(&self, group: &GroupHandle, container: &mut OrderedContainer) -> ContainerResult<()> {
        let read_only = match group.read_leaf_opt(wire::READ_ONLY)? {
            Some(Leaf::Bool(b)) => b,
            _ => {
                return Err(ContainerError::MissingMarker {
                    marker: wire::READ_ONLY,
                    group: group.path(),
                })
            }
        };

        let (leaves, groups) = group.list_all()?;
        let mut items = Vec::with_capacity(leaves.len() + groups.len());
        for name in leaves.iter().chain(groups.iter()) {
            if wire::is_reserved(name) {
                continue;
            }
            let decoded = decode_name(name)?;
            let value = if self.options.lazy {
                Value::Lazy(LazyStub::new(group.clone(), name.as_str()))
            } else if leaves.contains(name) {
                Value::Leaf(group.read_leaf(name)?)
            } else {
                self.read_child_group(&group.open_subgroup(name)?)?
            };
            items.push((decoded.position, decoded.key, value));
        }

        // Names without a position sort first.
        items.sort_by_key(|(position, _, _)| *position);
        for (_, key, value) in items {
            match key {
                None => container.append(value)?,
                Some(key) => container.set(Key::Name(key), value)?,
            };
        }
        container.set_read_only_flag(read_only);
        Ok(())
    }

    fn read_child_group(&self, sub: &GroupHandle) -> ContainerResult<Value> {
        let type_name = match sub.read_leaf_opt(wire::NAME)? {
            Some(Leaf::Str(name)) => Some(name),
            _ => None,
        };
        let is_container = sub.has_leaf(wire::HDF_VERSION)? || sub.has_leaf(wire::TYPE)?;
        match type_name {
            Some(name) if !is_container && self.registry.contains(&name) => {
                debug!(group = %sub.path(), type_name = %name, "dispatching to realizer");
                self.registry.realize(Some(&name), sub)
            }
            _ if is_container => Ok(Value::Nested(self.read(sub)?)),
            _ => Ok(Value::Nested(OrderedContainer::from_builtin(read_raw(sub)?)?)),
        }
    }

    fn read_legacy(&self, group: &GroupHandle, container: &mut OrderedContainer) -> ContainerResult<()> {
        let data = if group.has_group(wire::LEGACY_DATA)? {
            read_raw(&group.open_subgroup(wire::LEGACY_DATA)?)?
        } else if let Some(leaf) = group.read_leaf_opt(wire::LEGACY_DATA)? {
            Builtin::Leaf(leaf)
        } else {
            return Err(ContainerError::MissingMarker {
                marker: wire::LEGACY_DATA,
                group: group.path(),
            });
        };
        container.update(legacy_order(data), true)?;
        if let Some(Leaf::Bool(true)) = group.read_leaf_opt(wire::LEGACY_READ_ONLY)? {
            container.lock();
        }
        Ok(())
    }
}

/// Read a group without markers as plain nested data.
///
/// Decimal names come first in numeric order, then the remaining names in
/// lexicographic order.
pub fn read_raw(group: &GroupHandle) -> ContainerResult<Builtin> {
    let (leaves, groups) = group.list_all()?;
    let mut names: Vec<&String> = leaves.iter().chain(groups.iter()).collect();
    names.sort_by(|a, b| raw_order(a).cmp(&raw_order(b)));

    let mut map = IndexMap::with_capacity(names.len());
    for name in names {
        let value = if leaves.contains(name) {
            Builtin::Leaf(group.read_leaf(name)?)
        } else {
            read_raw(&group.open_subgroup(name)?)?
        };
        map.insert(name.clone(), value);
    }
    Ok(Builtin::Map(map))
}

fn raw_order(name: &str) -> (u8, usize, &str) {
    match name.parse::<usize>() {
        Ok(n) if is_decimal(name) => (0, n, ""),
        _ => (1, 0, name),
    }
}

/// Restore slot order of legacy payload read by [`read_raw`].
///
/// A decimal name is the position an unkeyed item had when it was written,
/// so it goes back to that position. Keyed items fill the remaining
/// positions in name order. Decimal names that do not fit are kept after
/// them and left for the initializer guard to reject.
fn legacy_order(data: Builtin) -> Builtin {
    match data {
        Builtin::Map(map) => {
            let len = map.len();
            let mut placed: Vec<Option<(String, Builtin)>> = vec![None; len];
            let mut rest = Vec::new();
            let mut misplaced = Vec::new();
            for (name, value) in map {
                let value = legacy_order(value);
                match name.parse::<usize>() {
                    Ok(n) if is_decimal(&name) && n < len && placed[n].is_none() => {
                        placed[n] = Some((name, value));
                    }
                    _ if is_decimal(&name) => misplaced.push((name, value)),
                    _ => rest.push((name, value)),
                }
            }
            let mut rest = rest.into_iter().chain(misplaced);
            let ordered = placed
                .into_iter()
                .filter_map(|slot| slot.or_else(|| rest.next()))
                .collect::<IndexMap<_, _>>();
            Builtin::Map(ordered)
        }
        Builtin::Seq(items) => Builtin::Seq(items.into_iter().map(legacy_order).collect()),
        leaf => leaf,
    }
}

fn check_names(container: &OrderedContainer) -> ContainerResult<()> {
    for (key, value) in container.entries() {
        if let Some(key) = key {
            wire::check_key(key)?;
            validate_file_name(key).map_err(|e| match e {
                StoreError::InvalidName { reason, .. } => {
                    ContainerError::InvalidKeyType(format!("{key:?} cannot be stored: {reason}"))
                }
                other => other.into(),
            })?;
        }
        if let Value::Nested(child) = value {
            check_names(child)?;
        }
    }
    Ok(())
}

fn write_schema(schema: &Schema, version: WireVersion, group: &GroupHandle) -> ContainerResult<()> {
    group.write_leaf(wire::NAME, &Leaf::from(schema.name.as_str()))?;
    group.write_leaf(wire::TYPE, &Leaf::from(schema.type_path.as_str()))?;
    group.write_leaf(wire::VERSION, &Leaf::from(schema.version.as_str()))?;
    group.write_leaf(wire::HDF_VERSION, &Leaf::from(version.as_str()))?;
    Ok(())
}

fn read_schema(group: &GroupHandle) -> ContainerResult<Schema> {
    let mut schema = Schema::default();
    let fields = [
        (wire::NAME, &mut schema.name),
        (wire::TYPE, &mut schema.type_path),
        (wire::VERSION, &mut schema.version),
    ];
    for (marker, field) in fields {
        if let Some(Leaf::Str(s)) = group.read_leaf_opt(marker)? {
            *field = s;
        }
    }
    Ok(schema)
}

fn write_builtin(group: &GroupHandle, name: &str, data: &Builtin) -> ContainerResult<()> {
    match data {
        Builtin::Leaf(leaf) => group
            .write_leaf(name, leaf)
            .map_err(|e| leaf_error(e, name.to_string(), leaf)),
        Builtin::Seq(items) => {
            let sub = group.open_or_create_subgroup(name)?;
            for (i, item) in items.iter().enumerate() {
                write_builtin(&sub, &i.to_string(), item)?;
            }
            Ok(())
        }
        Builtin::Map(pairs) => {
            let sub = group.open_or_create_subgroup(name)?;
            for (k, v) in pairs {
                write_builtin(&sub, k, v)?;
            }
            Ok(())
        }
    }
}

fn prune(group: &GroupHandle, stale: impl Fn(&str) -> bool) -> ContainerResult<()> {
    let (leaves, groups) = group.list_all()?;
    for name in leaves.iter().chain(groups.iter()) {
        if stale(name) {
            debug!(group = %group.path(), node = %name, "pruning stale node");
            group.delete(name)?;
        }
    }
    Ok(())
}

fn item_label(key: Option<&str>, position: usize) -> String {
    match key {
        Some(k) => k.to_string(),
        None => position.to_string(),
    }
}

fn leaf_error(e: StoreError, key: String, leaf: &Leaf) -> ContainerError {
    match e {
        StoreError::UnsupportedType { type_name, .. } => ContainerError::UnsupportedValueType {
            key,
            type_name,
            value: leaf.repr(),
        },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdc_store::InMemoryGroup;

    fn sample() -> OrderedContainer {
        let mut c = OrderedContainer::from_builtin(Builtin::map([
            ("foo", Builtin::from(24i64)),
            ("bar", Builtin::seq([1i64, 2])),
        ]))
        .unwrap();
        c.append("tail").unwrap();
        c
    }

    #[test]
    fn current_layout_names() {
        let registry = RealizerRegistry::new();
        let root = InMemoryGroup::new();
        PersistenceCodec::new(&registry).write(&sample(), &root.handle()).unwrap();

        let (leaves, groups) = root.list_all().unwrap();
        for marker in [wire::NAME, wire::TYPE, wire::VERSION, wire::HDF_VERSION, wire::READ_ONLY] {
            assert!(leaves.contains(marker), "missing {marker}");
        }
        assert!(leaves.contains("foo__index_0"));
        assert!(leaves.contains("__index_2"));
        assert!(groups.contains("bar__index_1"));
        assert_eq!(root.read_leaf(wire::HDF_VERSION).unwrap(), Leaf::from("0.2.0"));
    }

    #[test]
    fn current_round_trip() {
        let registry = RealizerRegistry::new();
        let codec = PersistenceCodec::new(&registry);
        let root = InMemoryGroup::new().handle();
        let c = sample();
        codec.write(&c, &root).unwrap();
        assert_eq!(codec.read(&root).unwrap(), c);
    }

    #[test]
    fn legacy_layout_names() {
        let registry = RealizerRegistry::new();
        let options = CodecOptions {
            wire_version: WireVersion::Legacy,
            ..CodecOptions::default()
        };
        let root = InMemoryGroup::new();
        let c = OrderedContainer::from_builtin(Builtin::seq([1i64, 2])).unwrap();
        PersistenceCodec::with_options(&registry, options)
            .write(&c, &root.handle())
            .unwrap();

        let (leaves, groups) = root.list_all().unwrap();
        assert!(groups.contains(wire::LEGACY_DATA));
        assert!(leaves.contains(wire::LEGACY_READ_ONLY));
        assert!(!leaves.contains(wire::READ_ONLY));
        assert_eq!(root.read_leaf(wire::HDF_VERSION).unwrap(), Leaf::from("0.1.0"));

        let read = PersistenceCodec::new(&registry).read(&root.handle()).unwrap();
        assert_eq!(read, c);
    }

    #[test]
    fn missing_version_is_legacy() {
        let root = InMemoryGroup::new().handle();
        let data = root.open_or_create_subgroup("data").unwrap();
        data.write_leaf("1", &Leaf::from("b")).unwrap();
        data.write_leaf("0", &Leaf::from("a")).unwrap();
        root.write_leaf("read_only", &Leaf::Bool(true)).unwrap();

        let registry = RealizerRegistry::new();
        let c = PersistenceCodec::new(&registry).read(&root).unwrap();
        assert_eq!(c.get(0usize).unwrap(), &Leaf::from("a"));
        assert_eq!(c.get(1usize).unwrap(), &Leaf::from("b"));
        assert!(!c.has_keys());
        assert!(c.read_only());
    }

    #[test]
    fn legacy_data_leaf_expands() {
        let root = InMemoryGroup::new().handle();
        root.write_leaf("data", &Leaf::IntArray(vec![3, 4])).unwrap();
        let registry = RealizerRegistry::new();
        let c = PersistenceCodec::new(&registry).read(&root).unwrap();
        assert_eq!(c.len(), 2);
        assert!(!c.read_only());
    }

    #[test]
    fn legacy_without_data_fails() {
        let root = InMemoryGroup::new().handle();
        let registry = RealizerRegistry::new();
        let err = PersistenceCodec::new(&registry).read(&root).unwrap_err();
        assert!(matches!(err, ContainerError::MissingMarker { marker: "data", .. }));
    }

    #[test]
    fn unknown_version_rejected() {
        let root = InMemoryGroup::new().handle();
        root.write_leaf(wire::HDF_VERSION, &Leaf::from("7.0.0")).unwrap();
        let registry = RealizerRegistry::new();
        let err = PersistenceCodec::new(&registry).read(&root).unwrap_err();
        assert!(matches!(err, ContainerError::VersionMismatch(v) if v == "7.0.0"));
    }

    #[test]
    fn stale_nodes_pruned() {
        let registry = RealizerRegistry::new();
        let codec = PersistenceCodec::new(&registry);
        let root = InMemoryGroup::new().handle();
        codec.write(&sample(), &root).unwrap();

        let small = OrderedContainer::from_builtin(Builtin::seq([1i64])).unwrap();
        codec.write(&small, &root).unwrap();
        let (leaves, groups) = root.list_all().unwrap();
        assert!(groups.is_empty());
        // Five markers and the single item.
        assert_eq!(leaves.len(), 6);
        assert_eq!(codec.read(&root).unwrap(), small);
    }

    #[test]
    fn leaf_replaces_group_of_same_name() {
        let registry = RealizerRegistry::new();
        let codec = PersistenceCodec::new(&registry);
        let root = InMemoryGroup::new().handle();

        let nested = OrderedContainer::from_builtin(Builtin::seq([Builtin::seq([1i64])])).unwrap();
        codec.write(&nested, &root).unwrap();
        let flat = OrderedContainer::from_builtin(Builtin::seq([5i64])).unwrap();
        codec.write(&flat, &root).unwrap();
        assert_eq!(codec.read(&root).unwrap(), flat);
    }

    #[test]
    fn schema_restored() {
        let registry = RealizerRegistry::new();
        let codec = PersistenceCodec::new(&registry);
        let root = InMemoryGroup::new().handle();
        let mut c = OrderedContainer::with_schema(Schema::new("JobStatus", "jobs::JobStatus", "0.3.0"));
        c.set("state", "finished").unwrap();
        codec.write(&c, &root).unwrap();

        let read = codec.read(&root).unwrap();
        assert_eq!(read.schema().name, "JobStatus");
        assert_eq!(read.schema().version, "0.3.0");
    }

    #[test]
    fn read_into_replaces_locked_contents() {
        let registry = RealizerRegistry::new();
        let codec = PersistenceCodec::new(&registry);
        let root = InMemoryGroup::new().handle();
        codec.write(&sample(), &root).unwrap();

        let mut target = OrderedContainer::from_builtin(Builtin::seq([9i64, 9, 9, 9])).unwrap();
        target.lock();
        codec.read_into(&root, &mut target).unwrap();
        assert_eq!(target, sample());
        assert!(!target.read_only());
    }

    #[test]
    fn failed_read_leaves_target_untouched() {
        let registry = RealizerRegistry::new();
        let root = InMemoryGroup::new().handle();
        let mut target = sample();
        target.lock();
        let err = PersistenceCodec::new(&registry).read_into(&root, &mut target).unwrap_err();
        assert!(matches!(err, ContainerError::MissingMarker { .. }));
        assert!(target.read_only());
        assert_eq!(target.get("foo").unwrap(), &Leaf::Int(24));
    }

    #[test]
    fn legacy_restores_unkeyed_positions() {
        let registry = RealizerRegistry::new();
        let options = CodecOptions {
            wire_version: WireVersion::Legacy,
            ..CodecOptions::default()
        };
        let mut c = OrderedContainer::new();
        c.set("a", 1i64).unwrap();
        c.append(2i64).unwrap();
        let mut inner = OrderedContainer::new();
        inner.set("z", 3i64).unwrap();
        inner.append(4i64).unwrap();
        c.set("b", inner).unwrap();

        let root = InMemoryGroup::new().handle();
        PersistenceCodec::with_options(&registry, options).write(&c, &root).unwrap();
        let read = PersistenceCodec::new(&registry).read(&root).unwrap();
        assert_eq!(read, c);
    }

    #[test]
    fn legacy_order_fills_gaps_with_names() {
        let raw = Builtin::map([
            ("1", Builtin::from("b")),
            ("3", Builtin::from("d")),
            ("a", Builtin::from("a")),
            ("c", Builtin::from("c")),
        ]);
        let Builtin::Map(map) = legacy_order(raw) else {
            panic!("expected a mapping");
        };
        let names: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "1", "c", "3"]);
    }

    #[test]
    fn unstorable_key_rejected_before_writing() {
        let registry = RealizerRegistry::new();
        let mut c = OrderedContainer::new();
        c.set("ok", 1i64).unwrap();
        c.set(".hidden", 2i64).unwrap();
        let root = InMemoryGroup::new();
        let err = PersistenceCodec::new(&registry).write(&c, &root.handle()).unwrap_err();
        assert!(matches!(err, ContainerError::InvalidKeyType(ref msg) if msg.contains(".hidden")));
        let (leaves, groups) = root.list_all().unwrap();
        assert!(leaves.is_empty() && groups.is_empty());
    }

    #[test]
    fn raw_read_orders_decimal_names_first() {
        let root = InMemoryGroup::new().handle();
        for name in ["b", "10", "2", "a"] {
            root.write_leaf(name, &Leaf::from(name)).unwrap();
        }
        let Builtin::Map(map) = read_raw(&root).unwrap() else {
            panic!("expected a mapping");
        };
        let names: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["2", "10", "a", "b"]);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: CodecOptions = serde_json::from_str(r#"{"lazy": true}"#).unwrap();
        assert!(options.lazy);
        assert!(options.prune_stale);
        assert_eq!(options.wire_version, WireVersion::Current);
    }
}
