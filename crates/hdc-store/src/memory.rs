//! In-memory storage group for tests and embedding.
//!
//! [`InMemoryGroup`] keeps the whole tree in memory. Every group node sits
//! behind its own `RwLock`, and handles share nodes through `Arc`, so two
//! handles to the same group observe each other's writes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hdc_types::Leaf;

use crate::error::{StoreError, StoreResult};
use crate::names::validate_node_name;
use crate::traits::{GroupHandle, StorageGroup};

#[derive(Debug, Default)]
struct Node {
    leaves: BTreeMap<String, Leaf>,
    groups: BTreeMap<String, Arc<RwLock<Node>>>,
}

impl Node {
    fn count(&self) -> usize {
        let nested: usize = self
            .groups
            .values()
            .map(|g| g.read().map(|n| n.count()).unwrap_or(0))
            .sum();
        self.leaves.len() + self.groups.len() + nested
    }
}

/// An in-memory implementation of [`StorageGroup`].
///
/// Data is lost when the last handle to the root is dropped.
#[derive(Clone)]
pub struct InMemoryGroup {
    node: Arc<RwLock<Node>>,
    path: String,
}

impl InMemoryGroup {
    /// Create a new empty root group.
    pub fn new() -> Self {
        Self {
            node: Arc::new(RwLock::new(Node::default())),
            path: "/".into(),
        }
    }

    /// Wrap this group in a shared [`GroupHandle`].
    pub fn handle(&self) -> GroupHandle {
        Arc::new(self.clone())
    }

    /// Total number of nodes (leaves and groups) below this group.
    pub fn node_count(&self) -> usize {
        self.read().map(|n| n.count()).unwrap_or(0)
    }

    /// Returns `true` if the group has no children.
    pub fn is_empty(&self) -> bool {
        self.read()
            .map(|n| n.leaves.is_empty() && n.groups.is_empty())
            .unwrap_or(true)
    }

    fn child_path(&self, name: &str) -> String {
        if self.path == "/" {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.path)
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Node>> {
        self.node
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Node>> {
        self.node
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn child(&self, name: &str, node: Arc<RwLock<Node>>) -> GroupHandle {
        Arc::new(Self {
            node,
            path: self.child_path(name),
        })
    }
}

impl Default for InMemoryGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageGroup for InMemoryGroup {
    fn path(&self) -> String {
        self.path.clone()
    }

    fn open_or_create_subgroup(&self, name: &str) -> StoreResult<GroupHandle> {
        validate_node_name(name)?;
        let mut node = self.write()?;
        if node.leaves.contains_key(name) {
            return Err(StoreError::NodeKindMismatch {
                group: self.path.clone(),
                name: name.to_string(),
                expected: "group",
            });
        }
        let sub = node.groups.entry(name.to_string()).or_default().clone();
        Ok(self.child(name, sub))
    }

    fn open_subgroup(&self, name: &str) -> StoreResult<GroupHandle> {
        let node = self.read()?;
        match node.groups.get(name) {
            Some(sub) => Ok(self.child(name, Arc::clone(sub))),
            None => Err(StoreError::NotFound {
                group: self.path.clone(),
                name: name.to_string(),
            }),
        }
    }

    fn list_leaf_names(&self) -> StoreResult<BTreeSet<String>> {
        Ok(self.read()?.leaves.keys().cloned().collect())
    }

    fn list_group_names(&self) -> StoreResult<BTreeSet<String>> {
        Ok(self.read()?.groups.keys().cloned().collect())
    }

    fn read_leaf(&self, name: &str) -> StoreResult<Leaf> {
        let node = self.read()?;
        node.leaves
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                group: self.path.clone(),
                name: name.to_string(),
            })
    }

    fn write_leaf(&self, name: &str, value: &Leaf) -> StoreResult<()> {
        validate_node_name(name)?;
        if matches!(value, Leaf::Null) {
            return Err(StoreError::UnsupportedType {
                name: name.to_string(),
                type_name: value.type_name().to_string(),
            });
        }
        let mut node = self.write()?;
        if node.groups.contains_key(name) {
            return Err(StoreError::NodeKindMismatch {
                group: self.path.clone(),
                name: name.to_string(),
                expected: "leaf",
            });
        }
        node.leaves.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, name: &str) -> StoreResult<bool> {
        let mut node = self.write()?;
        let removed_leaf = node.leaves.remove(name).is_some();
        let removed_group = node.groups.remove(name).is_some();
        Ok(removed_leaf || removed_group)
    }
}

impl std::fmt::Debug for InMemoryGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGroup")
            .field("path", &self.path)
            .field("node_count", &self.node_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Leaves
    // -----------------------------------------------------------------------

    #[test]
    fn write_and_read_leaf() {
        let root = InMemoryGroup::new();
        root.write_leaf("x", &Leaf::Int(42)).unwrap();
        assert_eq!(root.read_leaf("x").unwrap(), Leaf::Int(42));
        assert!(root.has_leaf("x").unwrap());
        assert!(!root.has_group("x").unwrap());
    }

    #[test]
    fn overwrite_leaf() {
        let root = InMemoryGroup::new();
        root.write_leaf("x", &Leaf::Int(1)).unwrap();
        root.write_leaf("x", &Leaf::from("two")).unwrap();
        assert_eq!(root.read_leaf("x").unwrap(), Leaf::from("two"));
    }

    #[test]
    fn read_missing_leaf() {
        let root = InMemoryGroup::new();
        let err = root.read_leaf("missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(root.read_leaf_opt("missing").unwrap().is_none());
    }

    #[test]
    fn null_is_unsupported() {
        let root = InMemoryGroup::new();
        let err = root.write_leaf("n", &Leaf::Null).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedType { .. }));
        assert!(root.is_empty());
    }

    #[test]
    fn invalid_names_rejected() {
        let root = InMemoryGroup::new();
        assert!(root.write_leaf("a/b", &Leaf::Int(1)).is_err());
        assert!(root.open_or_create_subgroup("").is_err());
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    #[test]
    fn subgroup_handles_share_state() {
        let root = InMemoryGroup::new();
        let a = root.open_or_create_subgroup("g").unwrap();
        let b = root.open_or_create_subgroup("g").unwrap();
        a.write_leaf("v", &Leaf::Bool(true)).unwrap();
        assert_eq!(b.read_leaf("v").unwrap(), Leaf::Bool(true));
        assert_eq!(a.path(), "/g");
        let nested = a.open_or_create_subgroup("h").unwrap();
        assert_eq!(nested.path(), "/g/h");
    }

    #[test]
    fn open_missing_subgroup() {
        let root = InMemoryGroup::new();
        let err = root.open_subgroup("nope").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn leaf_and_group_names_do_not_collide() {
        let root = InMemoryGroup::new();
        root.write_leaf("x", &Leaf::Int(1)).unwrap();
        let err = root.open_or_create_subgroup("x").unwrap_err();
        assert!(matches!(err, StoreError::NodeKindMismatch { .. }));

        root.open_or_create_subgroup("g").unwrap();
        let err = root.write_leaf("g", &Leaf::Int(1)).unwrap_err();
        assert!(matches!(err, StoreError::NodeKindMismatch { .. }));
    }

    #[test]
    fn list_children() {
        let root = InMemoryGroup::new();
        root.write_leaf("b", &Leaf::Int(1)).unwrap();
        root.write_leaf("a", &Leaf::Int(2)).unwrap();
        root.open_or_create_subgroup("g").unwrap();
        let (leaves, groups) = root.list_all().unwrap();
        assert_eq!(leaves.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(groups.into_iter().collect::<Vec<_>>(), vec!["g"]);
    }

    #[test]
    fn delete_leaf_and_group() {
        let root = InMemoryGroup::new();
        root.write_leaf("x", &Leaf::Int(1)).unwrap();
        let g = root.open_or_create_subgroup("g").unwrap();
        g.write_leaf("y", &Leaf::Int(2)).unwrap();
        assert_eq!(root.node_count(), 3);

        assert!(root.delete("x").unwrap());
        assert!(root.delete("g").unwrap());
        assert!(!root.delete("g").unwrap());
        assert!(root.is_empty());
    }

    #[test]
    fn debug_format() {
        let root = InMemoryGroup::new();
        let debug = format!("{root:?}");
        assert!(debug.contains("InMemoryGroup"));
        assert!(debug.contains("node_count"));
    }
}
