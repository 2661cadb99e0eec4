use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use hdc_types::Leaf;

use crate::error::{StoreError, StoreResult};

/// Shared handle to a group location.
pub type GroupHandle = Arc<dyn StorageGroup>;

/// One group in a hierarchical key-value store.
///
/// All implementations must satisfy these invariants:
/// - A name refers to at most one node: a leaf or a group.
/// - `list_leaf_names` and `list_group_names` are disjoint.
/// - A handle returned by `open_or_create_subgroup` observes all writes made
///   through any other handle to the same group.
/// - Child enumeration order carries no meaning; callers that need order must
///   encode it in the names.
/// - All I/O errors are propagated, never silently ignored.
///
/// Concurrent writers to the same location must be serialized by the caller.
pub trait StorageGroup: Send + Sync + fmt::Debug {
    /// Human-readable location of this group, for diagnostics.
    fn path(&self) -> String;

    /// Open the named subgroup, creating it if it does not exist.
    ///
    /// Fails with [`StoreError::NodeKindMismatch`] if `name` is a leaf.
    fn open_or_create_subgroup(&self, name: &str) -> StoreResult<GroupHandle>;

    /// Open an existing subgroup.
    ///
    /// Fails with [`StoreError::NotFound`] if there is no group named `name`.
    fn open_subgroup(&self, name: &str) -> StoreResult<GroupHandle>;

    /// Names of the direct leaf children.
    fn list_leaf_names(&self) -> StoreResult<BTreeSet<String>>;

    /// Names of the direct group children.
    fn list_group_names(&self) -> StoreResult<BTreeSet<String>>;

    /// Read a leaf value.
    ///
    /// Fails with [`StoreError::NotFound`] if there is no leaf named `name`.
    fn read_leaf(&self, name: &str) -> StoreResult<Leaf>;

    /// Write a leaf value, replacing any previous leaf of the same name.
    ///
    /// Fails with [`StoreError::UnsupportedType`] if the backend cannot
    /// represent the value, and with [`StoreError::NodeKindMismatch`] if
    /// `name` is a group.
    fn write_leaf(&self, name: &str, value: &Leaf) -> StoreResult<()>;

    /// Delete a leaf or a whole subgroup. Returns `true` if something existed.
    fn delete(&self, name: &str) -> StoreResult<bool>;

    /// Returns `true` if a leaf named `name` exists.
    fn has_leaf(&self, name: &str) -> StoreResult<bool> {
        Ok(self.list_leaf_names()?.contains(name))
    }

    /// Returns `true` if a group named `name` exists.
    fn has_group(&self, name: &str) -> StoreResult<bool> {
        Ok(self.list_group_names()?.contains(name))
    }

    /// Read a leaf, returning `Ok(None)` if it does not exist.
    fn read_leaf_opt(&self, name: &str) -> StoreResult<Option<Leaf>> {
        match self.read_leaf(name) {
            Ok(leaf) => Ok(Some(leaf)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Leaf names and group names in one call.
    fn list_all(&self) -> StoreResult<(BTreeSet<String>, BTreeSet<String>)> {
        Ok((self.list_leaf_names()?, self.list_group_names()?))
    }
}
