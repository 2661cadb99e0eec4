//! Hierarchical group/leaf storage for hierarchical data containers.
//!
//! A store is a tree of named nodes. Each node is either a *leaf* holding a
//! single [`Leaf`](hdc_types::Leaf) value, or a *group* holding further named
//! nodes, in the manner of HDF5 groups and datasets.
//!
//! # Storage Backends
//!
//! All backends implement the [`StorageGroup`] trait:
//!
//! - [`InMemoryGroup`] -- shared in-memory tree for tests and embedding
//! - [`DirectoryGroup`] -- directories for groups, checksummed files for leaves
//!
//! # Design Rules
//!
//! 1. Node names are a single flat string per level (no `/`).
//! 2. A name refers to at most one node: a leaf or a group, never both.
//! 3. Handles are cheap to clone and refer to the same location.
//! 4. The store never interprets leaf contents beyond accepting or rejecting
//!    their type.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod directory;
pub mod error;
pub mod memory;
pub mod names;
pub mod traits;

pub use directory::DirectoryGroup;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryGroup;
pub use names::validate_node_name;
pub use traits::{GroupHandle, StorageGroup};
