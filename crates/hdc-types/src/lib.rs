//! Foundation types for hierarchical data containers (HDC).
//!
//! This crate provides the value and addressing types shared by the storage
//! backends and the container itself. Every other HDC crate depends on
//! `hdc-types`.
//!
//! # Key Types
//!
//! - [`Leaf`] -- Terminal stored value: scalar, string, byte blob, or array
//! - [`Key`] -- Lookup key: positional index, string key, or nested path
//! - [`Builtin`] -- Plain nested sequence/mapping form of a container

pub mod builtin;
pub mod error;
pub mod key;
pub mod leaf;

pub use builtin::Builtin;
pub use error::{TypeError, TypeResult};
pub use key::{is_decimal, normalize, split_head, Key};
pub use leaf::Leaf;
