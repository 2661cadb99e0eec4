//! Hybrid ordered/keyed container and its hierarchical persistence codec.
//!
//! [`OrderedContainer`] behaves both as an ordered list and as an
//! insertion-ordered string-keyed map over one slot array. Values are
//! addressed by position, by key, or by a `/`-separated path through nested
//! containers.
//!
//! [`PersistenceCodec`] writes a container into any
//! [`StorageGroup`](hdc_store::StorageGroup) and reads it back, including the
//! legacy layout. Reads can produce [`LazyStub`]s that are loaded on first
//! access through a [`RealizerRegistry`].
//!
//! # Example
//!
//! ```
//! use hdc_container::{OrderedContainer, PersistenceCodec, RealizerRegistry};
//! use hdc_store::InMemoryGroup;
//!
//! let mut c = OrderedContainer::new();
//! c.set("energy", -1.5).unwrap();
//! c.append("unkeyed").unwrap();
//! c.set("run/steps", 200i64).unwrap();
//!
//! let registry = RealizerRegistry::with_defaults();
//! let codec = PersistenceCodec::new(&registry);
//! let store = InMemoryGroup::new().handle();
//! codec.write(&c, &store).unwrap();
//! assert_eq!(codec.read(&store).unwrap(), c);
//! ```

pub mod codec;
pub mod container;
pub mod error;
pub mod lock;
pub mod registry;
pub mod schema;
pub mod stub;
pub mod value;
pub mod wire;

pub use codec::{read_raw, CodecOptions, PersistenceCodec};
pub use container::OrderedContainer;
pub use error::{ContainerError, ContainerResult};
pub use lock::{LockMode, Mutation};
pub use registry::{Realizer, RealizerRegistry};
pub use schema::{Schema, CONTAINER_NAME, CONTAINER_TYPE, CONTAINER_VERSION};
pub use stub::LazyStub;
pub use value::Value;
pub use wire::WireVersion;
