use hdc_types::{Builtin, Key, Leaf};

use crate::container::OrderedContainer;
use crate::error::{ContainerError, ContainerResult};
use crate::stub::LazyStub;

/// One stored value: a leaf, a nested container, or a not-yet-loaded value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Leaf(Leaf),
    Nested(OrderedContainer),
    /// Placeholder for a stored value that is read on first access.
    Lazy(LazyStub),
}

impl Value {
    /// Wrap plain data: sequences and mappings become nested containers.
    pub fn from_builtin(data: Builtin) -> ContainerResult<Self> {
        match data {
            Builtin::Leaf(leaf) => Ok(Self::Leaf(leaf)),
            other => Ok(Self::Nested(OrderedContainer::from_builtin(other)?)),
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&OrderedContainer> {
        match self {
            Self::Nested(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut OrderedContainer> {
        match self {
            Self::Nested(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Nested(_))
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }

    /// Runtime type name, used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Leaf(leaf) => leaf.type_name(),
            Self::Nested(c) => &c.schema().name,
            Self::Lazy(_) => "LazyStub",
        }
    }

    /// Display-string form used for previews.
    pub fn repr(&self) -> String {
        match self {
            Self::Leaf(leaf) => leaf.repr(),
            Self::Nested(c) => c.to_string(),
            Self::Lazy(stub) => stub.repr(),
        }
    }

    /// Descend into a nested container reached through `key`.
    pub(crate) fn container_at(&self, key: &Key) -> ContainerResult<&OrderedContainer> {
        match self {
            Self::Nested(c) => Ok(c),
            Self::Lazy(_) => Err(ContainerError::Unrealized {
                key: key.to_string(),
            }),
            Self::Leaf(_) => Err(ContainerError::NotAContainer {
                key: key.to_string(),
            }),
        }
    }

    pub(crate) fn container_at_mut(&mut self, key: &Key) -> ContainerResult<&mut OrderedContainer> {
        match self {
            Self::Nested(c) => Ok(c),
            Self::Lazy(_) => Err(ContainerError::Unrealized {
                key: key.to_string(),
            }),
            Self::Leaf(_) => Err(ContainerError::NotAContainer {
                key: key.to_string(),
            }),
        }
    }
}

impl From<Leaf> for Value {
    fn from(v: Leaf) -> Self {
        Self::Leaf(v)
    }
}

impl From<OrderedContainer> for Value {
    fn from(v: OrderedContainer) -> Self {
        Self::Nested(v)
    }
}

impl From<LazyStub> for Value {
    fn from(v: LazyStub) -> Self {
        Self::Lazy(v)
    }
}

macro_rules! value_from_leaf {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Leaf(Leaf::from(v))
                }
            }
        )*
    };
}

value_from_leaf!(
    bool,
    i64,
    i32,
    f64,
    &str,
    String,
    Vec<u8>,
    Vec<i64>,
    Vec<f64>,
    Vec<bool>,
    Vec<String>,
);

impl PartialEq<Leaf> for Value {
    fn eq(&self, other: &Leaf) -> bool {
        matches!(self, Self::Leaf(leaf) if leaf == other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_sequences_are_wrapped() {
        let v = Value::from_builtin(Builtin::seq([1i64, 2])).unwrap();
        let c = v.as_container().unwrap();
        assert_eq!(c.len(), 2);
        assert!(!c.has_keys());
    }

    #[test]
    fn builtin_leaf_stays_leaf() {
        let v = Value::from_builtin(Builtin::from("x")).unwrap();
        assert_eq!(v, Leaf::from("x"));
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::from(1i64).type_name(), "int");
        assert_eq!(
            Value::from(OrderedContainer::new()).type_name(),
            "OrderedContainer"
        );
    }

    #[test]
    fn container_at_reports_leaf() {
        let v = Value::from(1i64);
        let err = v.container_at(&Key::from("x")).unwrap_err();
        assert!(matches!(err, ContainerError::NotAContainer { .. }));
    }
}
