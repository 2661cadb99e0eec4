use std::fmt;

use serde::{Deserialize, Serialize};

/// A terminal, non-recursive stored value.
///
/// The domain is closed so that storage backends and the persistence codec
/// can dispatch exhaustively on it. Arrays are homogeneous; mixed sequences
/// are represented as nested containers instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Leaf {
    /// Absence of a value. Not storable by the bundled backends.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Opaque byte blob.
    Bytes(Vec<u8>),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    BoolArray(Vec<bool>),
    StrArray(Vec<String>),
}

impl Leaf {
    /// Stable runtime type name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::IntArray(_) => "int[]",
            Self::FloatArray(_) => "float[]",
            Self::BoolArray(_) => "bool[]",
            Self::StrArray(_) => "str[]",
        }
    }

    /// Display-string form with strings quoted.
    ///
    /// This is lossy and only meant for previews.
    pub fn repr(&self) -> String {
        match self {
            Self::Null => "null".into(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format!("{f:?}"),
            Self::Str(s) => format!("{s:?}"),
            Self::Bytes(b) => format!("bytes({})", hex::encode(b)),
            Self::IntArray(v) => join_repr(v.iter().map(|i| i.to_string())),
            Self::FloatArray(v) => join_repr(v.iter().map(|f| format!("{f:?}"))),
            Self::BoolArray(v) => join_repr(v.iter().map(|b| b.to_string())),
            Self::StrArray(v) => join_repr(v.iter().map(|s| format!("{s:?}"))),
        }
    }

    /// Returns `true` for the array variants.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::IntArray(_) | Self::FloatArray(_) | Self::BoolArray(_) | Self::StrArray(_)
        )
    }

    /// Split an array leaf into scalar leaves. Non-array leaves yield `None`.
    pub fn array_elements(&self) -> Option<Vec<Leaf>> {
        match self {
            Self::IntArray(v) => Some(v.iter().copied().map(Self::Int).collect()),
            Self::FloatArray(v) => Some(v.iter().copied().map(Self::Float).collect()),
            Self::BoolArray(v) => Some(v.iter().copied().map(Self::Bool).collect()),
            Self::StrArray(v) => Some(v.iter().cloned().map(Self::Str).collect()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

fn join_repr(items: impl Iterator<Item = String>) -> String {
    format!("[{}]", items.collect::<Vec<_>>().join(", "))
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            other => f.write_str(&other.repr()),
        }
    }
}

impl From<bool> for Leaf {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Leaf {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Leaf {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Leaf {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Leaf {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Leaf {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for Leaf {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec<i64>> for Leaf {
    fn from(v: Vec<i64>) -> Self {
        Self::IntArray(v)
    }
}

impl From<Vec<f64>> for Leaf {
    fn from(v: Vec<f64>) -> Self {
        Self::FloatArray(v)
    }
}

impl From<Vec<bool>> for Leaf {
    fn from(v: Vec<bool>) -> Self {
        Self::BoolArray(v)
    }
}

impl From<Vec<String>> for Leaf {
    fn from(v: Vec<String>) -> Self {
        Self::StrArray(v)
    }
}
