//! Lookup keys and path addressing.
//!
//! A container can be addressed three ways:
//! - by position, with [`Key::Index`]
//! - by string key, with [`Key::Name`]
//! - through nested containers, with [`Key::Path`]
//!
//! Keys are normalized before use:
//! - A string made only of ASCII decimal digits is a position (`"3"` → `3`)
//! - A string containing `/` is a path of its segments (`"a/b"` → `["a", "b"]`)
//! - A one-element path is its sole element, itself normalized
//!
//! Path segments are normalized lazily, when the segment becomes the head.

use std::fmt;

use crate::error::{TypeError, TypeResult};

/// A lookup key into an ordered container.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Zero-based position in slot order.
    Index(usize),
    /// String key attached to a slot.
    Name(String),
    /// Nested path: head resolved here, tail resolved in the result.
    Path(Vec<Key>),
}

impl Key {
    /// Parse a key from JSON: non-negative integers, strings, and arrays of
    /// those. Anything else is [`TypeError::InvalidKeyType`].
    pub fn from_json(value: &serde_json::Value) -> TypeResult<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .map(Key::Index)
                .ok_or_else(|| TypeError::InvalidKeyType(format!("number {n}"))),
            serde_json::Value::String(s) => Ok(Key::Name(s.clone())),
            serde_json::Value::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_array() {
                        return Err(TypeError::InvalidKeyType("nested path".into()));
                    }
                    parts.push(Self::from_json(item)?);
                }
                Ok(Key::Path(parts))
            }
            other => Err(TypeError::InvalidKeyType(json_kind(other).into())),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Returns `true` if `s` is non-empty and consists only of ASCII digits.
pub fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Normalize a lookup key.
///
/// # Examples
///
/// ```
/// use hdc_types::{normalize, Key};
///
/// assert_eq!(normalize(Key::from("7")), Key::Index(7));
/// assert_eq!(
///     normalize(Key::from("foo/bar")),
///     Key::Path(vec![Key::from("foo"), Key::from("bar")]),
/// );
/// assert_eq!(normalize(Key::Path(vec![Key::from("2")])), Key::Index(2));
/// ```
pub fn normalize(key: Key) -> Key {
    match key {
        Key::Name(s) => {
            if is_decimal(&s) {
                // Digit strings too large for a position stay string keys.
                if let Ok(i) = s.parse::<usize>() {
                    return Key::Index(i);
                }
            }
            if s.contains('/') {
                return Key::Path(s.split('/').map(|seg| Key::Name(seg.to_string())).collect());
            }
            Key::Name(s)
        }
        Key::Path(parts) if parts.len() == 1 => match parts.into_iter().next() {
            Some(only) => normalize(only),
            None => Key::Path(Vec::new()),
        },
        other => other,
    }
}

/// Split a path into its normalized head and the remaining tail.
///
/// An empty path has no head and is rejected.
pub fn split_head(parts: &[Key]) -> TypeResult<(Key, &[Key])> {
    match parts.split_first() {
        Some((head, tail)) => Ok((normalize(head.clone()), tail)),
        None => Err(TypeError::InvalidKeyType("empty path".into())),
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(s) => f.write_str(s),
            Key::Path(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Name(s.clone())
    }
}

impl From<Vec<Key>> for Key {
    fn from(parts: Vec<Key>) -> Self {
        Key::Path(parts)
    }
}

impl<A: Into<Key>, B: Into<Key>> From<(A, B)> for Key {
    fn from((a, b): (A, B)) -> Self {
        Key::Path(vec![a.into(), b.into()])
    }
}

impl<A: Into<Key>, B: Into<Key>, C: Into<Key>> From<(A, B, C)> for Key {
    fn from((a, b, c): (A, B, C)) -> Self {
        Key::Path(vec![a.into(), b.into(), c.into()])
    }
}

impl<A: Into<Key>, B: Into<Key>, C: Into<Key>, D: Into<Key>> From<(A, B, C, D)> for Key {
    fn from((a, b, c, d): (A, B, C, D)) -> Self {
        Key::Path(vec![a.into(), b.into(), c.into(), d.into()])
    }
}
