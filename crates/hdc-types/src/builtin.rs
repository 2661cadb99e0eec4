use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};

use crate::leaf::Leaf;

/// Plain nested data: sequences, insertion-ordered string-keyed mappings, and
/// leaves.
///
/// This is what a container flattens into and what it can be built from. All
/// mapping keys are strings; positions appear as their decimal form.
#[derive(Clone, Debug, PartialEq)]
pub enum Builtin {
    Leaf(Leaf),
    Seq(Vec<Builtin>),
    Map(IndexMap<String, Builtin>),
}

impl Builtin {
    /// Build a mapping from `(key, value)` pairs, keeping their order.
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Builtin>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Build a sequence from values.
    pub fn seq<V, I>(values: I) -> Self
    where
        V: Into<Builtin>,
        I: IntoIterator<Item = V>,
    {
        Self::Seq(values.into_iter().map(Into::into).collect())
    }

    /// Convert from JSON. Objects keep their key order; integers that fit in
    /// `i64` become [`Leaf::Int`], all other numbers [`Leaf::Float`].
    pub fn from_json(value: &Json) -> Self {
        match value {
            Json::Null => Self::Leaf(Leaf::Null),
            Json::Bool(b) => Self::Leaf(Leaf::Bool(*b)),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Leaf(Leaf::Int(i)),
                None => Self::Leaf(Leaf::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Json::String(s) => Self::Leaf(Leaf::Str(s.clone())),
            Json::Array(items) => Self::Seq(items.iter().map(Self::from_json).collect()),
            Json::Object(obj) => Self::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON.
    ///
    /// Byte blobs are rendered as hex strings and non-finite floats as `null`,
    /// so this is not an exact inverse of [`Builtin::from_json`].
    pub fn to_json(&self) -> Json {
        match self {
            Self::Leaf(leaf) => leaf_to_json(leaf),
            Self::Seq(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => {
                let mut obj = Map::with_capacity(map.len());
                for (k, v) in map {
                    obj.insert(k.clone(), v.to_json());
                }
                Json::Object(obj)
            }
        }
    }
}

fn float_json(f: f64) -> Json {
    Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null)
}

fn leaf_to_json(leaf: &Leaf) -> Json {
    match leaf {
        Leaf::Null => Json::Null,
        Leaf::Bool(b) => Json::Bool(*b),
        Leaf::Int(i) => Json::from(*i),
        Leaf::Float(f) => float_json(*f),
        Leaf::Str(s) => Json::String(s.clone()),
        Leaf::Bytes(b) => Json::String(hex::encode(b)),
        Leaf::IntArray(v) => Json::Array(v.iter().map(|i| Json::from(*i)).collect()),
        Leaf::FloatArray(v) => Json::Array(v.iter().copied().map(float_json).collect()),
        Leaf::BoolArray(v) => Json::Array(v.iter().map(|b| Json::Bool(*b)).collect()),
        Leaf::StrArray(v) => Json::Array(v.iter().map(|s| Json::String(s.clone())).collect()),
    }
}

impl From<Leaf> for Builtin {
    fn from(v: Leaf) -> Self {
        Self::Leaf(v)
    }
}

macro_rules! builtin_from_leaf {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Builtin {
                fn from(v: $t) -> Self {
                    Self::Leaf(Leaf::from(v))
                }
            }
        )*
    };
}

builtin_from_leaf!(
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

impl From<Vec<Builtin>> for Builtin {
    fn from(v: Vec<Builtin>) -> Self {
        Self::Seq(v)
    }
}

impl From<IndexMap<String, Builtin>> for Builtin {
    fn from(v: IndexMap<String, Builtin>) -> Self {
        Self::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_preserves_object_order() {
        let b = Builtin::from_json(&json!({"z": 1, "a": 2, "m": 3}));
        match b {
            Builtin::Map(map) => {
                let keys: Vec<_> = map.keys().cloned().collect();
                assert_eq!(keys, vec!["z", "a", "m"]);
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn from_json_number_kinds() {
        assert_eq!(Builtin::from_json(&json!(3)), Builtin::from(3i64));
        assert_eq!(Builtin::from_json(&json!(2.5)), Builtin::from(2.5));
        assert_eq!(Builtin::from_json(&json!(null)), Builtin::Leaf(Leaf::Null));
    }

    #[test]
    fn to_json_renders_leaves() {
        let b = Builtin::map([
            ("bytes", Builtin::from(vec![0xde_u8, 0xad])),
            ("ints", Builtin::from(vec![1i64, 2])),
            ("nan", Builtin::from(f64::NAN)),
        ]);
        assert_eq!(
            b.to_json(),
            json!({"bytes": "dead", "ints": [1, 2], "nan": null})
        );
    }

    #[test]
    fn nested_json_conversion() {
        let src = json!({"foo": {"bar": [4, 2]}, "name": "x"});
        let b = Builtin::from_json(&src);
        assert_eq!(b.to_json(), src);
    }

    #[test]
    fn seq_builder() {
        let b = Builtin::seq(["a", "b"]);
        assert_eq!(b, Builtin::Seq(vec![Builtin::from("a"), Builtin::from("b")]));
    }
}
