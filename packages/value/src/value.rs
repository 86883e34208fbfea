//! The Value type - host-side data exchanged with the engine.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::{Index, IndexMut};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Complex32, Complex64, NdArray, Scalar, StructValue};

/// A host value that can be sent to or received from the engine.
///
/// # Design Notes
///
/// - `Int` and `Float` are untyped host numbers; they widen to int64 and
///   float64 on the engine side. Use `Scalar` for an explicit width.
/// - Sets, tuples and fixed-size arrays become `Sequence` on conversion,
///   ordered by iteration order.
/// - Maps become `Struct`, keeping their iteration order.
/// - Equality is structural with IEEE float semantics: a NaN never equals
///   another NaN.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value. The engine has no null; it travels as NaN.
    #[default]
    Null,
    Bool(bool),
    /// Untyped host integer.
    Int(i64),
    /// Untyped host float.
    Float(f64),
    /// Number with an explicit element width.
    Scalar(Scalar),
    Text(String),
    /// Ordered list of values (cell array or row vector on the engine side).
    Sequence(Vec<Value>),
    Struct(StructValue),
    Array(NdArray),
}

impl Value {
    /// Create an empty struct value.
    pub fn structure() -> Self {
        Value::Struct(StructValue::new())
    }

    /// Wrap a number with an explicit element width.
    pub fn typed(v: impl Into<Scalar>) -> Self {
        Value::Scalar(v.into())
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Scalar(_) => "scalar",
            Value::Text(_) => "text",
            Value::Sequence(_) => "sequence",
            Value::Struct(_) => "struct",
            Value::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Value::Struct(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of `Int` and integer-kinded `Scalar` values.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i),
            Value::Scalar(Scalar::I8(v)) => Some(v.into()),
            Value::Scalar(Scalar::I16(v)) => Some(v.into()),
            Value::Scalar(Scalar::I32(v)) => Some(v.into()),
            Value::Scalar(Scalar::I64(v)) => Some(v),
            Value::Scalar(Scalar::U8(v)) => Some(v.into()),
            Value::Scalar(Scalar::U16(v)) => Some(v.into()),
            Value::Scalar(Scalar::U32(v)) => Some(v.into()),
            Value::Scalar(Scalar::U64(v)) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Real numeric view of any non-complex number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Scalar(s) => s.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_struct(self) -> Option<StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_sequence(self) -> Option<Vec<Value>> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

impl Index<&str> for Value {
    type Output = Value;

    /// Struct field access. Panics on non-struct values or missing keys.
    fn index(&self, key: &str) -> &Value {
        match self {
            Value::Struct(s) => &s[key],
            other => panic!("cannot index a {} value with `{}`", other.type_name(), key),
        }
    }
}

impl IndexMut<&str> for Value {
    fn index_mut(&mut self, key: &str) -> &mut Value {
        match self {
            Value::Struct(s) => &mut s[key],
            other => panic!("cannot index a {} value with `{}`", other.type_name(), key),
        }
    }
}

impl Index<usize> for Value {
    type Output = Value;

    /// Sequence element access. Panics on non-sequence values.
    fn index(&self, index: usize) -> &Value {
        match self {
            Value::Sequence(items) => &items[index],
            other => panic!("cannot index a {} value with {}", other.type_name(), index),
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

/// Counts above `i64::MAX` keep their width as a `u64` scalar.
impl From<usize> for Value {
    fn from(v: usize) -> Self {
        match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Scalar(Scalar::U64(v as u64)),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Scalar(Scalar::F32(v))
    }
}

impl From<Complex64> for Value {
    fn from(v: Complex64) -> Self {
        Value::Scalar(Scalar::C128(v))
    }
}

impl From<Complex32> for Value {
    fn from(v: Complex32) -> Self {
        Value::Scalar(Scalar::C64(v))
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Value::Scalar(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NdArray> for Value {
    fn from(v: NdArray) -> Self {
        Value::Array(v)
    }
}

impl From<StructValue> for Value {
    fn from(v: StructValue) -> Self {
        Value::Struct(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<HashSet<T>> for Value {
    fn from(v: HashSet<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeSet<T>> for Value {
    fn from(v: BTreeSet<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

macro_rules! tuple_from {
    ($($name:ident),+) => {
        impl<$($name: Into<Value>),+> From<($($name,)+)> for Value {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Value::Sequence(vec![$($name.into()),+])
            }
        }
    };
}

tuple_from!(A, B);
tuple_from!(A, B, C);
tuple_from!(A, B, C, D);

impl<K: Into<String>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(v: BTreeMap<K, V>) -> Self {
        Value::Struct(v.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> From<HashMap<K, V>> for Value {
    fn from(v: HashMap<K, V>) -> Self {
        Value::Struct(v.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(v: IndexMap<K, V>) -> Self {
        Value::Struct(v.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_numbers() {
        assert_eq!(Value::from(3), Value::Int(3));
        assert_eq!(Value::from(3i64), Value::Int(3));
        assert_eq!(Value::from(2.5), Value::Float(2.5));
        assert_eq!(Value::from(2.5f32), Value::Scalar(Scalar::F32(2.5)));
        assert_eq!(Value::typed(7u8), Value::Scalar(Scalar::U8(7)));
    }

    #[test]
    fn large_counts_stay_unsigned() {
        assert_eq!(Value::from(42usize), Value::Int(42));
        assert_eq!(Value::from(i64::MAX as usize), Value::Int(i64::MAX));
        assert_eq!(
            Value::from(usize::MAX),
            Value::Scalar(Scalar::U64(usize::MAX as u64))
        );
    }

    #[test]
    fn sets_and_tuples_become_sequences() {
        let set: BTreeSet<i64> = [3, 1, 2, 3].into_iter().collect();
        assert_eq!(
            Value::from(set),
            Value::Sequence(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );

        assert_eq!(
            Value::from((1, "two", 3.0)),
            Value::Sequence(vec![Value::Int(1), Value::from("two"), Value::Float(3.0)])
        );

        let hashed: HashSet<i64> = [5].into_iter().collect();
        assert_eq!(Value::from(hashed), Value::Sequence(vec![Value::Int(5)]));
    }

    #[test]
    fn maps_become_structs() {
        let mut map = BTreeMap::new();
        map.insert("name", Value::from("a"));
        map.insert("age", Value::from(3));

        let value = Value::from(map);
        assert!(value.is_struct());
        assert_eq!(value["name"], Value::from("a"));
        assert_eq!(value["age"].as_i64(), Some(3));
    }

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(1)), Value::Int(1));
    }

    #[test]
    fn nan_is_never_equal() {
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn numeric_views() {
        assert_eq!(Value::typed(200u8).as_i64(), Some(200));
        assert_eq!(Value::typed(u64::MAX).as_i64(), None);
        assert_eq!(Value::typed(1.5f32).as_f64(), Some(1.5));
        assert_eq!(Value::from("x").as_f64(), None);
    }

    #[test]
    fn index_mut_on_struct_value() {
        let mut value = Value::structure();
        value["a"]["b"] = Value::from(1);
        assert_eq!(value["a"]["b"], Value::Int(1));
    }

    #[test]
    #[should_panic(expected = "cannot index a int value")]
    fn index_non_struct_panics() {
        let value = Value::Int(1);
        let _ = &value["a"];
    }
}
