//! Ordered struct values with key-style and path-style access.

use std::ops::{Index, IndexMut};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{AttributeError, Value};

/// Keys starting with this character are never auto-created.
pub const RESERVED_PREFIX: char = '_';

/// The host mirror of an engine struct.
///
/// Keys keep insertion order. Reads come in two flavours:
///
/// - [`get_or_fail`](Self::get_or_fail) is a terminal read and fails with
///   [`AttributeError::Missing`] when the key is absent.
/// - [`get_or_create`](Self::get_or_create) is an intermediate step of a
///   nested assignment and creates an empty struct at a missing key.
///
/// ```rust
/// use octbridge_value::{StructValue, Value};
///
/// let mut s = StructValue::new();
/// s.set_path(&["a", "b", "c"], 5).unwrap();
/// assert_eq!(s["a"]["b"]["c"], Value::Int(5));
/// assert!(s.get_or_fail("q").is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructValue {
    fields: IndexMap<String, Value>,
}

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    /// Insert or replace a field, returning the previous value.
    ///
    /// Replacing keeps the key's original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Chainable [`insert`](Self::insert).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.insert(key, value);
        self
    }

    /// Remove a field, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.fields.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Terminal read: the key must exist.
    pub fn get_or_fail(&self, key: &str) -> Result<&Value, AttributeError> {
        self.fields
            .get(key)
            .ok_or_else(|| AttributeError::missing(key))
    }

    /// Intermediate read of a nested assignment.
    ///
    /// A missing key gets an empty struct, unless it starts with
    /// [`RESERVED_PREFIX`].
    pub fn get_or_create(&mut self, key: &str) -> Result<&mut StructValue, AttributeError> {
        if !self.fields.contains_key(key) {
            if key.starts_with(RESERVED_PREFIX) {
                return Err(AttributeError::missing(key));
            }
            self.fields
                .insert(key.to_string(), Value::Struct(StructValue::new()));
        }

        match self.fields.get_mut(key) {
            Some(Value::Struct(inner)) => Ok(inner),
            Some(other) => Err(AttributeError::NotAStruct {
                key: key.to_string(),
                found: other.type_name(),
            }),
            None => Err(AttributeError::missing(key)),
        }
    }

    /// Walk `path`, creating intermediate structs as needed.
    pub fn path_mut(&mut self, path: &[&str]) -> Result<&mut StructValue, AttributeError> {
        let mut current = self;
        for key in path {
            current = current.get_or_create(key)?;
        }
        Ok(current)
    }

    /// Chained assignment: `set_path(&["a", "b", "c"], 5)` is `a.b.c = 5`.
    pub fn set_path(&mut self, path: &[&str], value: impl Into<Value>) -> Result<(), AttributeError> {
        let Some((last, parents)) = path.split_last() else {
            return Err(AttributeError::missing(""));
        };
        self.path_mut(parents)?.insert(*last, value);
        Ok(())
    }

    /// Chained terminal read: every key along `path` must exist.
    pub fn get_path(&self, path: &[&str]) -> Result<&Value, AttributeError> {
        let Some((last, parents)) = path.split_last() else {
            return Err(AttributeError::missing(""));
        };

        let mut current = self;
        for key in parents {
            current = match current.get_or_fail(key)? {
                Value::Struct(inner) => inner,
                other => {
                    return Err(AttributeError::NotAStruct {
                        key: key.to_string(),
                        found: other.type_name(),
                    })
                }
            };
        }
        current.get_or_fail(last)
    }
}

impl Index<&str> for StructValue {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        match self.fields.get(key) {
            Some(value) => value,
            None => panic!("struct has no attribute `{}`", key),
        }
    }
}

/// Mutable indexing auto-vivifies missing keys, so `s["a"]["b"] = v` works.
impl IndexMut<&str> for StructValue {
    fn index_mut(&mut self, key: &str) -> &mut Value {
        if !self.fields.contains_key(key) && key.starts_with(RESERVED_PREFIX) {
            panic!("reserved attribute `{}` cannot be created", key);
        }
        self.fields
            .entry(key.to_string())
            .or_insert_with(|| Value::Struct(StructValue::new()))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for StructValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for StructValue {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for StructValue {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a StructValue {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
