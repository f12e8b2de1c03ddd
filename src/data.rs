// src/data.rs

//! Shared value types for job and workflow data.
//!
//! - [`DataValue`] is the tagged scalar stored in data bags (string, number,
//!   boolean or null), matching what the persisted document format can carry.
//! - [`DataMap`] is an insertion-ordered key/value bag. Reads hand out clones
//!   so callers can never mutate graph internals through a data accessor.
//! - [`PathList`] normalizes the "one path or many" argument shape accepted
//!   by job definitions into a plain `Vec<String>`.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A scalar value attached to a job or workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl DataValue {
    /// Text form used when a value is substituted into a template or
    /// exported as a build variable. `Null` renders as the empty string.
    pub fn as_text(&self) -> String {
        match self {
            DataValue::Null => String::new(),
            DataValue::Bool(b) => b.to_string(),
            DataValue::Int(n) => n.to_string(),
            DataValue::Float(x) => x.to_string(),
            DataValue::Str(s) => s.clone(),
        }
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::Str(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::Str(s)
    }
}

impl From<i64> for DataValue {
    fn from(n: i64) -> Self {
        DataValue::Int(n)
    }
}

impl From<f64> for DataValue {
    fn from(x: f64) -> Self {
        DataValue::Float(x)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Bool(b)
    }
}

/// An ordered string-keyed bag of [`DataValue`]s.
///
/// Keys keep their first-insertion position; overwriting a key keeps its
/// position. Equality is map equality (order-insensitive), because two
/// workflows carrying the same data in a different declaration order are
/// still the same workflow.
#[derive(Debug, Clone, Default)]
pub struct DataMap {
    entries: Vec<(String, DataValue)>,
}

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or overwrite; an overwritten key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<DataValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<DataValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl PartialEq for DataMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

impl FromIterator<(String, DataValue)> for DataMap {
    fn from_iter<I: IntoIterator<Item = (String, DataValue)>>(iter: I) -> Self {
        let mut map = DataMap::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

impl Serialize for DataMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DataMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DataMapVisitor;

        impl<'de> Visitor<'de> for DataMapVisitor {
            type Value = DataMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<DataMap, A::Error> {
                let mut map = DataMap::new();
                while let Some((key, value)) = access.next_entry::<String, DataValue>()? {
                    map.set(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(DataMapVisitor)
    }
}

/// One path or many, as accepted by job definitions.
///
/// Callers can hand a single `&str` where a list would be overkill; the
/// workflow always works on the normalized `Vec<String>` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathList {
    Single(String),
    Many(Vec<String>),
}

impl PathList {
    pub fn empty() -> Self {
        PathList::Many(Vec::new())
    }

    pub fn into_vec(self) -> Vec<String> {
        match self {
            PathList::Single(path) => vec![path],
            PathList::Many(paths) => paths,
        }
    }
}

impl From<&str> for PathList {
    fn from(path: &str) -> Self {
        PathList::Single(path.to_string())
    }
}

impl From<String> for PathList {
    fn from(path: String) -> Self {
        PathList::Single(path)
    }
}

impl From<Vec<String>> for PathList {
    fn from(paths: Vec<String>) -> Self {
        PathList::Many(paths)
    }
}

impl From<Vec<&str>> for PathList {
    fn from(paths: Vec<&str>) -> Self {
        PathList::Many(paths.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PathList {
    fn from(paths: [&str; N]) -> Self {
        PathList::Many(paths.iter().map(|p| p.to_string()).collect())
    }
}

impl From<&[&str]> for PathList {
    fn from(paths: &[&str]) -> Self {
        PathList::Many(paths.iter().map(|p| p.to_string()).collect())
    }
}
