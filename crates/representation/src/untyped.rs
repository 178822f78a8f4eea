//! Untyped JSON structures
//!
//! Read-only view of a JSON document for which no concrete type is known:
//! the result of loading without a target type, and the fallback for
//! polymorphic values whose discriminator cannot be resolved.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Untyped JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Untyped {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Untyped>),
    Record(UntypedRecord),
}

/// Untyped JSON object
///
/// Only keys that are valid identifiers and do not start with `_` are exposed
/// as fields, so linked-data keywords (`@context`, `@type`) and the type
/// discriminator never show up. The source object is kept whole and is what
/// gets written back, so a record loaded without its type persists unchanged.
/// Fields cannot be modified after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UntypedRecord {
    fields: BTreeMap<String, Untyped>,
    raw: Map<String, Value>,
}

impl UntypedRecord {
    /// Field value by name
    pub fn get(&self, name: &str) -> Option<&Untyped> {
        self.fields.get(name)
    }

    /// Field names in key order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Untyped)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Source object, reserved and non-identifier keys included
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    fn from_map(map: Map<String, Value>) -> Self {
        let fields = map
            .iter()
            .filter(|(key, _)| is_public_identifier(key))
            .map(|(key, value)| (key.clone(), Untyped::from(value.clone())))
            .collect();
        Self { fields, raw: map }
    }
}

impl Untyped {
    /// Record view, if this value is an object
    pub fn as_record(&self) -> Option<&UntypedRecord> {
        match self {
            Untyped::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Untyped::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Untyped::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Untyped]> {
        match self {
            Untyped::List(items) => Some(items),
            _ => None,
        }
    }

    /// Shortcut for `as_record()?.get(name)`
    pub fn get(&self, name: &str) -> Option<&Untyped> {
        self.as_record().and_then(|record| record.get(name))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Untyped::Null)
    }

    /// Plain JSON value of the visible fields only
    pub fn to_value(&self) -> Value {
        match self {
            Untyped::Null => Value::Null,
            Untyped::Bool(b) => Value::Bool(*b),
            Untyped::Number(n) => Value::Number(n.clone()),
            Untyped::String(s) => Value::String(s.clone()),
            Untyped::List(items) => Value::Array(items.iter().map(Untyped::to_value).collect()),
            Untyped::Record(record) => Value::Object(
                record
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
        }
    }
}

impl Untyped {
    /// The JSON value this was loaded from, hidden keys included
    pub fn to_raw_value(&self) -> Value {
        match self {
            Untyped::List(items) => Value::Array(items.iter().map(Untyped::to_raw_value).collect()),
            Untyped::Record(record) => Value::Object(record.raw.clone()),
            other => other.to_value(),
        }
    }
}

impl From<Value> for Untyped {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Untyped::Null,
            Value::Bool(b) => Untyped::Bool(b),
            Value::Number(n) => Untyped::Number(n),
            Value::String(s) => Untyped::String(s),
            Value::Array(items) => Untyped::List(items.into_iter().map(Untyped::from).collect()),
            Value::Object(map) => Untyped::Record(UntypedRecord::from_map(map)),
        }
    }
}

impl Serialize for Untyped {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_raw_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Untyped {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Untyped::from)
    }
}

/// Letters, digits and underscores, starting with a letter
fn is_public_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
