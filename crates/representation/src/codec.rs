//! Field codecs
//!
//! - [`AnyField`]: polymorphic values carried with an embedded type discriminator
//! - [`identifier_field`]: optional identifier references, `""` reads as absent
//! - [`array_field`]: optional N-dimensional arrays as nested lists, `""` for none

use metrics::counter;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::Untyped;

/// Key of the embedded type discriminator
pub const TYPE_KEY: &str = "_type";

/// Types with a stable wire discriminator (`<module>-<Type>`)
pub trait Tagged {
    const TYPE_TAG: &'static str;
}

/// A field whose static type admits several concrete payload types.
///
/// Records are written with their [`Tagged::TYPE_TAG`] under [`TYPE_KEY`];
/// plain JSON values (strings, numbers, lists) need no discriminator.
/// Loading never fails on an unknown, missing or malformed discriminator:
/// the value degrades to [`Untyped`] and a warning is logged.
pub trait AnyField: Sized {
    /// Field name used in logs and metrics
    const FIELD: &'static str;

    /// Discriminator of the runtime value, `None` for plain values
    fn type_tag(&self) -> Option<&'static str>;

    /// Payload serialized with the runtime value's own type
    fn to_payload(&self) -> Result<Value, serde_json::Error>;

    /// Decode a record carrying `tag`; `None` if the tag is not known
    fn from_tagged(tag: &str, payload: Value) -> Option<Result<Self, serde_json::Error>>;

    /// Decode an untagged, non-record value; gives the value back if it
    /// cannot be represented
    fn from_plain(value: Value) -> Result<Self, Value>;

    /// Fallback for values that could not be resolved
    fn unresolved(value: Untyped) -> Self;
}

/// Serialize an [`AnyField`] with its discriminator
pub fn serialize_any<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AnyField,
    S: Serializer,
{
    let payload = value.to_payload().map_err(S::Error::custom)?;
    match (value.type_tag(), payload) {
        (Some(tag), Value::Object(mut map)) => {
            map.insert(TYPE_KEY.to_string(), Value::String(tag.to_string()));
            map.serialize(serializer)
        }
        (_, payload) => payload.serialize(serializer),
    }
}

/// Deserialize an [`AnyField`], degrading instead of failing
pub fn deserialize_any<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: AnyField,
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(resolve_any(value))
}

/// Resolve a JSON value to a concrete [`AnyField`] variant
pub fn resolve_any<T: AnyField>(value: Value) -> T {
    let Value::Object(map) = value else {
        return match T::from_plain(value) {
            Ok(resolved) => resolved,
            Err(value) => degrade(value, "plain value where a record was expected", None),
        };
    };

    let tag = match map.get(TYPE_KEY) {
        Some(Value::String(tag)) => tag.clone(),
        Some(_) => return degrade(Value::Object(map), "malformed discriminator", None),
        None => return degrade(Value::Object(map), "missing discriminator", None),
    };

    let payload = Value::Object(map);
    match T::from_tagged(&tag, payload.clone()) {
        Some(Ok(resolved)) => resolved,
        Some(Err(e)) => {
            warn!(field = T::FIELD, error = %e, "payload decode error");
            degrade(payload, "payload does not match its type", Some(&tag))
        }
        None => degrade(payload, "unknown discriminator", Some(&tag)),
    }
}

fn degrade<T: AnyField>(value: Value, reason: &'static str, tag: Option<&str>) -> T {
    warn!(
        field = T::FIELD,
        type_tag = tag.unwrap_or(""),
        reason,
        "type resolution failed, keeping untyped value"
    );
    counter!("emissor_type_resolution_failures_total", "field" => T::FIELD).increment(1);
    T::unresolved(Untyped::from(value))
}

/// Optional identifier references
///
/// Written as the identifier string or `null`; the empty identifier is
/// written as `null`, and `""` and `null` both read as absent. Use with
/// `#[serde(default, with = "identifier_field")]`.
pub mod identifier_field {
    use super::*;
    use crate::Identifier;

    pub fn serialize<S>(value: &Option<Identifier>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(id) if !id.is_empty() => serializer.serialize_str(id),
            _ => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Identifier>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()).map(Identifier::from))
    }
}

/// Optional N-dimensional arrays
///
/// `None` is written as the empty string sentinel, arrays as nested lists.
/// The shape is inferred on load; ragged nesting is rejected. Elements must be
/// finite, and only one-dimensional arrays may be empty, since nested lists
/// cannot carry the trailing axes of an empty array.
pub mod array_field {
    use super::*;
    use ndarray::{ArrayD, ArrayViewD, IxDyn};

    pub fn serialize<S>(value: &Option<ArrayD<f64>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(array) => to_nested(array.view())
                .map_err(S::Error::custom)?
                .serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<ArrayD<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            value => from_nested(&value).map(Some).map_err(D::Error::custom),
        }
    }

    /// Nested-list form of an array view
    pub fn to_nested(view: ArrayViewD<'_, f64>) -> Result<Value, String> {
        if view.is_empty() && view.ndim() != 1 {
            return Err(format!(
                "empty array of shape {:?} has no nested-list form",
                view.shape()
            ));
        }
        nest(view)
    }

    fn nest(view: ArrayViewD<'_, f64>) -> Result<Value, String> {
        if view.ndim() == 0 {
            return match view.iter().next() {
                Some(x) => number(*x),
                None => Ok(Value::Null),
            };
        }
        view.outer_iter()
            .map(nest)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    /// Array from its nested-list form
    pub fn from_nested(value: &Value) -> Result<ArrayD<f64>, String> {
        let mut shape = Vec::new();
        let mut current = value;
        while let Value::Array(items) = current {
            shape.push(items.len());
            match items.first() {
                Some(first) => current = first,
                None => break,
            }
        }

        shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| format!("array shape {shape:?} is too large"))?;

        let mut data = Vec::new();
        flatten(value, 0, &shape, &mut data)?;
        ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|e| e.to_string())
    }

    fn flatten(value: &Value, depth: usize, shape: &[usize], out: &mut Vec<f64>) -> Result<(), String> {
        if depth == shape.len() {
            return match value.as_f64() {
                Some(x) => {
                    out.push(x);
                    Ok(())
                }
                _ => Err(format!("array element must be numeric, got {value}")),
            };
        }
        match value {
            Value::Array(items) if items.len() == shape[depth] => items
                .iter()
                .try_for_each(|item| flatten(item, depth + 1, shape, out)),
            _ => Err(format!("ragged array at depth {depth}, expected shape {shape:?}")),
        }
    }

    fn number(x: f64) -> Result<Value, String> {
        serde_json::Number::from_f64(x)
            .map(Value::Number)
            .ok_or_else(|| format!("array element {x} is not finite"))
    }
}
