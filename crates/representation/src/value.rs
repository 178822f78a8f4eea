//! Polymorphic annotation values

use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::codec::{deserialize_any, resolve_any, serialize_any, AnyField, Tagged};
use crate::{
    AnnotationType, Display, Entity, EntityLink, Friend, Ner, Object, Person, Token, Triple,
    Untyped,
};

/// Value of an [`Annotation`](crate::Annotation)
///
/// Records are written with their type discriminator; primitives and lists
/// are written as plain JSON. Records whose discriminator cannot be resolved
/// load as [`AnnotationValue::Untyped`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<AnnotationValue>),
    Entity(Entity),
    Person(Person),
    Friend(Friend),
    Object(Object),
    EntityLink(EntityLink),
    Token(Token),
    Ner(Ner),
    Triple(Triple),
    Display(Display),
    Untyped(Untyped),
}

impl AnnotationValue {
    /// Annotation category matching the value's kind, if it has one
    pub fn kind(&self) -> Option<AnnotationType> {
        let kind = match self {
            AnnotationValue::Person(_) => AnnotationType::Person,
            AnnotationValue::Friend(_) => AnnotationType::Friend,
            AnnotationValue::Object(_) => AnnotationType::Object,
            AnnotationValue::EntityLink(_) => AnnotationType::Link,
            AnnotationValue::Token(_) => AnnotationType::Token,
            AnnotationValue::Ner(_) => AnnotationType::Ner,
            AnnotationValue::Triple(_) => AnnotationType::Triple,
            AnnotationValue::Display(_) => AnnotationType::Display,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_person(&self) -> Option<&Person> {
        match self {
            AnnotationValue::Person(person) => Some(person),
            AnnotationValue::Friend(friend) => Some(&friend.0),
            _ => None,
        }
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, AnnotationValue::Untyped(_))
    }
}

macro_rules! impl_from_value {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for AnnotationValue {
                fn from(value: $ty) -> Self {
                    AnnotationValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_value!(
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Entity(Entity),
    Person(Person),
    Friend(Friend),
    Object(Object),
    EntityLink(EntityLink),
    Token(Token),
    Ner(Ner),
    Triple(Triple),
    Display(Display),
);

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        AnnotationValue::Text(value.to_string())
    }
}

impl<T: Into<AnnotationValue>> From<Vec<T>> for AnnotationValue {
    fn from(values: Vec<T>) -> Self {
        AnnotationValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl AnyField for AnnotationValue {
    const FIELD: &'static str = "value";

    fn type_tag(&self) -> Option<&'static str> {
        match self {
            AnnotationValue::Entity(_) => Some(Entity::TYPE_TAG),
            AnnotationValue::Person(_) => Some(Person::TYPE_TAG),
            AnnotationValue::Friend(_) => Some(Friend::TYPE_TAG),
            AnnotationValue::Object(_) => Some(Object::TYPE_TAG),
            AnnotationValue::EntityLink(_) => Some(EntityLink::TYPE_TAG),
            AnnotationValue::Token(_) => Some(Token::TYPE_TAG),
            AnnotationValue::Ner(_) => Some(Ner::TYPE_TAG),
            AnnotationValue::Triple(_) => Some(Triple::TYPE_TAG),
            AnnotationValue::Display(_) => Some(Display::TYPE_TAG),
            _ => None,
        }
    }

    fn to_payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            AnnotationValue::Null => Ok(Value::Null),
            AnnotationValue::Boolean(b) => Ok(Value::Bool(*b)),
            AnnotationValue::Integer(n) => Ok(Value::from(*n)),
            AnnotationValue::Float(x) => serde_json::Number::from_f64(*x)
                .map(Value::Number)
                .ok_or_else(|| serde_json::Error::custom(format!("float value {x} is not finite"))),
            AnnotationValue::Text(s) => Ok(Value::String(s.clone())),
            AnnotationValue::List(items) => items
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            AnnotationValue::Entity(v) => serde_json::to_value(v),
            AnnotationValue::Person(v) => serde_json::to_value(v),
            AnnotationValue::Friend(v) => serde_json::to_value(v),
            AnnotationValue::Object(v) => serde_json::to_value(v),
            AnnotationValue::EntityLink(v) => serde_json::to_value(v),
            AnnotationValue::Token(v) => serde_json::to_value(v),
            AnnotationValue::Ner(v) => serde_json::to_value(v),
            AnnotationValue::Triple(v) => serde_json::to_value(v),
            AnnotationValue::Display(v) => serde_json::to_value(v),
            AnnotationValue::Untyped(raw) => Ok(raw.to_raw_value()),
        }
    }

    fn from_tagged(tag: &str, payload: Value) -> Option<Result<Self, serde_json::Error>> {
        let decoded = match tag {
            Entity::TYPE_TAG => serde_json::from_value(payload).map(AnnotationValue::Entity),
            Person::TYPE_TAG => serde_json::from_value(payload).map(AnnotationValue::Person),
            Friend::TYPE_TAG => serde_json::from_value(payload).map(AnnotationValue::Friend),
            Object::TYPE_TAG => serde_json::from_value(payload).map(AnnotationValue::Object),
            EntityLink::TYPE_TAG => {
                serde_json::from_value(payload).map(AnnotationValue::EntityLink)
            }
            Token::TYPE_TAG => serde_json::from_value(payload).map(AnnotationValue::Token),
            Ner::TYPE_TAG => serde_json::from_value(payload).map(AnnotationValue::Ner),
            Triple::TYPE_TAG => serde_json::from_value(payload).map(AnnotationValue::Triple),
            Display::TYPE_TAG => serde_json::from_value(payload).map(AnnotationValue::Display),
            _ => return None,
        };
        Some(decoded)
    }

    fn from_plain(value: Value) -> Result<Self, Value> {
        let resolved = match value {
            Value::Null => AnnotationValue::Null,
            Value::Bool(b) => AnnotationValue::Boolean(b),
            Value::String(s) => AnnotationValue::Text(s),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => AnnotationValue::Integer(i),
                (None, Some(x)) => AnnotationValue::Float(x),
                (None, None) => return Err(Value::Number(n)),
            },
            Value::Array(items) => {
                AnnotationValue::List(items.into_iter().map(resolve_any).collect())
            }
            other @ Value::Object(_) => return Err(other),
        };
        Ok(resolved)
    }

    fn unresolved(value: Untyped) -> Self {
        AnnotationValue::Untyped(value)
    }
}

impl Serialize for AnnotationValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_any(self, serializer)
    }
}

impl<'de> Deserialize<'de> for AnnotationValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_any(deserializer)
    }
}
