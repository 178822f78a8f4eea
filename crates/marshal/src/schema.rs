//! Record schemas
//!
//! A [`Structured`] type describes the fields of its JSON form. The registry
//! uses the description to register nested record types and to decorate every
//! record in a document with its linked-data context.

use ndarray::ArrayD;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;
use std::collections::BTreeMap;

use representation::{
    Annotation, AnnotationValue, ArrayContainer, AtomicContainer, AtomicRuler, AudioSignal,
    Display, Emotion, Entity, EntityLink, EntityType, Friend, Gender, Identifier, ImageSignal,
    Index, LinkedDataType, Mention, Modality, MultiIndex, Ner, Object, Person, Scenario,
    ScenarioContext, Segment, Sequence, Tagged, TemporalContainer, TemporalRuler, TextSignal,
    Token, Triple, VideoSignal,
};

use crate::registry::TypeRegistryBuilder;

/// Record type known to the engine
pub trait Structured: Serialize + DeserializeOwned + Tagged + LinkedDataType + 'static {
    /// Fields of the JSON form, flattened members included
    fn fields() -> Vec<Field>;
}

/// Shape of a field value
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Primitive, enum, identifier, array or string map
    Plain,
    /// Nested record of a known type
    Record(RecordRef),
    List(Box<FieldKind>),
    Optional(Box<FieldKind>),
    /// Polymorphic value resolved through its type discriminator
    Any(AnyRef),
}

/// Named field of a record
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub fn of<T: FieldType>(name: &'static str) -> Self {
        Self {
            name,
            kind: T::field_kind(),
        }
    }
}

/// Reference to a nested record type
#[derive(Clone)]
pub struct RecordRef {
    pub type_id: TypeId,
    pub tag: &'static str,
    pub(crate) register: fn(&mut TypeRegistryBuilder),
}

impl RecordRef {
    pub fn of<T: Structured>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            tag: T::TYPE_TAG,
            register: register_nested::<T>,
        }
    }
}

impl std::fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordRef").field("tag", &self.tag).finish()
    }
}

/// Polymorphic field and the record types it admits
#[derive(Clone)]
pub struct AnyRef {
    pub field: &'static str,
    pub(crate) candidates: fn() -> Vec<RecordRef>,
}

impl AnyRef {
    pub fn candidates(&self) -> Vec<RecordRef> {
        (self.candidates)()
    }
}

impl std::fmt::Debug for AnyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyRef").field("field", &self.field).finish()
    }
}

fn register_nested<T: Structured>(builder: &mut TypeRegistryBuilder) {
    builder.insert::<T>();
}

/// Static field shape of a Rust type
pub trait FieldType {
    fn field_kind() -> FieldKind {
        FieldKind::Plain
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn field_kind() -> FieldKind {
        FieldKind::List(Box::new(T::field_kind()))
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn field_kind() -> FieldKind {
        FieldKind::Optional(Box::new(T::field_kind()))
    }
}

macro_rules! plain_field_types {
    ($($ty:ty),* $(,)?) => {
        $(impl FieldType for $ty {})*
    };
}

plain_field_types!(
    bool,
    i64,
    usize,
    f64,
    char,
    String,
    Identifier,
    [i64; 4],
    ArrayD<f64>,
    BTreeMap<String, String>,
    Modality,
    Gender,
    Emotion,
    EntityType,
);

/// Implement [`Structured`] and [`FieldType`] for a non-generic record type
macro_rules! structured {
    ($ty:ty { $($name:literal : $field_ty:ty),* $(,)? }) => {
        impl Structured for $ty {
            fn fields() -> Vec<Field> {
                vec![$(Field::of::<$field_ty>($name)),*]
            }
        }

        impl FieldType for $ty {
            fn field_kind() -> FieldKind {
                FieldKind::Record(RecordRef::of::<$ty>())
            }
        }
    };
}

// ===== Rulers =====

structured!(Index {
    "container_id": Option<Identifier>,
    "start": i64,
    "stop": i64,
});

structured!(MultiIndex {
    "container_id": Option<Identifier>,
    "bounds": [i64; 4],
});

structured!(TemporalRuler {
    "container_id": Option<Identifier>,
    "start": i64,
    "end": i64,
});

structured!(AtomicRuler {
    "container_id": Option<Identifier>,
});

// ===== Containers =====

impl<T> Structured for Sequence<T>
where
    T: FieldType + Serialize + DeserializeOwned + 'static,
{
    fn fields() -> Vec<Field> {
        vec![
            Field::of::<Identifier>("id"),
            Field::of::<Index>("ruler"),
            Field::of::<Vec<T>>("seq"),
        ]
    }
}

impl<T> FieldType for Sequence<T>
where
    T: FieldType + Serialize + DeserializeOwned + 'static,
{
    fn field_kind() -> FieldKind {
        FieldKind::Record(RecordRef::of::<Self>())
    }
}

structured!(ArrayContainer {
    "id": Identifier,
    "ruler": MultiIndex,
    "array": Option<ArrayD<f64>>,
});

structured!(TemporalContainer {
    "id": Identifier,
    "ruler": TemporalRuler,
});

impl<T> Structured for AtomicContainer<T>
where
    T: FieldType + Serialize + DeserializeOwned + 'static,
{
    fn fields() -> Vec<Field> {
        vec![
            Field::of::<Identifier>("id"),
            Field::of::<AtomicRuler>("ruler"),
            Field::of::<T>("value"),
        ]
    }
}

impl<T> FieldType for AtomicContainer<T>
where
    T: FieldType + Serialize + DeserializeOwned + 'static,
{
    fn field_kind() -> FieldKind {
        FieldKind::Record(RecordRef::of::<Self>())
    }
}

// ===== Entities =====

structured!(Entity {
    "id": Option<Identifier>,
    "type": Option<EntityType>,
});

structured!(Person {
    "id": Option<Identifier>,
    "name": String,
    "age": i64,
    "gender": Gender,
});

structured!(Friend {
    "id": Option<Identifier>,
    "name": String,
    "age": i64,
    "gender": Gender,
});

structured!(Object {
    "id": Option<Identifier>,
    "label": String,
});

structured!(EntityLink {
    "id": Option<Identifier>,
});

structured!(Token {
    "id": Identifier,
    "ruler": AtomicRuler,
    "value": String,
});

structured!(Ner {
    "id": Identifier,
    "ruler": AtomicRuler,
    "value": String,
});

structured!(Triple {
    "subject": Entity,
    "predicate": Option<Identifier>,
    "object": Entity,
});

structured!(Display { "display": String });

// ===== Polymorphic fields =====

impl FieldType for AnnotationValue {
    fn field_kind() -> FieldKind {
        FieldKind::Any(AnyRef {
            field: "value",
            candidates: annotation_value_candidates,
        })
    }
}

fn annotation_value_candidates() -> Vec<RecordRef> {
    vec![
        RecordRef::of::<Entity>(),
        RecordRef::of::<Person>(),
        RecordRef::of::<Friend>(),
        RecordRef::of::<Object>(),
        RecordRef::of::<EntityLink>(),
        RecordRef::of::<Token>(),
        RecordRef::of::<Ner>(),
        RecordRef::of::<Triple>(),
        RecordRef::of::<Display>(),
    ]
}

impl FieldType for Segment {
    fn field_kind() -> FieldKind {
        FieldKind::Any(AnyRef {
            field: "segment",
            candidates: segment_candidates,
        })
    }
}

fn segment_candidates() -> Vec<RecordRef> {
    vec![
        RecordRef::of::<Index>(),
        RecordRef::of::<MultiIndex>(),
        RecordRef::of::<TemporalRuler>(),
        RecordRef::of::<AtomicRuler>(),
    ]
}

// ===== Scenario model =====

impl<T> Structured for Annotation<T>
where
    T: FieldType + Serialize + DeserializeOwned + 'static,
{
    fn fields() -> Vec<Field> {
        vec![
            Field::of::<String>("type"),
            Field::of::<T>("value"),
            Field::of::<Option<Identifier>>("source"),
            Field::of::<i64>("timestamp"),
        ]
    }
}

impl<T> FieldType for Annotation<T>
where
    T: FieldType + Serialize + DeserializeOwned + 'static,
{
    fn field_kind() -> FieldKind {
        FieldKind::Record(RecordRef::of::<Self>())
    }
}

structured!(Mention {
    "id": Identifier,
    "segment": Vec<Segment>,
    "annotations": Vec<Annotation>,
});

structured!(TextSignal {
    "id": Identifier,
    "ruler": Index,
    "seq": Vec<char>,
    "modality": Modality,
    "time": TemporalRuler,
    "files": Vec<String>,
    "mentions": Vec<Mention>,
});

macro_rules! structured_array_signal {
    ($($signal:ty),*) => {
        $(structured!($signal {
            "id": Identifier,
            "ruler": MultiIndex,
            "array": Option<ArrayD<f64>>,
            "modality": Modality,
            "time": TemporalRuler,
            "files": Vec<String>,
            "mentions": Vec<Mention>,
        });)*
    };
}

structured_array_signal!(ImageSignal, AudioSignal, VideoSignal);

structured!(ScenarioContext {
    "agent": Option<Identifier>,
    "speaker": Option<Person>,
    "persons": Vec<Person>,
    "objects": Vec<Object>,
});

structured!(Scenario {
    "id": Identifier,
    "ruler": TemporalRuler,
    "context": ScenarioContext,
    "signals": BTreeMap<String, String>,
});
