//! Entity and annotation payload types
//!
//! Values carried by [`Annotation`](crate::Annotation): people, objects,
//! entity links, tokens, named entities, triples and display strings, plus the
//! categorical enums used in annotation tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use crate::codec::{identifier_field, Tagged};
use crate::container::AtomicContainer;
use crate::ld::{LdDeclaration, LdProperty, LinkedDataType};
use crate::{EmissorError, Identifier};

/// Namespace of people and objects
pub const N2MU_NAMESPACE: &str = "http://cltl.nl/leolani/n2mu";
/// Namespace of friend identifiers
pub const FRIENDS_NAMESPACE: &str = "http://cltl.nl/leolani/friends/";
/// Namespace of triple predicates
pub const PREDICATE_NAMESPACE: &str = "http://cltl.nl/combot/predicate/";

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Undefined,
    Female,
    Male,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Anger,
    Disgust,
    Fear,
    Joy,
    Sadness,
    Surprise,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Anger => "anger",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Surprise => "surprise",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Friend,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageLabel {
    Face,
}

/// Categorical annotation tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    Display,
    Person,
    Emotion,
    Friend,
    Object,
    Token,
    Pos,
    Ner,
    Link,
    Representation,
    Utterance,
    Triple,
}

impl AnnotationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationType::Display => "display",
            AnnotationType::Person => "person",
            AnnotationType::Emotion => "emotion",
            AnnotationType::Friend => "friend",
            AnnotationType::Object => "object",
            AnnotationType::Token => "token",
            AnnotationType::Pos => "pos",
            AnnotationType::Ner => "ner",
            AnnotationType::Link => "link",
            AnnotationType::Representation => "representation",
            AnnotationType::Utterance => "utterance",
            AnnotationType::Triple => "triple",
        }
    }
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationType {
    type Err = EmissorError;

    /// Case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let annotation_type = match s.to_ascii_lowercase().as_str() {
            "display" => AnnotationType::Display,
            "person" => AnnotationType::Person,
            "emotion" => AnnotationType::Emotion,
            "friend" => AnnotationType::Friend,
            "object" => AnnotationType::Object,
            "token" => AnnotationType::Token,
            "pos" => AnnotationType::Pos,
            "ner" => AnnotationType::Ner,
            "link" => AnnotationType::Link,
            "representation" => AnnotationType::Representation,
            "utterance" => AnnotationType::Utterance,
            "triple" => AnnotationType::Triple,
            _ => return Err(EmissorError::unsupported(s, "unknown annotation type")),
        };
        Ok(annotation_type)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Common ancestor of the entity types; every context maps `id` to `@id`
fn entity_base() -> LdDeclaration {
    LdDeclaration::new("Entity")
}

/// Generic entity reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, with = "identifier_field")]
    pub id: Option<Identifier>,
    #[serde(default, rename = "type")]
    pub entity_type: Option<EntityType>,
}

impl Entity {
    pub fn new(id: impl Into<Identifier>, entity_type: EntityType) -> Self {
        Self {
            id: Some(id.into()),
            entity_type: Some(entity_type),
        }
    }
}

impl Tagged for Entity {
    const TYPE_TAG: &'static str = "annotation-Entity";
}

impl LinkedDataType for Entity {
    fn ld_declaration() -> LdDeclaration {
        entity_base().field("type")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, with = "identifier_field")]
    pub id: Option<Identifier>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: i64,
    #[serde(default)]
    pub gender: Gender,
}

impl Person {
    pub fn new(id: impl Into<Identifier>, name: impl Into<String>, age: i64, gender: Gender) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            age,
            gender,
        }
    }
}

impl Tagged for Person {
    const TYPE_TAG: &'static str = "entity-Person";
}

impl LinkedDataType for Person {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("Person")
            .namespace(N2MU_NAMESPACE)
            .field("name")
            .field("age")
            .field("gender")
            .extends(entity_base())
    }
}

/// A person known to the agent; same shape as [`Person`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Friend(pub Person);

impl Deref for Friend {
    type Target = Person;

    fn deref(&self) -> &Person {
        &self.0
    }
}

impl DerefMut for Friend {
    fn deref_mut(&mut self) -> &mut Person {
        &mut self.0
    }
}

impl Tagged for Friend {
    const TYPE_TAG: &'static str = "entity-Friend";
}

impl LinkedDataType for Friend {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("Friend")
            .namespace(N2MU_NAMESPACE)
            .extends(Person::ld_declaration())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    #[serde(default, with = "identifier_field")]
    pub id: Option<Identifier>,
    #[serde(default)]
    pub label: String,
}

impl Object {
    pub fn new(id: impl Into<Identifier>, label: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label: label.into(),
        }
    }
}

impl Tagged for Object {
    const TYPE_TAG: &'static str = "entity-Object";
}

impl LinkedDataType for Object {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("Object")
            .namespace(N2MU_NAMESPACE)
            .field("label")
            .extends(entity_base())
    }
}

/// Link from a mention to a knowledge-base entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLink {
    #[serde(default, with = "identifier_field")]
    pub id: Option<Identifier>,
}

impl EntityLink {
    pub fn new(id: impl Into<Identifier>) -> Self {
        Self { id: Some(id.into()) }
    }
}

impl Tagged for EntityLink {
    const TYPE_TAG: &'static str = "annotation-EntityLink";
}

impl LinkedDataType for EntityLink {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("EntityLink").extends(entity_base())
    }
}

// ============================================================================
// Tokens
// ============================================================================

macro_rules! define_string_atom {
    ($name:ident, $tag:literal, $ld_type:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub AtomicContainer<String>);

        impl $name {
            /// Atomic container for `value` with a generated identifier
            pub fn for_string(value: impl Into<String>) -> Self {
                Self(AtomicContainer::for_value(value.into()))
            }

            pub fn value(&self) -> &str {
                &self.0.value
            }
        }

        impl Deref for $name {
            type Target = AtomicContainer<String>;

            fn deref(&self) -> &AtomicContainer<String> {
                &self.0
            }
        }

        impl Tagged for $name {
            const TYPE_TAG: &'static str = $tag;
        }

        impl LinkedDataType for $name {
            fn ld_declaration() -> LdDeclaration {
                LdDeclaration::new($ld_type).extends(AtomicContainer::<String>::ld_declaration())
            }
        }
    };
}

define_string_atom!(Token, "annotation-Token", "Token");
define_string_atom!(Ner, "annotation-NER", "NER");

// ============================================================================
// Triple / Display
// ============================================================================

/// Subject-predicate-object statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    #[serde(default)]
    pub subject: Entity,
    #[serde(default, with = "identifier_field")]
    pub predicate: Option<Identifier>,
    #[serde(default)]
    pub object: Entity,
}

impl Triple {
    /// Statement between two friends, resolved under the friends and
    /// predicate namespaces
    pub fn from_friends(subject_id: &str, predicate_id: &str, object_id: &str) -> Self {
        let friend = |id: &str| Entity::new(format!("{FRIENDS_NAMESPACE}{id}"), EntityType::Friend);
        Self {
            subject: friend(subject_id),
            predicate: Some(Identifier::from(format!("{PREDICATE_NAMESPACE}{predicate_id}"))),
            object: friend(object_id),
        }
    }
}

impl Tagged for Triple {
    const TYPE_TAG: &'static str = "annotation-Triple";
}

impl LinkedDataType for Triple {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("Triple")
            .field("subject")
            .property(LdProperty::new("predicate").id_ref())
            .field("object")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    #[serde(default)]
    pub display: String,
}

impl Display {
    pub fn new(display: impl Into<String>) -> Self {
        Self {
            display: display.into(),
        }
    }
}

impl Tagged for Display {
    const TYPE_TAG: &'static str = "annotation-Display";
}

impl LinkedDataType for Display {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("Display").field("display")
    }
}
