//! Factories for annotation tooling
//!
//! Fresh mentions, default annotations per category and segments spanning a
//! whole signal, ready to be edited and attached.

use crate::signal::unix_now;
use crate::{
    Annotation, AnnotationType, AnnotationValue, AtomicRuler, EmissorError, Entity, EntityLink,
    EntityType, Gender, Identifier, Index, Mention, MultiIndex, Person, Result, Segment, Signal,
    TemporalRuler, Triple,
};

/// Empty mention with a generated id
pub fn new_mention() -> Mention {
    Mention::new(Identifier::generate(), Vec::new(), Vec::new())
}

/// Annotation with a placeholder value for `category`, stamped now.
///
/// Supported categories: person, display, pos, emotion, triple, link
/// (case-insensitive).
///
/// # Errors
/// `UnsupportedType` for any other category
pub fn new_annotation(category: &str, source: impl Into<Identifier>) -> Result<Annotation> {
    let unsupported = || EmissorError::unsupported(category, "no default annotation for category");
    let annotation_type: AnnotationType = category.parse().map_err(|_| unsupported())?;

    let value = match annotation_type {
        AnnotationType::Person => AnnotationValue::Person(Person::new(
            Identifier::generate(),
            "",
            0,
            Gender::Undefined,
        )),
        AnnotationType::Display => AnnotationValue::from("new"),
        AnnotationType::Pos => AnnotationValue::from("POS-TAG"),
        AnnotationType::Emotion => AnnotationValue::from(crate::Emotion::Neutral.as_str()),
        AnnotationType::Triple => {
            let placeholder = || Entity {
                id: None,
                entity_type: Some(EntityType::Person),
            };
            AnnotationValue::Triple(Triple {
                subject: placeholder(),
                predicate: None,
                object: placeholder(),
            })
        }
        AnnotationType::Link => AnnotationValue::EntityLink(EntityLink::new(Identifier::generate())),
        _ => return Err(unsupported()),
    };

    Ok(Annotation::new(annotation_type.as_str(), value, source, unix_now()))
}

/// Segment of kind `kind` spanning the whole of `signal`.
///
/// `container_id` defaults to the signal's id. Kinds: index, multiindex,
/// atomic, temporal (case-insensitive).
///
/// # Errors
/// `UnsupportedType` for an unknown kind, or a range kind the signal is not
/// addressed by
pub fn new_segment<S>(kind: &str, signal: &S, container_id: Option<Identifier>) -> Result<Segment>
where
    S: Signal,
    S::Ruler: Clone + Into<Segment>,
{
    let container_id = container_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| signal.id().clone());
    let own: Segment = signal.ruler().clone().into();

    let segment = match (kind.to_ascii_lowercase().as_str(), own) {
        ("index", Segment::Index(ruler)) => {
            Index::new(container_id, ruler.start, ruler.stop).into()
        }
        ("multiindex", Segment::MultiIndex(ruler)) => {
            MultiIndex::new(container_id, ruler.bounds).into()
        }
        ("atomic", _) => AtomicRuler::new(container_id).into(),
        ("temporal", _) => {
            let time = signal.time();
            TemporalRuler::new(container_id, time.start, time.end).into()
        }
        (kind @ ("index" | "multiindex"), _) => {
            return Err(EmissorError::unsupported(
                kind,
                format!("signal is addressed by {:?} segments", signal.modality()),
            ))
        }
        (kind, _) => return Err(EmissorError::unsupported(kind, "unknown segment type")),
    };

    Ok(segment)
}
