//! # Representation
//!
//! Typed data model for multimodal scenario data (text, image, audio, video).
//! The serialization engine, config loader and observability crates depend on
//! this crate; it depends on none of them.
//!
//! ## Addressing model
//! - A [`Ruler`] locates a segment inside a container: character offsets
//!   ([`Index`]), a bounding box ([`MultiIndex`]), a time span in milliseconds
//!   ([`TemporalRuler`]) or plain identity ([`AtomicRuler`]).
//! - A [`Container`] owns a ruler spanning its own extent and resolves a
//!   narrower ruler to a slice of its payload.
//! - Signals are containers anchored in scenario time; mentions point into
//!   signals and carry annotations with polymorphic values.

mod assembly;
mod codec;
mod config;
mod container;
mod entity;
mod error;
mod identifier;
pub mod ld;
mod ruler;
mod scenario;
mod signal;
mod untyped;
mod value;

pub use assembly::{new_annotation, new_mention, new_segment};
pub use codec::{array_field, identifier_field, AnyField, Tagged, TYPE_KEY};
pub use config::{CodecConfig, LinkedDataConfig, MarshalOptions};
pub use container::{ArrayContainer, AtomicContainer, Container, Sequence, TemporalContainer};
pub use entity::*;
pub use error::*;
pub use identifier::Identifier;
pub use ld::{LdContext, LdDeclaration, LdProperty, LinkedDataType, EMISSOR_NAMESPACE};
pub use ruler::{AtomicRuler, Index, MultiIndex, Ruler, Segment, TemporalRuler};
pub use scenario::{Scenario, ScenarioContext};
pub use signal::*;
pub use untyped::{Untyped, UntypedRecord};
pub use value::AnnotationValue;
