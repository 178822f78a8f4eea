//! Signals, mentions and annotations
//!
//! A signal is a container anchored in scenario time. Mentions point into a
//! signal through a list of segments and carry annotations. The unit of
//! persistence is the whole signal: callers locate a mention, append an
//! annotation and marshal the signal again.

use ndarray::{ArrayD, ArrayViewD};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::codec::{identifier_field, Tagged};
use crate::container::{container_declaration, ArrayContainer, Container, Sequence};
use crate::ld::{LdDeclaration, LdProperty, LinkedDataType};
use crate::{
    AnnotationValue, EmissorError, Identifier, Index, MultiIndex, Result, Segment, TemporalRuler,
};

// ============================================================================
// Modality
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Image,
    Text,
    Audio,
    Video,
}

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality::Image,
        Modality::Text,
        Modality::Audio,
        Modality::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Image => "image",
            Modality::Text => "text",
            Modality::Audio => "audio",
            Modality::Video => "video",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = EmissorError;

    fn from_str(s: &str) -> Result<Self> {
        Modality::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EmissorError::unsupported(s, "unknown modality"))
    }
}

// ============================================================================
// Annotation / Mention
// ============================================================================

/// Typed, sourced, timestamped value attached to a mention.
///
/// `annotation_type` is a lower-case category tag. It is not tied to the
/// runtime kind of `value`; [`Annotation::typed`] derives it when the value
/// has a natural category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation<T = AnnotationValue> {
    #[serde(rename = "type")]
    pub annotation_type: String,
    pub value: T,
    /// Producing component
    #[serde(default, with = "identifier_field")]
    pub source: Option<Identifier>,
    /// Unix seconds
    #[serde(default)]
    pub timestamp: i64,
}

impl<T> Annotation<T> {
    pub fn new(
        annotation_type: impl AsRef<str>,
        value: T,
        source: impl Into<Identifier>,
        timestamp: i64,
    ) -> Self {
        Self {
            annotation_type: annotation_type.as_ref().to_lowercase(),
            value,
            source: Some(source.into()).filter(|s: &Identifier| !s.is_empty()),
            timestamp,
        }
    }
}

impl Annotation<AnnotationValue> {
    /// Annotation whose type is derived from the value's kind, stamped now.
    ///
    /// # Errors
    /// `UnsupportedType` for values without a category (primitives, lists,
    /// untyped records)
    pub fn typed(value: impl Into<AnnotationValue>, source: impl Into<Identifier>) -> Result<Self> {
        let value = value.into();
        let kind = value.kind().ok_or_else(|| {
            EmissorError::unsupported(
                format!("{value:?}"),
                "annotation type cannot be derived from this value",
            )
        })?;
        Ok(Self::new(kind.as_str(), value, source, unix_now()))
    }
}

impl<T> Tagged for Annotation<T> {
    const TYPE_TAG: &'static str = "scenario-Annotation";
}

impl<T> LinkedDataType for Annotation<T> {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("Annotation")
            .field("type")
            .field("value")
            .property(LdProperty::new("source").id_ref())
            .field("timestamp")
    }
}

/// Current time in unix seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Segments of a signal plus the annotations describing them.
/// An empty segment list annotates the whole signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub id: Identifier,
    #[serde(default)]
    pub segment: Vec<Segment>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Mention {
    pub fn new(id: impl Into<Identifier>, segment: Vec<Segment>, annotations: Vec<Annotation>) -> Self {
        Self {
            id: id.into(),
            segment,
            annotations,
        }
    }

    pub fn is_whole_signal(&self) -> bool {
        self.segment.is_empty()
    }

    /// Annotations of one category
    pub fn annotations_of_type<'a>(
        &'a self,
        annotation_type: &'a str,
    ) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations
            .iter()
            .filter(move |a| a.annotation_type.eq_ignore_ascii_case(annotation_type))
    }
}

impl Tagged for Mention {
    const TYPE_TAG: &'static str = "scenario-Mention";
}

impl LinkedDataType for Mention {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("Mention")
            .field("segment")
            .field("annotations")
    }
}

// ============================================================================
// Signal
// ============================================================================

/// Fields shared by every signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMeta {
    pub modality: Modality,
    /// Position in scenario time; `container_id` is the scenario id
    pub time: TemporalRuler,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
}

impl SignalMeta {
    pub fn for_scenario(
        modality: Modality,
        scenario_id: impl Into<Identifier>,
        start: i64,
        stop: i64,
        file: impl Into<String>,
        mentions: Vec<Mention>,
    ) -> Self {
        Self {
            modality,
            time: TemporalRuler::new(scenario_id, start, stop),
            files: vec![file.into()],
            mentions,
        }
    }
}

fn signal_declaration() -> LdDeclaration {
    LdDeclaration::new("Signal")
        .field("modality")
        .field("time")
        .field("files")
        .field("mentions")
        .extends(container_declaration())
}

/// Container anchored in scenario time
pub trait Signal: Container {
    fn meta(&self) -> &SignalMeta;

    fn meta_mut(&mut self) -> &mut SignalMeta;

    fn modality(&self) -> Modality {
        self.meta().modality
    }

    fn time(&self) -> &TemporalRuler {
        &self.meta().time
    }

    fn files(&self) -> &[String] {
        &self.meta().files
    }

    fn mentions(&self) -> &[Mention] {
        &self.meta().mentions
    }

    /// Mention by id.
    ///
    /// # Errors
    /// `NotFound` if the signal has no such mention
    fn mention(&self, mention_id: &str) -> Result<&Mention> {
        self.meta()
            .mentions
            .iter()
            .find(|m| m.id == mention_id)
            .ok_or_else(|| EmissorError::not_found("mention", mention_id))
    }

    fn mention_mut(&mut self, mention_id: &str) -> Result<&mut Mention> {
        self.meta_mut()
            .mentions
            .iter_mut()
            .find(|m| m.id == mention_id)
            .ok_or_else(|| EmissorError::not_found("mention", mention_id))
    }

    fn add_mention(&mut self, mention: Mention) {
        self.meta_mut().mentions.push(mention);
    }

    /// Append `annotation` to the mention with `mention_id`.
    ///
    /// # Errors
    /// `NotFound` if the signal has no such mention
    fn add_annotation(&mut self, mention_id: &str, annotation: Annotation) -> Result<()> {
        let signal_id = self.id().clone();
        let mention = self.mention_mut(mention_id)?;
        debug!(
            signal_id = %signal_id,
            mention_id,
            annotation_type = %annotation.annotation_type,
            "adding annotation"
        );
        mention.annotations.push(annotation);
        Ok(())
    }
}

// ============================================================================
// TextSignal
// ============================================================================

/// Text as a sequence of characters, addressed by character offsets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSignal {
    #[serde(flatten)]
    pub container: Sequence<char>,
    #[serde(flatten)]
    pub meta: SignalMeta,
}

impl TextSignal {
    /// Signal over `text` placed at `[start, stop)` in scenario time.
    ///
    /// The ruler spans `[0, char_count)` and points at the signal itself.
    pub fn for_scenario(
        scenario_id: impl Into<Identifier>,
        start: i64,
        stop: i64,
        file: impl Into<String>,
        text: &str,
        mentions: Vec<Mention>,
        signal_id: Option<Identifier>,
    ) -> Self {
        let id = signal_id.unwrap_or_else(Identifier::generate);
        Self {
            container: Sequence::with_id(id, text.chars()),
            meta: SignalMeta::for_scenario(Modality::Text, scenario_id, start, stop, file, mentions),
        }
    }

    pub fn text(&self) -> String {
        self.container.seq.iter().collect()
    }

    /// Text addressed by `segment`
    pub fn text_segment(&self, segment: &Index) -> Result<String> {
        Ok(self.container.get_segment(segment)?.iter().collect())
    }
}

impl Container for TextSignal {
    type Ruler = Index;
    type Segment<'a> = &'a [char];

    fn id(&self) -> &Identifier {
        &self.container.id
    }

    fn ruler(&self) -> &Index {
        &self.container.ruler
    }

    fn get_segment<'a>(&'a self, segment: &Index) -> Result<&'a [char]> {
        self.container.get_segment(segment)
    }
}

impl Signal for TextSignal {
    fn meta(&self) -> &SignalMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SignalMeta {
        &mut self.meta
    }
}

impl Tagged for TextSignal {
    const TYPE_TAG: &'static str = "scenario-TextSignal";
}

impl LinkedDataType for TextSignal {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("TextSignal")
            .extends(signal_declaration())
            .extends(Sequence::<char>::ld_declaration())
    }
}

// ============================================================================
// Array signals
// ============================================================================

/// Define a signal backed by an [`ArrayContainer`]
///
/// Generates the struct, a `for_scenario` factory, and the `Container`,
/// `Signal`, `Tagged` and `LinkedDataType` implementations.
macro_rules! define_array_signal {
    (
        $(#[$doc:meta])*
        $signal_name:ident,
        $modality:expr,
        $type_tag:literal
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $signal_name {
            #[serde(flatten)]
            pub container: ArrayContainer,
            #[serde(flatten)]
            pub meta: SignalMeta,
        }

        impl $signal_name {
            /// Signal with bounds `(x_min, y_min, x_max, y_max)` placed at
            /// `[start, stop)` in scenario time; samples stay in `file`
            /// until attached with [`with_array`](Self::with_array).
            pub fn for_scenario(
                scenario_id: impl Into<Identifier>,
                start: i64,
                stop: i64,
                file: impl Into<String>,
                bounds: [i64; 4],
                mentions: Vec<Mention>,
                signal_id: Option<Identifier>,
            ) -> Self {
                let id = signal_id.unwrap_or_else(Identifier::generate);
                Self {
                    container: ArrayContainer::detached(id, bounds),
                    meta: SignalMeta::for_scenario(
                        $modality,
                        scenario_id,
                        start,
                        stop,
                        file,
                        mentions,
                    ),
                }
            }

            /// Attach the samples
            pub fn with_array(mut self, array: ArrayD<f64>) -> Self {
                self.container.array = Some(array);
                self
            }

            pub fn bounds(&self) -> [i64; 4] {
                self.container.bounds()
            }
        }

        impl Container for $signal_name {
            type Ruler = MultiIndex;
            type Segment<'a> = ArrayViewD<'a, f64>;

            fn id(&self) -> &Identifier {
                &self.container.id
            }

            fn ruler(&self) -> &MultiIndex {
                &self.container.ruler
            }

            fn get_segment<'a>(&'a self, segment: &MultiIndex) -> Result<ArrayViewD<'a, f64>> {
                self.container.get_segment(segment)
            }
        }

        impl Signal for $signal_name {
            fn meta(&self) -> &SignalMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut SignalMeta {
                &mut self.meta
            }
        }

        impl Tagged for $signal_name {
            const TYPE_TAG: &'static str = $type_tag;
        }

        impl LinkedDataType for $signal_name {
            fn ld_declaration() -> LdDeclaration {
                LdDeclaration::new(stringify!($signal_name))
                    .extends(signal_declaration())
                    .extends(ArrayContainer::ld_declaration())
            }
        }
    };
}

define_array_signal!(
    /// Image addressed by pixel bounding boxes
    ImageSignal,
    Modality::Image,
    "scenario-ImageSignal"
);

define_array_signal!(
    /// Audio samples; the bounds span frames and channels
    AudioSignal,
    Modality::Audio,
    "scenario-AudioSignal"
);

define_array_signal!(
    /// Video frames addressed by bounding boxes
    VideoSignal,
    Modality::Video,
    "scenario-VideoSignal"
);
