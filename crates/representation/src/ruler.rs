//! Rulers - segment locators
//!
//! A ruler identifies a segment relative to the container named by its
//! `container_id`. Every ruler kind offers a narrowing operation that yields a
//! child ruler contained in the parent's extent.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::codec::{deserialize_any, identifier_field, serialize_any, AnyField, Tagged};
use crate::ld::{LdDeclaration, LdProperty, LinkedDataType};
use crate::{EmissorError, Identifier, Result, Untyped};

/// Common behaviour of all ruler kinds
pub trait Ruler {
    /// Container this ruler locates within (`None` for detached rulers)
    fn container_id(&self) -> Option<&Identifier>;

    /// Whether `other` lies within this ruler's extent
    fn contains(&self, other: &Self) -> bool;
}

/// Half-open integer range `[start, stop)` (character or token offsets)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    #[serde(default, with = "identifier_field")]
    pub container_id: Option<Identifier>,
    pub start: i64,
    pub stop: i64,
}

impl Index {
    pub fn new(container_id: impl Into<Identifier>, start: i64, stop: i64) -> Self {
        Self {
            container_id: Some(container_id.into()),
            start,
            stop,
        }
    }

    /// Detached range, not yet bound to a container
    pub fn from_range(start: i64, stop: i64) -> Self {
        Self {
            container_id: None,
            start,
            stop,
        }
    }

    /// Narrow to `[start, end)`.
    ///
    /// # Errors
    /// `Range` if `start < self.start` or `end > self.stop`
    pub fn get_offset(&self, start: i64, end: i64) -> Result<Index> {
        if start < self.start || end > self.stop {
            return Err(EmissorError::range(
                "Index",
                format!("[{start}, {end})"),
                format!("[{}, {})", self.start, self.stop),
            ));
        }

        Ok(Index {
            container_id: self.container_id.clone(),
            start,
            stop: end,
        })
    }

    /// Number of positions covered (0 for inverted ranges)
    pub fn len(&self) -> usize {
        usize::try_from(self.stop.saturating_sub(self.start)).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Ruler for Index {
    fn container_id(&self) -> Option<&Identifier> {
        self.container_id.as_ref()
    }

    fn contains(&self, other: &Self) -> bool {
        other.start >= self.start && other.stop <= self.stop
    }
}

impl Tagged for Index {
    const TYPE_TAG: &'static str = "container-Index";
}

/// 2D bounding box `(x_min, y_min, x_max, y_max)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultiIndex {
    #[serde(default, with = "identifier_field")]
    pub container_id: Option<Identifier>,
    pub bounds: [i64; 4],
}

impl MultiIndex {
    pub fn new(container_id: impl Into<Identifier>, bounds: [i64; 4]) -> Self {
        Self {
            container_id: Some(container_id.into()),
            bounds,
        }
    }

    pub fn x_min(&self) -> i64 {
        self.bounds[0]
    }

    pub fn y_min(&self) -> i64 {
        self.bounds[1]
    }

    pub fn x_max(&self) -> i64 {
        self.bounds[2]
    }

    pub fn y_max(&self) -> i64 {
        self.bounds[3]
    }

    /// Narrow to the box `(x_min, y_min, x_max, y_max)`.
    ///
    /// # Errors
    /// `Range` if the box is not contained in `self.bounds`
    pub fn get_area_bounding_box(
        &self,
        x_min: i64,
        y_min: i64,
        x_max: i64,
        y_max: i64,
    ) -> Result<MultiIndex> {
        let requested = MultiIndex {
            container_id: self.container_id.clone(),
            bounds: [x_min, y_min, x_max, y_max],
        };
        if !self.contains(&requested) {
            return Err(EmissorError::range(
                "MultiIndex",
                format!("{:?}", requested.bounds),
                format!("{:?}", self.bounds),
            ));
        }

        Ok(requested)
    }
}

impl Ruler for MultiIndex {
    fn container_id(&self) -> Option<&Identifier> {
        self.container_id.as_ref()
    }

    fn contains(&self, other: &Self) -> bool {
        other.x_min() >= self.x_min()
            && other.y_min() >= self.y_min()
            && other.x_max() <= self.x_max()
            && other.y_max() <= self.y_max()
    }
}

impl Tagged for MultiIndex {
    const TYPE_TAG: &'static str = "container-MultiIndex";
}

/// Time interval in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemporalRuler {
    #[serde(default, with = "identifier_field")]
    pub container_id: Option<Identifier>,
    pub start: i64,
    pub end: i64,
}

impl TemporalRuler {
    pub fn new(container_id: impl Into<Identifier>, start: i64, end: i64) -> Self {
        Self {
            container_id: Some(container_id.into()),
            start,
            end,
        }
    }

    pub fn from_range(start: i64, end: i64) -> Self {
        Self {
            container_id: None,
            start,
            end,
        }
    }

    /// Narrow to `[start, end)`; the end must lie strictly before `self.end`.
    ///
    /// # Errors
    /// `Range` if `start < self.start` or `end >= self.end`
    pub fn get_time_segment(&self, start: i64, end: i64) -> Result<TemporalRuler> {
        if start < self.start || end >= self.end {
            return Err(EmissorError::range(
                "TemporalRuler",
                format!("[{start}, {end})"),
                format!("[{}, {})", self.start, self.end),
            ));
        }

        Ok(TemporalRuler {
            container_id: self.container_id.clone(),
            start,
            end,
        })
    }

    pub fn duration(&self) -> i64 {
        self.end - self.start
    }
}

impl Ruler for TemporalRuler {
    fn container_id(&self) -> Option<&Identifier> {
        self.container_id.as_ref()
    }

    fn contains(&self, other: &Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

impl Tagged for TemporalRuler {
    const TYPE_TAG: &'static str = "container-TemporalRuler";
}

/// Identity-only locator: addresses a whole atomic container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtomicRuler {
    #[serde(default, with = "identifier_field")]
    pub container_id: Option<Identifier>,
}

impl AtomicRuler {
    pub fn new(container_id: impl Into<Identifier>) -> Self {
        Self {
            container_id: Some(container_id.into()),
        }
    }
}

impl Ruler for AtomicRuler {
    fn container_id(&self) -> Option<&Identifier> {
        self.container_id.as_ref()
    }

    fn contains(&self, other: &Self) -> bool {
        self.container_id == other.container_id
    }
}

impl Tagged for AtomicRuler {
    const TYPE_TAG: &'static str = "container-AtomicRuler";
}

/// Declaration shared by all rulers
pub(crate) fn ruler_declaration() -> LdDeclaration {
    LdDeclaration::new("Ruler").property(LdProperty::new("container_id").id_ref())
}

impl LinkedDataType for Index {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("Index")
            .field("start")
            .field("stop")
            .extends(ruler_declaration())
    }
}

impl LinkedDataType for MultiIndex {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("MultiIndex")
            .field("bounds")
            .extends(ruler_declaration())
    }
}

impl LinkedDataType for TemporalRuler {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("TemporalRuler")
            .field("start")
            .field("end")
            .extends(ruler_declaration())
    }
}

impl LinkedDataType for AtomicRuler {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("AtomicRuler").extends(ruler_declaration())
    }
}

/// Any ruler kind, as stored in `Mention::segment`
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Index(Index),
    MultiIndex(MultiIndex),
    Temporal(TemporalRuler),
    Atomic(AtomicRuler),
    /// Loaded segment whose discriminator could not be resolved
    Unresolved(Untyped),
}

impl Segment {
    /// Container the segment points into
    pub fn container_id(&self) -> Option<&Identifier> {
        match self {
            Segment::Index(r) => r.container_id(),
            Segment::MultiIndex(r) => r.container_id(),
            Segment::Temporal(r) => r.container_id(),
            Segment::Atomic(r) => r.container_id(),
            Segment::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Segment::Unresolved(_))
    }
}

impl From<Index> for Segment {
    fn from(ruler: Index) -> Self {
        Segment::Index(ruler)
    }
}

impl From<MultiIndex> for Segment {
    fn from(ruler: MultiIndex) -> Self {
        Segment::MultiIndex(ruler)
    }
}

impl From<TemporalRuler> for Segment {
    fn from(ruler: TemporalRuler) -> Self {
        Segment::Temporal(ruler)
    }
}

impl From<AtomicRuler> for Segment {
    fn from(ruler: AtomicRuler) -> Self {
        Segment::Atomic(ruler)
    }
}

impl AnyField for Segment {
    const FIELD: &'static str = "segment";

    fn type_tag(&self) -> Option<&'static str> {
        match self {
            Segment::Index(_) => Some(Index::TYPE_TAG),
            Segment::MultiIndex(_) => Some(MultiIndex::TYPE_TAG),
            Segment::Temporal(_) => Some(TemporalRuler::TYPE_TAG),
            Segment::Atomic(_) => Some(AtomicRuler::TYPE_TAG),
            Segment::Unresolved(_) => None,
        }
    }

    fn to_payload(&self) -> std::result::Result<Value, serde_json::Error> {
        match self {
            Segment::Index(r) => serde_json::to_value(r),
            Segment::MultiIndex(r) => serde_json::to_value(r),
            Segment::Temporal(r) => serde_json::to_value(r),
            Segment::Atomic(r) => serde_json::to_value(r),
            Segment::Unresolved(raw) => Ok(raw.to_raw_value()),
        }
    }

    fn from_tagged(
        tag: &str,
        payload: Value,
    ) -> Option<std::result::Result<Self, serde_json::Error>> {
        let decoded = match tag {
            Index::TYPE_TAG => serde_json::from_value(payload).map(Segment::Index),
            MultiIndex::TYPE_TAG => serde_json::from_value(payload).map(Segment::MultiIndex),
            TemporalRuler::TYPE_TAG => serde_json::from_value(payload).map(Segment::Temporal),
            AtomicRuler::TYPE_TAG => serde_json::from_value(payload).map(Segment::Atomic),
            _ => return None,
        };
        Some(decoded)
    }

    fn from_plain(value: Value) -> std::result::Result<Self, Value> {
        Err(value)
    }

    fn unresolved(value: Untyped) -> Self {
        Segment::Unresolved(value)
    }
}

impl Serialize for Segment {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_any(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_any(deserializer)
    }
}
