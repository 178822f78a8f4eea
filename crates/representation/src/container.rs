//! Containers - payloads addressed by rulers
//!
//! A container owns an identifier and a ruler spanning its own extent.
//! `get_segment` checks that a ruler addresses this container and lies within
//! its extent, then returns the matching slice of the payload.

use ndarray::{ArrayD, ArrayViewD, Slice};
use serde::{Deserialize, Serialize};

use crate::codec::{array_field, Tagged};
use crate::ld::{LdDeclaration, LinkedDataType};
use crate::{AtomicRuler, EmissorError, Identifier, Index, MultiIndex, Result, Ruler, TemporalRuler};

/// A payload that can be sliced by its ruler type
pub trait Container {
    type Ruler: Ruler;

    /// Slice of the payload returned for a segment
    type Segment<'a>
    where
        Self: 'a;

    fn id(&self) -> &Identifier;

    /// Ruler spanning the container's own extent
    fn ruler(&self) -> &Self::Ruler;

    /// Resolve `segment` to the payload it addresses.
    ///
    /// # Errors
    /// `InvalidSegment` if the segment points into another container or lies
    /// outside this container's extent
    fn get_segment<'a>(&'a self, segment: &Self::Ruler) -> Result<Self::Segment<'a>>;
}

/// Shared check for range-based containers: a bound segment must name this
/// container and be contained in its extent.
fn check_segment<R>(id: &Identifier, own: &R, segment: &R) -> Result<()>
where
    R: Ruler + std::fmt::Debug,
{
    if let Some(target) = segment.container_id() {
        if target != id {
            return Err(EmissorError::invalid_segment(
                id.as_str(),
                format!("{segment:?}"),
                format!("segment belongs to container '{target}'"),
            ));
        }
    }

    if !own.contains(segment) {
        return Err(EmissorError::invalid_segment(
            id.as_str(),
            format!("{segment:?}"),
            format!("outside container extent {own:?}"),
        ));
    }

    Ok(())
}

fn clamp_range(start: i64, stop: i64, len: usize) -> (usize, usize) {
    let len = len as i64;
    let lo = start.clamp(0, len);
    let hi = stop.clamp(lo, len);
    (lo as usize, hi as usize)
}

/// Base declaration of all containers
pub(crate) fn container_declaration() -> LdDeclaration {
    LdDeclaration::new("BaseContainer").field("id").field("ruler")
}

// ============================================================================
// Sequence
// ============================================================================

/// Ordered sequence addressed by an [`Index`] over `[0, len)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence<T> {
    pub id: Identifier,
    pub ruler: Index,
    #[serde(default = "Vec::new")]
    pub seq: Vec<T>,
}

impl<T> Sequence<T> {
    /// Sequence with a generated identifier
    pub fn from_seq(seq: impl IntoIterator<Item = T>) -> Self {
        Self::with_id(Identifier::generate(), seq)
    }

    pub fn with_id(id: impl Into<Identifier>, seq: impl IntoIterator<Item = T>) -> Self {
        let id = id.into();
        let seq: Vec<T> = seq.into_iter().collect();
        let ruler = Index::new(id.clone(), 0, seq.len() as i64);
        Self { id, ruler, seq }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

impl<T> Container for Sequence<T> {
    type Ruler = Index;
    type Segment<'a>
        = &'a [T]
    where
        T: 'a;

    fn id(&self) -> &Identifier {
        &self.id
    }

    fn ruler(&self) -> &Index {
        &self.ruler
    }

    fn get_segment<'a>(&'a self, segment: &Index) -> Result<&'a [T]> {
        check_segment(&self.id, &self.ruler, segment)?;
        let (lo, hi) = clamp_range(segment.start, segment.stop, self.seq.len());
        Ok(&self.seq[lo..hi])
    }
}

impl<T> Tagged for Sequence<T> {
    const TYPE_TAG: &'static str = "container-Sequence";
}

impl<T> LinkedDataType for Sequence<T> {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("Sequence")
            .field("seq")
            .extends(container_declaration())
    }
}

// ============================================================================
// ArrayContainer
// ============================================================================

/// N-dimensional numeric array addressed by a [`MultiIndex`] over its first
/// two axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayContainer {
    pub id: Identifier,
    pub ruler: MultiIndex,
    /// `None` while the samples live only in the signal's files
    #[serde(default, with = "array_field")]
    pub array: Option<ArrayD<f64>>,
}

impl ArrayContainer {
    /// Container with a generated identifier spanning `(0, 0, shape[0], shape[1])`.
    ///
    /// # Errors
    /// `UnsupportedType` for arrays with fewer than two dimensions
    pub fn from_array(array: ArrayD<f64>) -> Result<Self> {
        Self::with_id(Identifier::generate(), array)
    }

    pub fn with_id(id: impl Into<Identifier>, array: ArrayD<f64>) -> Result<Self> {
        let shape = array.shape();
        if shape.len() < 2 {
            return Err(EmissorError::unsupported(
                "array",
                format!("expected at least 2 dimensions, got shape {shape:?}"),
            ));
        }

        let id = id.into();
        let ruler = MultiIndex::new(id.clone(), [0, 0, shape[0] as i64, shape[1] as i64]);
        Ok(Self {
            id,
            ruler,
            array: Some(array),
        })
    }

    /// Container for an array that is not loaded
    pub fn detached(id: impl Into<Identifier>, bounds: [i64; 4]) -> Self {
        let id = id.into();
        Self {
            ruler: MultiIndex::new(id.clone(), bounds),
            id,
            array: None,
        }
    }

    pub fn bounds(&self) -> [i64; 4] {
        self.ruler.bounds
    }
}

impl Container for ArrayContainer {
    type Ruler = MultiIndex;
    type Segment<'a> = ArrayViewD<'a, f64>;

    fn id(&self) -> &Identifier {
        &self.id
    }

    fn ruler(&self) -> &MultiIndex {
        &self.ruler
    }

    fn get_segment<'a>(&'a self, segment: &MultiIndex) -> Result<ArrayViewD<'a, f64>> {
        check_segment(&self.id, &self.ruler, segment)?;
        let array = self.array.as_ref().ok_or_else(|| {
            EmissorError::invalid_segment(
                self.id.as_str(),
                format!("{segment:?}"),
                "container holds no array",
            )
        })?;

        let view = array.slice_each_axis(|axis| {
            let (start, stop) = match axis.axis.index() {
                0 => (segment.x_min(), segment.x_max()),
                1 => (segment.y_min(), segment.y_max()),
                _ => return Slice::from(..),
            };
            let (lo, hi) = clamp_range(start, stop, axis.len);
            Slice::from(lo as isize..hi as isize)
        });
        Ok(view)
    }
}

impl Tagged for ArrayContainer {
    const TYPE_TAG: &'static str = "container-ArrayContainer";
}

impl LinkedDataType for ArrayContainer {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("ArrayContainer")
            .field("array")
            .extends(container_declaration())
    }
}

// ============================================================================
// TemporalContainer
// ============================================================================

/// Time span whose payload is the addressed sub-span itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalContainer {
    pub id: Identifier,
    pub ruler: TemporalRuler,
}

impl TemporalContainer {
    /// Container with a generated identifier over `[start, end)`
    pub fn from_range(start: i64, end: i64) -> Self {
        Self::new(Identifier::generate(), start, end)
    }

    pub fn new(id: impl Into<Identifier>, start: i64, end: i64) -> Self {
        let id = id.into();
        Self {
            ruler: TemporalRuler::new(id.clone(), start, end),
            id,
        }
    }

    pub fn start(&self) -> i64 {
        self.ruler.start
    }

    pub fn end(&self) -> i64 {
        self.ruler.end
    }
}

impl Container for TemporalContainer {
    type Ruler = TemporalRuler;
    type Segment<'a> = TemporalRuler;

    fn id(&self) -> &Identifier {
        &self.id
    }

    fn ruler(&self) -> &TemporalRuler {
        &self.ruler
    }

    fn get_segment<'a>(&'a self, segment: &TemporalRuler) -> Result<TemporalRuler> {
        check_segment(&self.id, &self.ruler, segment)?;
        Ok(segment.clone())
    }
}

impl Tagged for TemporalContainer {
    const TYPE_TAG: &'static str = "container-TemporalContainer";
}

impl LinkedDataType for TemporalContainer {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("TemporalContainer").extends(container_declaration())
    }
}

// ============================================================================
// AtomicContainer
// ============================================================================

/// Single value addressed as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicContainer<T> {
    pub id: Identifier,
    pub ruler: AtomicRuler,
    pub value: T,
}

impl<T> AtomicContainer<T> {
    /// Container with a generated identifier
    pub fn for_value(value: T) -> Self {
        Self::new(Identifier::generate(), value)
    }

    pub fn new(id: impl Into<Identifier>, value: T) -> Self {
        let id = id.into();
        Self {
            ruler: AtomicRuler::new(id.clone()),
            id,
            value,
        }
    }
}

impl<T> Container for AtomicContainer<T> {
    type Ruler = AtomicRuler;
    type Segment<'a>
        = &'a T
    where
        T: 'a;

    fn id(&self) -> &Identifier {
        &self.id
    }

    fn ruler(&self) -> &AtomicRuler {
        &self.ruler
    }

    fn get_segment<'a>(&'a self, segment: &AtomicRuler) -> Result<&'a T> {
        if segment.container_id.as_ref() != Some(&self.id) {
            return Err(EmissorError::invalid_segment(
                self.id.as_str(),
                format!("{segment:?}"),
                "atomic segment must name the container itself",
            ));
        }
        Ok(&self.value)
    }
}

impl<T> Tagged for AtomicContainer<T> {
    const TYPE_TAG: &'static str = "container-AtomicContainer";
}

impl<T> LinkedDataType for AtomicContainer<T> {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("AtomicContainer")
            .field("value")
            .extends(container_declaration())
    }
}
