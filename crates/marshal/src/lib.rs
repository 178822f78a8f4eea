//! # Marshal
//!
//! JSON serialization engine for the scenario model.
//!
//! Responsibilities:
//! - Type registry built once at startup, immutable afterwards
//! - Typed round trips: `unmarshal(marshal(x)) == x` for every registered type,
//!   polymorphic annotation values and segments included
//! - JSON-LD decoration: every structured record carries `@context` and `@type`
//! - Untyped loading into read-only records
//!
//! ## Usage
//!
//! ```
//! use marshal::Codec;
//! use representation::{Container, Sequence};
//!
//! let codec = Codec::emissor().unwrap();
//!
//! let tokens = Sequence::from_seq(["I", "am", "in", "Amsterdam"].map(String::from));
//! let json = codec.marshal(&tokens).unwrap();
//! let clone: Sequence<String> = codec.unmarshal(&json).unwrap().into_one().unwrap();
//! assert_eq!(clone, tokens);
//!
//! let offset = clone.ruler().get_offset(0, 1).unwrap();
//! assert_eq!(clone.get_segment(&offset).unwrap(), ["I".to_string()]);
//! ```

mod engine;
mod registry;
mod schema;

pub use engine::{Codec, Document};
pub use registry::{RecordSchema, TypeRegistry, TypeRegistryBuilder, LD_CONTEXT_KEY, LD_TYPE_KEY};
pub use schema::{AnyRef, Field, FieldKind, FieldType, RecordRef, Structured};
