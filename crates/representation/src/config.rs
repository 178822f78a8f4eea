//! Codec configuration shared by the engine and the config loader.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ld::{DEFAULT_SEPARATOR, EMISSOR_NAMESPACE};

/// Codec configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CodecConfig {
    /// Output formatting
    #[serde(default)]
    #[validate(nested)]
    pub marshal: MarshalOptions,

    /// Linked-data defaults
    #[serde(default)]
    #[validate(nested)]
    pub linked_data: LinkedDataConfig,
}

/// Output formatting of marshalled documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MarshalOptions {
    /// Spaces per indentation level, 0 for compact output
    #[validate(range(max = 16))]
    pub indent: usize,

    /// Write `@context` and `@type` into every structured record
    pub emit_linked_data: bool,
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            emit_linked_data: true,
        }
    }
}

impl MarshalOptions {
    pub fn compact() -> Self {
        Self {
            indent: 0,
            ..Self::default()
        }
    }
}

/// Namespace used for declarations that do not name their own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LinkedDataConfig {
    #[validate(url)]
    pub namespace: String,

    #[validate(length(min = 1))]
    pub separator: String,
}

impl Default for LinkedDataConfig {
    fn default() -> Self {
        Self {
            namespace: EMISSOR_NAMESPACE.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}
