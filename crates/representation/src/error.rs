//! Layered error definitions
//!
//! Categorized by source: segment addressing / type handling / linked data / config

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum EmissorError {
    // ===== Addressing Errors =====
    /// Requested sub-ruler is not contained in the parent's extent
    #[error("{ruler} out of range: requested {requested}, allowed {allowed}")]
    Range {
        ruler: &'static str,
        requested: String,
        allowed: String,
    },

    /// Segment does not address the queried container
    #[error("invalid segment {segment} for container '{container_id}': {reason}")]
    InvalidSegment {
        container_id: String,
        segment: String,
        reason: String,
    },

    /// Lookup by identifier failed
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    // ===== Type Errors =====
    /// Type or category the caller asked for is not supported
    #[error("unsupported type '{type_name}': {context}")]
    UnsupportedType { type_name: String, context: String },

    /// Linked-data context merge found different URIs for the same term
    #[error("linked data schema conflict in '{type_name}': {}", conflicts.join(", "))]
    SchemaConflict {
        type_name: String,
        conflicts: Vec<String>,
    },

    /// JSON document could not be parsed or did not match the requested type
    #[error("parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl EmissorError {
    /// Create range error
    pub fn range(
        ruler: &'static str,
        requested: impl Into<String>,
        allowed: impl Into<String>,
    ) -> Self {
        Self::Range {
            ruler,
            requested: requested.into(),
            allowed: allowed.into(),
        }
    }

    /// Create invalid segment error
    pub fn invalid_segment(
        container_id: impl Into<String>,
        segment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidSegment {
            container_id: container_id.into(),
            segment: segment.into(),
            reason: reason.into(),
        }
    }

    /// Create not found error
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create unsupported type error
    pub fn unsupported(type_name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
            context: context.into(),
        }
    }

    /// Create parse error from a serde_json failure
    pub fn parse(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, EmissorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_error_names_both_bounds() {
        let err = EmissorError::range("Index", "[0, 12)", "[0, 10)");
        let message = err.to_string();
        assert!(message.contains("[0, 12)"), "got: {message}");
        assert!(message.contains("[0, 10)"), "got: {message}");
    }

    #[test]
    fn schema_conflict_lists_pairs() {
        let err = EmissorError::SchemaConflict {
            type_name: "TestChild".into(),
            conflicts: vec!["a: x != y".into(), "b: u != v".into()],
        };
        assert_eq!(
            err.to_string(),
            "linked data schema conflict in 'TestChild': a: x != y, b: u != v"
        );
    }
}
