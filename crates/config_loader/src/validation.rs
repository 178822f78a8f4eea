//! Configuration validation
//!
//! Rules:
//! - Field constraints declared on the config types (indent range, namespace
//!   URL, non-empty separator)
//! - Separator contains no whitespace

use representation::{CodecConfig, EmissorError, Result};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a codec configuration.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &CodecConfig) -> Result<()> {
    if let Err(errors) = config.validate() {
        return Err(first_error(&errors, ""));
    }
    validate_separator(config)?;
    Ok(())
}

fn validate_separator(config: &CodecConfig) -> Result<()> {
    let separator = &config.linked_data.separator;
    if separator.chars().any(char::is_whitespace) {
        return Err(EmissorError::config_validation(
            "linked_data.separator",
            format!("separator must not contain whitespace, got {separator:?}"),
        ));
    }
    Ok(())
}

/// Flatten nested validation errors into the first `path: message` pair,
/// in field name order
fn first_error(errors: &ValidationErrors, prefix: &str) -> EmissorError {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                if let Some(error) = field_errors.first() {
                    let message = match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("failed '{}' check", error.code),
                    };
                    return EmissorError::config_validation(path, message);
                }
            }
            ValidationErrorsKind::Struct(nested) => return first_error(nested, &path),
            ValidationErrorsKind::List(items) => {
                if let Some((index, nested)) = items.iter().next() {
                    return first_error(nested, &format!("{path}[{index}]"));
                }
            }
        }
    }

    EmissorError::config_validation(prefix.to_string(), "invalid configuration")
}
