//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (period > 0, shard count > 0)
//! - Check that retry bounds are consistent
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineSettings → Result<(), Vec<ValidationError>>
//! - Runs before settings are handed to any subsystem

use std::fmt;

use tracing::Level;

use crate::settings::schema::EngineSettings;

/// One semantic problem, tagged with the dotted field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_settings(settings: &EngineSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.registry.shard_count == 0 {
        errors.push(ValidationError::new("registry.shard_count", "must be greater than 0"));
    }
    if settings.registry.list_delimiter.is_empty() {
        errors.push(ValidationError::new("registry.list_delimiter", "must not be empty"));
    }

    let polling = &settings.polling;
    if polling.period_ms == 0 {
        errors.push(ValidationError::new("polling.period_ms", "must be greater than 0"));
    }
    if let Some(max) = polling.max_retry_delay_ms {
        if max < polling.retry_delay_ms {
            errors.push(ValidationError::new(
                "polling.max_retry_delay_ms",
                format!("must be at least retry_delay_ms ({})", polling.retry_delay_ms),
            ));
        }
    }

    for parameter in &settings.cascade.parameters {
        if parameter.trim().is_empty() {
            errors.push(ValidationError::new("cascade.parameters", "entries must not be blank"));
            break;
        }
    }

    if settings.logging.level.parse::<Level>().is_err() {
        errors.push(ValidationError::new(
            "logging.level",
            format!("unknown level '{}'", settings.logging.level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
