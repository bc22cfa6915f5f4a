//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (the loader handles syntax)
//! - Validate value ranges (port > 0, databases > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerProperties → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::ServerProperties;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bind address is empty")]
    EmptyBind,
    #[error("bind address {0:?} contains whitespace")]
    BindWhitespace(String),
    #[error("port must be non-zero")]
    ZeroPort,
    #[error("databases must be non-zero")]
    ZeroDatabases,
}

pub fn validate_config(config: &ServerProperties) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.bind.is_empty() {
        errors.push(ValidationError::EmptyBind);
    } else if config.bind.chars().any(char::is_whitespace) {
        errors.push(ValidationError::BindWhitespace(config.bind.clone()));
    }
    if config.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.databases == 0 {
        errors.push(ValidationError::ZeroDatabases);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
