//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body limit > 0, host present)
//! - Check header names/values and extensions are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.host must not be empty")]
    EmptyHost,

    #[error("limits.body_limit_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("statics.extensions entry {0:?} must be a bare extension (no dot, no slash)")]
    InvalidExtension(String),

    #[error("statics.index {0:?} must be a plain file name")]
    InvalidIndex(String),

    #[error("headers: invalid header name {0:?}")]
    InvalidHeaderName(String),

    #[error("headers: invalid value for header {0:?}")]
    InvalidHeaderValue(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    if config.limits.body_limit_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    for ext in &config.statics.extensions {
        if ext.is_empty() || ext.contains('.') || ext.contains('/') {
            errors.push(ValidationError::InvalidExtension(ext.clone()));
        }
    }

    let index = &config.statics.index;
    if index.is_empty() || index.contains('/') || index == ".." {
        errors.push(ValidationError::InvalidIndex(index.clone()));
    }

    for (name, value) in &config.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(name.clone()));
        } else if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::InvalidHeaderValue(name.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
