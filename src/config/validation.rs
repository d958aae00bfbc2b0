//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use axum::http::HeaderValue;

use crate::config::schema::{EndpointConfig, RelayConfig, DEFAULT_PROVIDER};
use crate::observability::logging::normalize_level;

/// One semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::new("listener.host", "must not be empty"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be greater than 0"));
    }
    check_endpoint("fetch_backend", &config.fetch_backend, &mut errors);
    check_endpoint("search_backend", &config.search_backend, &mut errors);

    let mut names = HashSet::new();
    for (i, provider) in config.providers.iter().enumerate() {
        let field = format!("providers[{i}]");
        if provider.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{field}.name"), "must not be empty"));
        } else if provider.name == DEFAULT_PROVIDER {
            errors.push(ValidationError::new(
                format!("{field}.name"),
                "\"default\" is reserved for search_backend",
            ));
        } else if !names.insert(provider.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{field}.name"),
                format!("duplicate provider \"{}\"", provider.name),
            ));
        }
        let endpoint = EndpointConfig::new(provider.host.clone(), provider.port);
        check_endpoint(&field, &endpoint, &mut errors);
    }

    if config.backend.max_frame_bytes == 0 {
        errors.push(ValidationError::new("backend.max_frame_bytes", "must be greater than 0"));
    }
    if config.backend.call_timeout_ms == Some(0) {
        errors.push(ValidationError::new(
            "backend.call_timeout_ms",
            "must be greater than 0 when set",
        ));
    }
    if config.bridge.content_type.trim().is_empty() {
        errors.push(ValidationError::new("bridge.content_type", "must not be empty"));
    } else if HeaderValue::from_str(&config.bridge.content_type).is_err() {
        errors.push(ValidationError::new(
            "bridge.content_type",
            "must be a valid header value",
        ));
    }
    if normalize_level(&config.observability.log_level).is_none() {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level \"{}\"", config.observability.log_level),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_endpoint(field: &str, endpoint: &EndpointConfig, errors: &mut Vec<ValidationError>) {
    if endpoint.host.trim().is_empty() {
        errors.push(ValidationError::new(format!("{field}.host"), "must not be empty"));
    }
    if endpoint.port == 0 {
        errors.push(ValidationError::new(format!("{field}.port"), "must not be 0"));
    }
}
