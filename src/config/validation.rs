//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, capacity > 0, addresses parse)
//! - Detect duplicate sites
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{EdgeConfig, TransportChoice};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
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

/// Check an already-deserialized configuration.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    let mut seen = HashSet::new();
    for (i, site) in config.sites.iter().enumerate() {
        let domain = site.domain.trim().to_ascii_lowercase();
        if domain.is_empty() {
            errors.push(ValidationError::new(format!("sites[{}].domain", i), "must not be empty"));
        } else if domain.contains('/') || domain.contains(':') || domain.starts_with('.') {
            errors.push(ValidationError::new(
                format!("sites[{}].domain", i),
                format!("not a bare domain: {}", site.domain),
            ));
        } else if !seen.insert(domain) {
            errors.push(ValidationError::new(
                format!("sites[{}].domain", i),
                format!("duplicate site: {}", site.domain),
            ));
        }
    }

    if config.quote.enabled {
        if config.quote.timeout_secs == 0 {
            errors.push(ValidationError::new("quote.timeout_secs", "must be > 0"));
        }
        match config.quote.transport {
            TransportChoice::Direct if config.quote.http_url.is_empty() => {
                errors.push(ValidationError::new("quote.http_url", "required for direct transport"));
            }
            TransportChoice::RemoteProcedure if config.quote.grpc_address.is_empty() => {
                errors.push(ValidationError::new(
                    "quote.grpc_address",
                    "required for remote_procedure transport",
                ));
            }
            _ => {}
        }
    }

    if config.feed.enabled {
        if config.feed.queue_capacity == 0 {
            errors.push(ValidationError::new("feed.queue_capacity", "must be > 0"));
        }
        if config.feed.broker.is_empty() {
            errors.push(ValidationError::new("feed.broker", "must not be empty"));
        }
        if config.feed.retry_base_delay_ms > config.feed.retry_max_delay_ms {
            errors.push(ValidationError::new(
                "feed.retry_base_delay_ms",
                "must not exceed feed.retry_max_delay_ms",
            ));
        }
        if !matches!(config.feed.offset_reset.as_str(), "earliest" | "latest") {
            errors.push(ValidationError::new(
                "feed.offset_reset",
                "must be earliest or latest",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
