//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and log levels
//! - Reject storage roots the filesystem backend cannot use
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DeadDropConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{DeadDropConfig, StorageBackendKind};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
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

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &DeadDropConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }

    if config.storage.backend == StorageBackendKind::Fs {
        if config.storage.root.as_os_str().is_empty() {
            errors.push(ValidationError::new("storage.root", "must not be empty"));
        } else if config.storage.root.is_file() {
            errors.push(ValidationError::new(
                "storage.root",
                format!("{} is a file", config.storage.root.display()),
            ));
        }
    }

    if config.static_files.enabled && config.static_files.dir.as_os_str().is_empty() {
        errors.push(ValidationError::new("static_files.dir", "must not be empty"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", config.observability.log_level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "{:?} is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
