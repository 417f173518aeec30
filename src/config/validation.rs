//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Reject bypass prefixes that can never match a first segment
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, StoreKind};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("gate.core_paths: '{0}' must be a single non-empty path segment")]
    InvalidCorePath(String),

    #[error("gate.core_paths: '{0}' is listed more than once")]
    DuplicateCorePath(String),

    #[error("gate.allowed_modules: empty module identifier")]
    EmptyModuleId,

    #[error("store.path must be set for the json_file store")]
    MissingStorePath,

    #[error("reload.marker_path must be set")]
    MissingMarkerPath,

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingApiKey,
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.reload.check_interval_secs == 0 {
        errors.push(ValidationError::Zero("reload.check_interval_secs"));
    }
    if config.reload.marker_path.trim().is_empty() {
        errors.push(ValidationError::MissingMarkerPath);
    }

    let mut seen = HashSet::new();
    for path in &config.gate.core_paths {
        let segment = path.trim_matches('/');
        if segment.is_empty() || segment.contains('/') {
            errors.push(ValidationError::InvalidCorePath(path.clone()));
        } else if !seen.insert(segment) {
            errors.push(ValidationError::DuplicateCorePath(path.clone()));
        }
    }
    if let Some(allowed) = &config.gate.allowed_modules {
        if allowed.iter().any(|id| id.trim().is_empty()) {
            errors.push(ValidationError::EmptyModuleId);
        }
    }

    if config.store.kind == StoreKind::JsonFile && config.store.path.trim().is_empty() {
        errors.push(ValidationError::MissingStorePath);
    }
    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::MissingApiKey);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
