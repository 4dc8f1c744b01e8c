//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Detect layout collisions (two roles sharing one directory)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ManagerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::ManagerConfig;

/// A single semantic problem, tagged with the field it concerns.
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

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ManagerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let layout = &config.layout;

    let mut require_path = |field: &'static str, path: &Path| {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    };
    require_path("layout.available_dir", &layout.available_dir);
    require_path("layout.archived_dir", &layout.archived_dir);
    require_path("layout.manifests_dir", &layout.manifests_dir);
    require_path("layout.main_config", &layout.main_config);
    require_path("proxy.nginx_bin", &config.proxy.nginx_bin);
    if let Some(enabled) = &layout.enabled_dir {
        require_path("layout.enabled_dir", enabled);
    }

    if layout.available_dir == layout.archived_dir {
        errors.push(ValidationError::new(
            "layout.archived_dir",
            "must differ from layout.available_dir",
        ));
    }
    if layout.enabled_dir.as_ref() == Some(&layout.available_dir) {
        errors.push(ValidationError::new(
            "layout.enabled_dir",
            "must differ from layout.available_dir",
        ));
    }

    if config.proxy.listen_port == 0 {
        errors.push(ValidationError::new("proxy.listen_port", "must be greater than 0"));
    }
    if config.probe.timeout_ms == 0 {
        errors.push(ValidationError::new("probe.timeout_ms", "must be greater than 0"));
    }

    if config.api.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "api.bind_address",
            format!("\"{}\" is not a socket address", config.api.bind_address),
        ));
    }
    if matches!(&config.api.api_key, Some(key) if key.trim().is_empty()) {
        errors.push(ValidationError::new("api.api_key", "must not be blank when set"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("\"{}\" is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
