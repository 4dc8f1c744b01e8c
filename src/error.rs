//! Error types shared by the reconciliation engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by store, sync and control operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// A config file, symlink or manifest does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The destination of a move already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing manifest fields, protected names, unusable file names.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The proxy rejected its configuration.
    #[error("nginx configuration invalid: {output}")]
    ValidationFailed { output: String },

    /// The proxy refused to reload.
    #[error("failed to reload nginx: {output}")]
    ReloadFailed { output: String },

    /// The certificate tool exited unsuccessfully.
    #[error("certbot failed: {output}")]
    Certificate { output: String },

    /// A config or manifest could not be parsed.
    #[error("parse failed for {path}: {reason}")]
    ParseFailed { path: PathBuf, reason: String },

    /// An external binary could not be started.
    #[error("failed to run {program}: {source}")]
    Command {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The probe HTTP client could not be built.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Filesystem error with the path it happened on.
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ManagerError {
    /// Wrap an IO error, mapping `NotFound` to the domain variant.
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            return ManagerError::NotFound(path.display().to_string());
        }
        ManagerError::Io {
            action,
            path,
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ManagerError::NotFound(_))
    }
}

pub type Result<T, E = ManagerError> = std::result::Result<T, E>;
