//! Error types for StorageCohort handling
//!
//! Covers Kubernetes API access, document decoding, selector evaluation
//! and admission-style validation.

use thiserror::Error;

use crate::validation::FieldIssue;

/// Unified error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid label selector: {0}")]
    InvalidSelector(String),

    #[error("Validation failed for {name}: {} error(s)", .issues.len())]
    Validation { name: String, issues: Vec<FieldIssue> },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is transient, i.e. the API request may succeed
    /// when retried. Document and validation failures never are.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Kube(_))
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
