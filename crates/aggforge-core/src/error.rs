//! Error types for AggForge

use std::fmt;

use thiserror::Error;

use crate::fields::{Domain, FieldKind};

/// Result type alias using AggForge's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for AggForge operations
#[derive(Error, Debug)]
pub enum Error {
    /// Metric, filter or facet has no field in the requested domain
    #[error("Unresolved {kind} {name} in {domain} domain")]
    UnresolvedField {
        /// Domain the lookup ran against
        domain: Domain,
        /// What was being resolved
        kind: FieldKind,
        /// Vocabulary name of the identifier
        name: String,
    },

    /// The request violates a structural invariant
    #[error("Invalid query shape: {0}")]
    InvalidQueryShape(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an unresolved field error
    pub fn unresolved(domain: Domain, kind: FieldKind, name: impl fmt::Display) -> Self {
        Self::UnresolvedField {
            domain,
            kind,
            name: name.to_string(),
        }
    }

    /// Create an invalid query shape error
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        Self::InvalidQueryShape(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error was caused by the request itself rather than the environment
    pub fn is_rejected_request(&self) -> bool {
        matches!(self, Self::UnresolvedField { .. } | Self::InvalidQueryShape(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
