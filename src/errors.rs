//! Error types for domain compilation
//!
//! Error codes:
//! - AERO_DOMAIN_MALFORMED (structural)
//! - AERO_DOMAIN_INVALID_LEAF (structural)
//! - AERO_DOMAIN_INVALID_FIELD (structural)
//! - AERO_DOMAIN_UNKNOWN_MODEL (structural)
//! - AERO_DOMAIN_UNSUPPORTED
//! - AERO_DOMAIN_HIERARCHY_LIMIT
//! - AERO_DOMAIN_BACKEND
//! - AERO_DOMAIN_SCHEMA
//! - AERO_DOMAIN_CONFIG
//!
//! Structural errors are caller bugs and always propagate. Capability gaps
//! on computed or attachment fields never reach this type: the compiler
//! logs them and degrades the leaf to TRUE instead.

use thiserror::Error;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain compilation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// Operator arity does not balance, or the token stream is not a domain
    #[error("Malformed domain: {0}")]
    Malformed(String),

    /// Leaf has an unknown operator or an unusable value
    #[error("Invalid leaf {leaf}: {reason}")]
    InvalidLeaf { leaf: String, reason: String },

    /// Leaf references a field the model does not have
    #[error("Invalid field {model}.{field} in leaf {leaf}")]
    InvalidField {
        model: String,
        field: String,
        leaf: String,
    },

    /// Model not present in the registry
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Metadata combination the compiler cannot translate
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Adjacency-list hierarchy walk exceeded its iteration cap
    #[error("Hierarchy walk on {model} exceeded {limit} iterations")]
    HierarchyLimit { model: String, limit: usize },

    /// Failure reported by the model backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// Invalid model metadata or schema file
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid compiler configuration
    #[error("Config error: {0}")]
    Config(String),
}

impl DomainError {
    /// Create an invalid leaf error
    pub fn invalid_leaf(leaf: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidLeaf {
            leaf: leaf.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid field error
    pub fn invalid_field(
        model: impl Into<String>,
        field: impl Into<String>,
        leaf: impl ToString,
    ) -> Self {
        Self::InvalidField {
            model: model.into(),
            field: field.into(),
            leaf: leaf.to_string(),
        }
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "AERO_DOMAIN_MALFORMED",
            Self::InvalidLeaf { .. } => "AERO_DOMAIN_INVALID_LEAF",
            Self::InvalidField { .. } => "AERO_DOMAIN_INVALID_FIELD",
            Self::UnknownModel(_) => "AERO_DOMAIN_UNKNOWN_MODEL",
            Self::Unsupported(_) => "AERO_DOMAIN_UNSUPPORTED",
            Self::HierarchyLimit { .. } => "AERO_DOMAIN_HIERARCHY_LIMIT",
            Self::Backend(_) => "AERO_DOMAIN_BACKEND",
            Self::Schema(_) => "AERO_DOMAIN_SCHEMA",
            Self::Config(_) => "AERO_DOMAIN_CONFIG",
        }
    }

    /// Returns true for errors caused by the calling code's domain
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_)
                | Self::InvalidLeaf { .. }
                | Self::InvalidField { .. }
                | Self::UnknownModel(_)
        )
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
