//! Error types for the loader service
//!
//! [`LoaderError`] gathers the errors of every crate behind one type with an
//! HTTP-style status and a stable kind string for callers.

use crate::config::ConfigError;
use marc_record::DecodeError;
use marc_rules::RuleLoadError;
use marc_static::StaticLoadError;

/// Status reported for a rejected request
pub const STATUS_BAD_REQUEST: u16 = 400;
/// Status reported for a failure on our side
pub const STATUS_INTERNAL: u16 = 500;

/// Main loader error type
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// Rule document rejected
    #[error("rule load failed: {0}")]
    Rules(#[from] RuleLoadError),

    /// Static definition rejected
    #[error("static load failed: {0}")]
    Static(#[from] StaticLoadError),

    /// Record stream could not be decoded
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Data load for a tenant that has no rule set
    #[error("no rule set loaded for tenant '{tenant}'")]
    NoRuleSet { tenant: String },

    /// Request names no tenant
    #[error("missing tenant")]
    MissingTenant,

    /// Load stopped before completion
    #[error("operation cancelled")]
    Cancelled,

    /// Record could not be serialized
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Response sink failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LoaderError {
    /// Create no-rule-set error
    pub fn no_rule_set(tenant: impl Into<String>) -> Self {
        Self::NoRuleSet {
            tenant: tenant.into(),
        }
    }

    /// HTTP-style status
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Encode(_) | Self::Io(_) | Self::Config(_) => STATUS_INTERNAL,
            Self::Decode(DecodeError::Io { .. }) => STATUS_INTERNAL,
            _ => STATUS_BAD_REQUEST,
        }
    }

    /// Stable name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rules(e) => e.kind(),
            Self::Static(e) => e.kind(),
            Self::Decode(e) => e.kind(),
            Self::NoRuleSet { .. } => "NoRuleSet",
            Self::MissingTenant => "MissingTenant",
            Self::Cancelled => "Cancelled",
            Self::Encode(_) => "Encode",
            Self::Io(_) => "Io",
            Self::Config(_) => "Config",
        }
    }

    /// Check if the caller can fix the request and retry
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status() == STATUS_BAD_REQUEST
    }
}

/// Result type alias for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;
