//! Error types for static data loading
//!
//! Every error rejects the whole document; nothing is emitted.

/// Errors while loading a static definition
#[derive(Debug, thiserror::Error)]
pub enum StaticLoadError {
    /// Document is not well-formed JSON
    #[error("invalid json: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Type cannot be resolved to a shape, or the document has no values collection
    #[error("unknown record type '{name}': {reason}")]
    UnknownRecordType { name: String, reason: String },

    /// Values collection is empty
    #[error("no values to load for record type '{record_type}'")]
    EmptyValueSet { record_type: String },

    /// One value definition failed validation
    #[error("invalid {record_type} definition #{index}: {message}")]
    InvalidRecordDefinition {
        record_type: String,
        /// 0-based position in the values array
        index: usize,
        message: String,
    },
}

impl StaticLoadError {
    /// Create unknown-type error
    pub fn unknown_type(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnknownRecordType {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create invalid-definition error
    pub fn invalid_definition(
        record_type: impl Into<String>,
        index: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRecordDefinition {
            record_type: record_type.into(),
            index,
            message: message.into(),
        }
    }

    /// Stable name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "InvalidJson",
            Self::UnknownRecordType { .. } => "UnknownRecordType",
            Self::EmptyValueSet { .. } => "EmptyValueSet",
            Self::InvalidRecordDefinition { .. } => "InvalidRecordDefinition",
        }
    }
}

/// Result type alias for static loading
pub type StaticResult<T> = Result<T, StaticLoadError>;
