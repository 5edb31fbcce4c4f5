//! Error types for rule loading
//!
//! Rule documents are accepted or rejected as a whole; map time never fails.

use crate::path::PathError;

/// Errors while turning a rule document into a [`RuleSet`](crate::RuleSet)
#[derive(Debug, thiserror::Error)]
pub enum RuleLoadError {
    /// Document is not well-formed JSON
    #[error("invalid rule syntax: {0}")]
    InvalidRuleSyntax(#[source] serde_json::Error),

    /// Document is JSON but does not describe a valid rule set
    #[error("invalid rule schema at '{target}': {message}")]
    InvalidRuleSchema { target: String, message: String },
}

impl RuleLoadError {
    /// Create schema error for a target path
    pub fn schema(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRuleSchema {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create schema error for an unparsable target path
    pub fn path(target: impl Into<String>, source: &PathError) -> Self {
        Self::schema(target, source.to_string())
    }

    /// Stable name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRuleSyntax(_) => "InvalidRuleSyntax",
            Self::InvalidRuleSchema { .. } => "InvalidRuleSchema",
        }
    }

    /// Target path the error refers to, for schema errors
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::InvalidRuleSyntax(_) => None,
            Self::InvalidRuleSchema { target, .. } => Some(target),
        }
    }
}

/// Result type alias for rule loading
pub type RuleResult<T> = Result<T, RuleLoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_display() {
        let err = RuleLoadError::schema("title", "target has no rule entries");
        assert_eq!(
            err.to_string(),
            "invalid rule schema at 'title': target has no rule entries"
        );
        assert_eq!(err.kind(), "InvalidRuleSchema");
        assert_eq!(err.target(), Some("title"));
    }

    #[test]
    fn syntax_error_kind() {
        let source = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let err = RuleLoadError::InvalidRuleSyntax(source);
        assert_eq!(err.kind(), "InvalidRuleSyntax");
        assert!(err.target().is_none());
        assert!(err.to_string().starts_with("invalid rule syntax"));
    }
}
