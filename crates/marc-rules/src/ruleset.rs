//! Validated rule sets

use crate::document::{parse_document, ParseOptions};
use crate::error::RuleResult;
use crate::rule::{TargetRules, ValueSource};
use std::collections::BTreeSet;

/// Parsed, validated rule document
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RuleSet {
    targets: Vec<TargetRules>,
}

impl RuleSet {
    /// Parse a rule document
    ///
    /// # Errors
    /// See [`parse_document`].
    pub fn parse(bytes: &[u8], options: &ParseOptions) -> RuleResult<Self> {
        let targets = parse_document(bytes, options)?;
        tracing::debug!(targets = targets.len(), "parsed rule document");
        Ok(Self { targets })
    }

    /// Targets in document order
    #[inline]
    #[must_use]
    pub fn targets(&self) -> &[TargetRules] {
        &self.targets
    }

    /// Number of top-level targets
    #[inline]
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Every tag the rules read, including nested entries
    #[must_use]
    pub fn tags(&self) -> BTreeSet<&str> {
        let mut tags = BTreeSet::new();
        collect_tags(&self.targets, &mut tags);
        tags
    }
}

fn collect_tags<'a>(targets: &'a [TargetRules], tags: &mut BTreeSet<&'a str>) {
    for entry in targets.iter().flat_map(TargetRules::entries) {
        tags.insert(entry.tag());
        if let ValueSource::Nested(nested) = entry.source() {
            collect_tags(nested, tags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rules_tags() {
        let rules =
            RuleSet::parse(&marc_test_utils::sample_rules_bytes(), &ParseOptions::default())
                .unwrap();
        assert_eq!(rules.target_count(), 7);
        assert_eq!(
            rules.tags().into_iter().collect::<Vec<_>>(),
            vec!["001", "008", "020", "100", "245", "650", "999"]
        );
    }
}
