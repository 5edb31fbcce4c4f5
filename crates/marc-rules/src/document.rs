//! Rule document parsing and validation
//!
//! Two passes: bytes → [`serde_json::Value`] (syntax), then each target's
//! entries → raw serde structs → compiled [`TargetRules`] (schema).

use crate::error::{RuleLoadError, RuleResult};
use crate::path::TargetPath;
use crate::rule::{
    normalize_indicator, CharRange, Condition, Extraction, RuleEntry, SubfieldSelection,
    TargetRules, Transform, ValueSource,
};
use indexmap::IndexMap;
use marc_record::{is_control_tag, is_valid_tag};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

/// Separator used when neither the entry nor the options name one
pub const DEFAULT_SEPARATOR: &str = " ";

/// Settings that influence how a document is compiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Join separator for entries that do not declare one
    pub default_separator: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl ParseOptions {
    /// Set default separator
    #[inline]
    #[must_use]
    pub fn with_default_separator(mut self, separator: impl Into<String>) -> Self {
        self.default_separator = separator.into();
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    tag: Option<String>,
    subfields: Option<RawSubfields>,
    separator: Option<String>,
    #[serde(default)]
    conditions: Vec<RawCondition>,
    condition: Option<RawCondition>,
    #[serde(default)]
    transform: Vec<String>,
    value: Option<Value>,
    default: Option<Value>,
    object: Option<IndexMap<String, Vec<RawEntry>>>,
    range: Option<RawRange>,
    #[allow(dead_code)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSubfields {
    Keyword(String),
    Codes(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum RawCondition {
    Indicator { position: usize, equals: String },
    SubfieldPresent { code: String },
    SubfieldAbsent { code: String },
    Matches { pattern: String, code: Option<String> },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRange {
    start: usize,
    end: usize,
}

/// Parse and validate a rule document
///
/// # Errors
/// [`RuleLoadError::InvalidRuleSyntax`] for malformed JSON,
/// [`RuleLoadError::InvalidRuleSchema`] for anything that is not a valid rule set.
pub fn parse_document(bytes: &[u8], options: &ParseOptions) -> RuleResult<Vec<TargetRules>> {
    let document: Value = serde_json::from_slice(bytes).map_err(RuleLoadError::InvalidRuleSyntax)?;
    let Value::Object(targets) = document else {
        return Err(RuleLoadError::schema("", "rule document must be a JSON object"));
    };
    if targets.is_empty() {
        return Err(RuleLoadError::schema("", "rule document has no targets"));
    }

    targets
        .into_iter()
        .map(|(key, value)| {
            let entries: Vec<RawEntry> = serde_json::from_value(value)
                .map_err(|e| RuleLoadError::schema(&key, e.to_string()))?;
            compile_target(&key, entries, None, options)
        })
        .collect()
}

fn compile_target(
    key: &str,
    entries: Vec<RawEntry>,
    parent_tag: Option<&str>,
    options: &ParseOptions,
) -> RuleResult<TargetRules> {
    let path: TargetPath = key.parse().map_err(|e| RuleLoadError::path(key, &e))?;
    if entries.is_empty() {
        return Err(RuleLoadError::schema(key, "target has no rule entries"));
    }
    let entries = entries
        .into_iter()
        .enumerate()
        .map(|(index, raw)| compile_entry(key, index, raw, parent_tag, options))
        .collect::<RuleResult<_>>()?;
    Ok(TargetRules { path, entries })
}

fn compile_entry(
    key: &str,
    index: usize,
    raw: RawEntry,
    parent_tag: Option<&str>,
    options: &ParseOptions,
) -> RuleResult<RuleEntry> {
    let fail = |message: String| RuleLoadError::schema(key, format!("entry #{index}: {message}"));

    let tag = match (raw.tag, parent_tag) {
        (Some(tag), Some(parent)) if tag != parent => {
            return Err(fail(format!(
                "nested tag '{tag}' differs from parent tag '{parent}'"
            )))
        }
        (Some(tag), _) => tag,
        (None, Some(parent)) => parent.to_string(),
        (None, None) => return Err(fail("entry has no tag".to_string())),
    };
    if !is_valid_tag(&tag) {
        return Err(fail(format!(
            "tag '{tag}' must be three ASCII letters or digits"
        )));
    }
    let control = is_control_tag(&tag);

    let subfields = match raw.subfields {
        None => SubfieldSelection::All,
        Some(RawSubfields::Keyword(keyword)) if keyword == "all" => SubfieldSelection::All,
        Some(RawSubfields::Keyword(keyword)) => {
            return Err(fail(format!(
                "subfields must be \"all\" or a list of codes, got '{keyword}'"
            )))
        }
        Some(RawSubfields::Codes(_)) if control => {
            return Err(fail(format!("control field {tag} has no subfields")))
        }
        Some(RawSubfields::Codes(codes)) => SubfieldSelection::Codes(
            codes
                .iter()
                .map(|code| subfield_code(code).map_err(&fail))
                .collect::<RuleResult<_>>()?,
        ),
    };

    let range = match raw.range {
        None => None,
        Some(_) if !control => {
            return Err(fail(format!("range applies to control fields only, not {tag}")))
        }
        Some(RawRange { start, end }) if start > end => {
            return Err(fail(format!("range start {start} is after end {end}")))
        }
        Some(RawRange { start, end }) => Some(CharRange { start, end }),
    };

    let transforms = raw
        .transform
        .iter()
        .map(|name| name.parse::<Transform>().map_err(&fail))
        .collect::<RuleResult<Vec<_>>>()?;

    let conditions = raw
        .conditions
        .into_iter()
        .chain(raw.condition)
        .map(|c| compile_condition(c, control).map_err(&fail))
        .collect::<RuleResult<Vec<_>>>()?;

    let extraction = Extraction {
        subfields,
        separator: raw
            .separator
            .unwrap_or_else(|| options.default_separator.clone()),
        range,
        transforms,
    };

    let source = match (raw.value, raw.object) {
        (Some(_), Some(_)) => {
            return Err(fail("value and object are mutually exclusive".to_string()))
        }
        (Some(value), None) => ValueSource::Static(value),
        (None, Some(object)) => {
            if object.is_empty() {
                return Err(fail("object has no entries".to_string()));
            }
            let nested = object
                .into_iter()
                .map(|(child, entries)| {
                    compile_target(&child, entries, Some(tag.as_str()), options).map_err(|e| match e {
                        RuleLoadError::InvalidRuleSchema { target, message } => {
                            RuleLoadError::schema(format!("{key}/{target}"), message)
                        }
                        other => other,
                    })
                })
                .collect::<RuleResult<Vec<_>>>()?;
            ValueSource::Nested(nested)
        }
        (None, None) => ValueSource::Extract(extraction.clone()),
    };

    Ok(RuleEntry {
        tag,
        conditions,
        source,
        default: raw.default,
        subject: Extraction {
            transforms: Vec::new(),
            ..extraction
        },
    })
}

fn compile_condition(raw: RawCondition, control: bool) -> Result<Condition, String> {
    if control && !matches!(raw, RawCondition::Matches { code: None, .. }) {
        return Err("control fields only support 'matches' conditions without a code".to_string());
    }
    match raw {
        RawCondition::Indicator { position, equals } => {
            if !(1..=2).contains(&position) {
                return Err(format!("indicator position must be 1 or 2, got {position}"));
            }
            let mut chars = equals.chars();
            match (chars.next(), chars.next()) {
                (Some(value), None) => Ok(Condition::Indicator {
                    position,
                    value: normalize_indicator(value),
                }),
                _ => Err(format!(
                    "indicator value must be one character, got '{equals}'"
                )),
            }
        }
        RawCondition::SubfieldPresent { code } => subfield_code(&code).map(Condition::SubfieldPresent),
        RawCondition::SubfieldAbsent { code } => subfield_code(&code).map(Condition::SubfieldAbsent),
        RawCondition::Matches { pattern, code } => {
            let code = code.as_deref().map(subfield_code).transpose()?;
            let pattern =
                Regex::new(&pattern).map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;
            Ok(Condition::Matches { code, pattern })
        }
    }
}

fn subfield_code(code: &str) -> Result<char, String> {
    let mut chars = code.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Ok(c),
        _ => Err(format!(
            "subfield code must be one ASCII letter or digit, got '{code}'"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(document: &Value) -> RuleResult<Vec<TargetRules>> {
        parse_document(&serde_json::to_vec(document).unwrap(), &ParseOptions::default())
    }

    fn schema_message(document: &Value) -> String {
        match parse(document) {
            Err(RuleLoadError::InvalidRuleSchema { message, .. }) => message,
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn parses_sample_rules_in_document_order() {
        let targets = parse(&marc_test_utils::sample_rules()).unwrap();
        let keys: Vec<String> = targets.iter().map(|t| t.path().to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "hrid",
                "language",
                "title",
                "identifiers[]",
                "contributors[].name",
                "subjects[]",
                "source"
            ]
        );
    }

    #[test]
    fn malformed_json_is_syntax_error() {
        let err = parse_document(b"{\"title\": [", &ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "InvalidRuleSyntax");
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(schema_message(&json!([1, 2])).contains("JSON object"));
        assert!(schema_message(&json!({})).contains("no targets"));
    }

    #[test]
    fn empty_entry_list_is_rejected() {
        let err = parse(&json!({ "title": [] })).unwrap_err();
        assert_eq!(err.target(), Some("title"));
        assert!(err.to_string().contains("no rule entries"));
    }

    #[test]
    fn missing_tag_is_rejected() {
        assert!(schema_message(&json!({ "title": [{ "subfields": ["a"] }] })).contains("no tag"));
    }

    #[test]
    fn unsupported_condition_op_is_rejected() {
        let message = schema_message(&json!({
            "title": [{ "tag": "245", "conditions": [{ "op": "sounds_like", "code": "a" }] }]
        }));
        assert!(message.contains("sounds_like"), "{message}");
    }

    #[test]
    fn invalid_paths_and_tags_are_rejected() {
        assert!(parse(&json!({ "a[].b[]": [{ "tag": "245" }] })).is_err());
        assert!(schema_message(&json!({ "title": [{ "tag": "24" }] })).contains("three"));
        assert!(schema_message(&json!({ "title": [{ "tag": "245", "subfields": ["ab"] }] }))
            .contains("subfield code"));
    }

    #[test]
    fn control_field_restrictions() {
        assert!(schema_message(&json!({ "x": [{ "tag": "001", "subfields": ["a"] }] }))
            .contains("no subfields"));
        assert!(schema_message(&json!({
            "x": [{ "tag": "008", "conditions": [{ "op": "indicator", "position": 1, "equals": "1" }] }]
        }))
        .contains("control fields"));
        assert!(schema_message(&json!({ "x": [{ "tag": "245", "range": { "start": 0, "end": 2 } }] }))
            .contains("control fields only"));
        assert!(schema_message(&json!({ "x": [{ "tag": "008", "range": { "start": 5, "end": 2 } }] }))
            .contains("after end"));
        assert!(parse(&json!({ "type": [{ "tag": "LDR", "range": { "start": 6, "end": 7 } }] })).is_ok());
    }

    #[test]
    fn indicator_and_regex_validation() {
        assert!(schema_message(&json!({
            "x": [{ "tag": "245", "condition": { "op": "indicator", "position": 3, "equals": "1" } }]
        }))
        .contains("1 or 2"));
        assert!(schema_message(&json!({
            "x": [{ "tag": "245", "conditions": [{ "op": "matches", "pattern": "(" }] }]
        }))
        .contains("invalid pattern"));
    }

    #[test]
    fn unknown_transform_and_field_are_rejected() {
        assert!(schema_message(&json!({ "x": [{ "tag": "245", "transform": ["rot13"] }] }))
            .contains("unknown transform"));
        assert!(schema_message(&json!({ "x": [{ "tag": "245", "subfield": ["a"] }] }))
            .contains("subfield"));
    }

    #[test]
    fn nested_tag_must_match_parent() {
        let err = parse(&json!({
            "identifiers[]": [{ "tag": "020", "object": { "value": [{ "tag": "022" }] } }]
        }))
        .unwrap_err();
        assert_eq!(err.target(), Some("identifiers[]/value"));
        assert!(err.to_string().contains("differs from parent"));
    }

    #[test]
    fn empty_object_is_rejected() {
        assert!(schema_message(&json!({ "x[]": [{ "tag": "020", "object": {} }] }))
            .contains("object has no entries"));
    }

    #[test]
    fn separator_defaults_from_options() {
        let options = ParseOptions::default().with_default_separator("; ");
        let bytes = serde_json::to_vec(&json!({ "notes": [{ "tag": "500" }] })).unwrap();
        let targets = parse_document(&bytes, &options).unwrap();
        match targets[0].entries()[0].source() {
            ValueSource::Extract(extraction) => assert_eq!(extraction.separator, "; "),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn description_is_ignored() {
        assert!(parse(&json!({ "title": [{ "tag": "245", "description": "main title" }] })).is_ok());
    }
}
