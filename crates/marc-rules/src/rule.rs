//! Compiled rule model
//!
//! Everything here has passed load-time validation: tags are well formed,
//! regexes compile, and control-field entries only use control-field features.

use crate::path::TargetPath;
use marc_record::Field;
use regex::Regex;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Blank indicator as written in rule documents
pub const BLANK_INDICATOR_ALIAS: char = '#';

/// Which subfields an extraction reads
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubfieldSelection {
    /// Every subfield, in input order
    #[default]
    All,
    /// Named codes, in declaration order
    Codes(Vec<char>),
}

/// Predicate evaluated against one candidate field
#[derive(Debug, Clone)]
pub enum Condition {
    /// Indicator at a 1-based position equals a character
    Indicator { position: usize, value: char },
    /// At least one subfield with the code exists
    SubfieldPresent(char),
    /// No subfield with the code exists
    SubfieldAbsent(char),
    /// Regex matches a subfield, or the entry's extracted text when `code` is absent
    Matches { code: Option<char>, pattern: Regex },
}

impl Condition {
    /// Whether the condition needs the entry's extracted text
    #[inline]
    #[must_use]
    pub fn reads_subject(&self) -> bool {
        matches!(self, Self::Matches { code: None, .. })
    }

    /// Evaluate against a field
    ///
    /// `subject` supplies the entry's extracted text and is only called for
    /// a `Matches` condition without a subfield code.
    pub fn holds<'s>(&self, field: &Field, subject: impl FnOnce() -> &'s str) -> bool {
        match self {
            Self::Indicator { position, value } => field
                .indicator(*position)
                .is_some_and(|found| normalize_indicator(found) == *value),
            Self::SubfieldPresent(code) => field.has_subfield(*code),
            Self::SubfieldAbsent(code) => !field.has_subfield(*code),
            Self::Matches {
                code: Some(code),
                pattern,
            } => field.subfield(*code).is_some_and(|v| pattern.is_match(v)),
            Self::Matches { code: None, pattern } => pattern.is_match(subject()),
        }
    }
}

/// Map the `#` alias to a blank
#[inline]
#[must_use]
pub fn normalize_indicator(c: char) -> char {
    if c == BLANK_INDICATOR_ALIAS {
        ' '
    } else {
        c
    }
}

/// String transform applied after extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// Strip surrounding whitespace
    Trim,
    /// Strip trailing ISBD punctuation and surrounding whitespace
    TrimPunctuation,
    /// Uppercase
    Uppercase,
    /// Lowercase
    Lowercase,
    /// Remove square brackets
    StripBrackets,
    /// Keep ASCII digits only
    DigitsOnly,
}

const TRAILING_PUNCTUATION: &[char] = &[' ', '/', ':', ';', ',', '.', '='];

impl Transform {
    /// All transforms with their document names
    pub const ALL: [Self; 6] = [
        Self::Trim,
        Self::TrimPunctuation,
        Self::Uppercase,
        Self::Lowercase,
        Self::StripBrackets,
        Self::DigitsOnly,
    ];

    /// Name used in rule documents
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Trim => "trim",
            Self::TrimPunctuation => "trim_punctuation",
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::StripBrackets => "strip_brackets",
            Self::DigitsOnly => "digits_only",
        }
    }

    /// Apply to a value
    #[must_use]
    pub fn apply(self, value: &str) -> String {
        match self {
            Self::Trim => value.trim().to_string(),
            Self::TrimPunctuation => value
                .trim()
                .trim_end_matches(|c: char| c.is_whitespace() || TRAILING_PUNCTUATION.contains(&c))
                .to_string(),
            Self::Uppercase => value.to_uppercase(),
            Self::Lowercase => value.to_lowercase(),
            Self::StripBrackets => value.chars().filter(|c| !matches!(c, '[' | ']')).collect(),
            Self::DigitsOnly => value.chars().filter(char::is_ascii_digit).collect(),
        }
    }
}

impl Display for Transform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("unknown transform '{s}'"))
    }
}

/// Character slice `[start, end)` of a control field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRange {
    /// First character position
    pub start: usize,
    /// One past the last character position
    pub end: usize,
}

impl CharRange {
    /// Slice a string by character positions, clipping at its end
    #[must_use]
    pub fn slice(self, value: &str) -> String {
        value
            .chars()
            .skip(self.start)
            .take(self.end.saturating_sub(self.start))
            .collect()
    }
}

/// Text extraction from a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Subfields to read (data fields)
    pub subfields: SubfieldSelection,
    /// Join separator
    pub separator: String,
    /// Character slice (control fields)
    pub range: Option<CharRange>,
    /// Transforms, in order
    pub transforms: Vec<Transform>,
}

impl Extraction {
    /// Read every subfield, joined by `separator`
    #[must_use]
    pub fn all(separator: impl Into<String>) -> Self {
        Self {
            subfields: SubfieldSelection::All,
            separator: separator.into(),
            range: None,
            transforms: Vec::new(),
        }
    }

    /// Extracted text before transforms
    #[must_use]
    pub fn raw(&self, field: &Field) -> String {
        if let Some(data) = field.control_data() {
            return match self.range {
                Some(range) => range.slice(data),
                None => data.to_string(),
            };
        }

        let values: Vec<&str> = match &self.subfields {
            SubfieldSelection::All => field.subfields().iter().map(|s| s.value()).collect(),
            SubfieldSelection::Codes(codes) => codes
                .iter()
                .flat_map(|code| {
                    field
                        .subfields()
                        .iter()
                        .filter(move |s| s.code() == *code)
                        .map(|s| s.value())
                })
                .collect(),
        };
        values
            .into_iter()
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    /// Extracted text after transforms
    #[must_use]
    pub fn extract(&self, field: &Field) -> String {
        self.transforms
            .iter()
            .fold(self.raw(field), |value, transform| transform.apply(&value))
    }
}

/// What a satisfied entry contributes
#[derive(Debug, Clone)]
pub enum ValueSource {
    /// Text taken from the field
    Extract(Extraction),
    /// A fixed value
    Static(Value),
    /// An object built by sub-rules over the same field
    Nested(Vec<TargetRules>),
}

/// One candidate mapping for a target
#[derive(Debug, Clone)]
pub struct RuleEntry {
    pub(crate) tag: String,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) source: ValueSource,
    pub(crate) default: Option<Value>,
    pub(crate) subject: Extraction,
}

impl RuleEntry {
    /// Source tag
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Conditions, all of which must hold
    #[inline]
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Value source
    #[inline]
    #[must_use]
    pub fn source(&self) -> &ValueSource {
        &self.source
    }

    /// Fallback when the target has no satisfying field
    #[inline]
    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Text a subject-reading condition is matched against
    #[must_use]
    pub fn subject_text(&self, field: &Field) -> String {
        match &self.source {
            ValueSource::Extract(extraction) => extraction.raw(field),
            ValueSource::Static(_) | ValueSource::Nested(_) => self.subject.raw(field),
        }
    }
}

/// Rule entries for one target path, in document order
#[derive(Debug, Clone)]
pub struct TargetRules {
    pub(crate) path: TargetPath,
    pub(crate) entries: Vec<RuleEntry>,
}

impl TargetRules {
    /// Where values land
    #[inline]
    #[must_use]
    pub fn path(&self) -> &TargetPath {
        &self.path
    }

    /// Candidate entries
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    /// First default declared among the entries
    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.entries.iter().find_map(RuleEntry::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marc_record::Subfield;

    fn title_field() -> Field {
        Field::data(
            "245",
            vec!['1', '0'],
            vec![
                Subfield::new('a', "Moby Dick :"),
                Subfield::new('b', "or, the whale /"),
                Subfield::new('c', "Herman Melville."),
            ],
        )
    }

    #[test]
    fn trim_punctuation_strips_trailing_isbd() {
        assert_eq!(Transform::TrimPunctuation.apply("Doe, Jane,"), "Doe, Jane");
        assert_eq!(Transform::TrimPunctuation.apply("  a subtitle / "), "a subtitle");
        assert_eq!(Transform::TrimPunctuation.apply("Title :="), "Title");
        assert_eq!(Transform::TrimPunctuation.apply("[s.l.]"), "[s.l.]");
    }

    #[test]
    fn simple_transforms() {
        assert_eq!(Transform::Trim.apply("  x  "), "x");
        assert_eq!(Transform::Uppercase.apply("eng"), "ENG");
        assert_eq!(Transform::Lowercase.apply("ENG"), "eng");
        assert_eq!(Transform::StripBrackets.apply("[1985]"), "1985");
        assert_eq!(Transform::DigitsOnly.apply("ISBN 0-394-50288-4"), "0394502884");
    }

    #[test]
    fn transform_names_round_trip() {
        for transform in Transform::ALL {
            assert_eq!(transform.name().parse::<Transform>(), Ok(transform));
        }
        assert!("reverse".parse::<Transform>().is_err());
    }

    #[test]
    fn char_range_clips() {
        let range = CharRange { start: 35, end: 38 };
        assert_eq!(range.slice("850101s1985    nyu           000 0 eng d"), "eng");
        assert_eq!(range.slice("short"), "");
        assert_eq!(CharRange { start: 2, end: 10 }.slice("abcd"), "cd");
    }

    #[test]
    fn extraction_uses_declaration_order() {
        let mut extraction = Extraction::all(" ");
        extraction.subfields = SubfieldSelection::Codes(vec!['b', 'a']);
        assert_eq!(extraction.raw(&title_field()), "or, the whale / Moby Dick :");
    }

    #[test]
    fn extraction_all_uses_input_order() {
        let extraction = Extraction::all("|");
        assert_eq!(
            extraction.raw(&title_field()),
            "Moby Dick :|or, the whale /|Herman Melville."
        );
    }

    #[test]
    fn extraction_applies_transforms_in_order() {
        let mut extraction = Extraction::all(" ");
        extraction.subfields = SubfieldSelection::Codes(vec!['c']);
        extraction.transforms = vec![Transform::TrimPunctuation, Transform::Uppercase];
        assert_eq!(extraction.extract(&title_field()), "HERMAN MELVILLE");
    }

    #[test]
    fn conditions_on_data_field() {
        let field = title_field();
        let never = || -> &'static str { unreachable!() };
        assert!(Condition::Indicator { position: 1, value: '1' }.holds(&field, never));
        assert!(!Condition::Indicator { position: 2, value: ' ' }.holds(&field, never));
        assert!(Condition::SubfieldPresent('c').holds(&field, never));
        assert!(Condition::SubfieldAbsent('z').holds(&field, never));
        let pattern = Regex::new("^Moby").unwrap();
        assert!(Condition::Matches { code: Some('a'), pattern }.holds(&field, never));
    }

    #[test]
    fn blank_indicator_matches_hash_alias() {
        let field = Field::data("650", vec![' ', '0'], vec![Subfield::new('a', "x")]);
        let condition = Condition::Indicator {
            position: 1,
            value: normalize_indicator('#'),
        };
        assert!(condition.holds(&field, || ""));
    }

    #[test]
    fn matches_without_code_reads_subject() {
        let field = Field::control("008", "850101s1985");
        let condition = Condition::Matches {
            code: None,
            pattern: Regex::new("s19").unwrap(),
        };
        assert!(condition.reads_subject());
        assert!(condition.holds(&field, || "850101s1985"));
        assert!(!condition.holds(&field, || "850101"));
    }
}
