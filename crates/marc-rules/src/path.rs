//! Target paths for addressing within produced records
//!
//! Provides [`TargetPath`] for the dot-delimited locations rules write to.
//!
//! # Examples
//! - `title` → `{"title": v}`
//! - `publication.place` → `{"publication": {"place": v}}`
//! - `subjects[]` → `{"subjects": [v, ...]}`
//! - `identifiers[].value` → `{"identifiers": [{"value": v}, ...]}`

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

const ARRAY_MARKER: &str = "[]";

/// One named step of a target path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    name: String,
    array: bool,
}

impl Segment {
    /// Key in the produced object
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this segment collects elements into an array
    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.array
    }
}

/// Location in a produced record
///
/// At most one segment carries the array marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetPath(Vec<Segment>);

impl TargetPath {
    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a parsed path; kept for API symmetry with `len`
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the array segment, if any
    #[inline]
    #[must_use]
    pub fn array_index(&self) -> Option<usize> {
        self.0.iter().position(Segment::is_array)
    }

    /// Whether rules for this path accumulate elements
    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.array_index().is_some()
    }

    /// Split into the part leading to the array (inclusive) and the element path
    ///
    /// For a scalar path the whole path is the first half.
    #[must_use]
    pub fn split_at_array(&self) -> (&[Segment], &[Segment]) {
        match self.array_index() {
            Some(i) => self.0.split_at(i + 1),
            None => (&self.0, &[]),
        }
    }

    /// First key of the path
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(Segment::name)
    }

    /// Last key of the path
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(Segment::name)
    }

    /// Iterator over segment names from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(Segment::name)
    }
}

impl Display for TargetPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
            if segment.array {
                f.write_str(ARRAY_MARKER)?;
            }
        }
        Ok(())
    }
}

impl FromStr for TargetPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let segments: Vec<Segment> = s
            .split('.')
            .map(|raw| {
                let (name, array) = match raw.strip_suffix(ARRAY_MARKER) {
                    Some(name) => (name, true),
                    None => (raw, false),
                };
                if name.is_empty() {
                    Err(PathError::EmptySegment)
                } else if !is_identifier(name) {
                    Err(PathError::InvalidSegment(raw.to_string()))
                } else {
                    Ok(Segment {
                        name: name.to_string(),
                        array,
                    })
                }
            })
            .collect::<Result<_, _>>()?;

        if segments.iter().filter(|s| s.array).count() > 1 {
            return Err(PathError::MultipleArrays(s.to_string()));
        }
        Ok(Self(segments))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Errors related to target paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Path is the empty string
    #[error("target path is empty")]
    Empty,

    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid segment: {0} (must be an identifier, optionally suffixed with [])")]
    InvalidSegment(String),

    /// More than one array marker
    #[error("path '{0}' has more than one [] segment")]
    MultipleArrays(String),
}
