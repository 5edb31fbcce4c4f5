//! Decoded record model
//!
//! [`RawRecord`] is immutable once parsed. Field order is directory order,
//! subfield order is the order the subfields appear in the field data.

use crate::error::MalformedReason;
use crate::leader::{digits, Leader, LEADER_LEN};

/// Ends every field and the directory
pub const FIELD_TERMINATOR: u8 = 0x1E;
/// Ends every record
pub const RECORD_TERMINATOR: u8 = 0x1D;
/// Introduces every subfield
pub const SUBFIELD_DELIMITER: u8 = 0x1F;

/// Pseudo-tag under which the leader can be addressed as a control field
pub const LEADER_TAG: &str = "LDR";

/// Whether a tag denotes a control field (`001`-`009`, or the leader)
#[inline]
#[must_use]
pub fn is_control_tag(tag: &str) -> bool {
    tag == LEADER_TAG || (tag.len() == 3 && tag.starts_with("00"))
}

/// Whether a string is a well-formed three-character tag
#[inline]
#[must_use]
pub fn is_valid_tag(tag: &str) -> bool {
    tag.len() == 3 && tag.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// One coded subfield of a data field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    code: char,
    value: String,
}

impl Subfield {
    /// Create subfield
    #[inline]
    #[must_use]
    pub fn new(code: char, value: impl Into<String>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }

    /// Subfield code
    #[inline]
    #[must_use]
    pub fn code(&self) -> char {
        self.code
    }

    /// Subfield text
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Field body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldContent {
    /// Control field data (`001`-`009`)
    Control(String),
    /// Data field with indicators and subfields
    Data {
        indicators: Vec<char>,
        subfields: Vec<Subfield>,
    },
}

/// A tagged field of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    tag: String,
    content: FieldContent,
}

impl Field {
    /// Create control field
    #[must_use]
    pub fn control(tag: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            content: FieldContent::Control(data.into()),
        }
    }

    /// Create data field
    #[must_use]
    pub fn data(tag: impl Into<String>, indicators: Vec<char>, subfields: Vec<Subfield>) -> Self {
        Self {
            tag: tag.into(),
            content: FieldContent::Data {
                indicators,
                subfields,
            },
        }
    }

    /// Field tag
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Field body
    #[inline]
    #[must_use]
    pub fn content(&self) -> &FieldContent {
        &self.content
    }

    /// Whether this is a control field
    #[inline]
    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(self.content, FieldContent::Control(_))
    }

    /// Control field data
    #[must_use]
    pub fn control_data(&self) -> Option<&str> {
        match &self.content {
            FieldContent::Control(data) => Some(data),
            FieldContent::Data { .. } => None,
        }
    }

    /// Indicator at a 1-based position
    #[must_use]
    pub fn indicator(&self, position: usize) -> Option<char> {
        match &self.content {
            FieldContent::Data { indicators, .. } => {
                position.checked_sub(1).and_then(|i| indicators.get(i)).copied()
            }
            FieldContent::Control(_) => None,
        }
    }

    /// Subfields in field order (empty for control fields)
    #[must_use]
    pub fn subfields(&self) -> &[Subfield] {
        match &self.content {
            FieldContent::Data { subfields, .. } => subfields,
            FieldContent::Control(_) => &[],
        }
    }

    /// First subfield value with the given code
    #[must_use]
    pub fn subfield(&self, code: char) -> Option<&str> {
        self.subfields()
            .iter()
            .find(|s| s.code == code)
            .map(Subfield::value)
    }

    /// Whether any subfield carries the given code
    #[must_use]
    pub fn has_subfield(&self, code: char) -> bool {
        self.subfields().iter().any(|s| s.code == code)
    }
}

/// A decoded catalog record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    leader: Leader,
    fields: Vec<Field>,
}

impl RawRecord {
    /// Assemble a record from parts
    #[must_use]
    pub fn new(leader: Leader, fields: Vec<Field>) -> Self {
        Self { leader, fields }
    }

    /// Record leader
    #[inline]
    #[must_use]
    pub fn leader(&self) -> &Leader {
        &self.leader
    }

    /// All fields in directory order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fields with the given tag, in directory order
    pub fn fields_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.tag == tag)
    }

    /// Parse one complete record (leader through record terminator)
    ///
    /// # Errors
    /// Returns the first structural defect found.
    pub fn parse(bytes: &[u8]) -> Result<Self, MalformedReason> {
        let length = bytes.len();
        let leader = Leader::parse(bytes)?;

        if leader.record_length() != length {
            return Err(MalformedReason::LengthMismatch {
                declared: leader.record_length(),
                actual: length,
            });
        }
        if bytes[length - 1] != RECORD_TERMINATOR {
            return Err(MalformedReason::MissingRecordTerminator);
        }

        let base = leader.base_address();
        if base <= LEADER_LEN || base > length - 1 {
            return Err(MalformedReason::BaseAddressOutOfRange { base, length });
        }
        if bytes[base - 1] != FIELD_TERMINATOR {
            return Err(MalformedReason::DirectoryNotTerminated);
        }

        let directory = &bytes[LEADER_LEN..base - 1];
        let entry_size = leader.directory_entry_size();
        if directory.len() % entry_size != 0 {
            return Err(MalformedReason::DirectoryMisaligned {
                length: directory.len(),
                entry_size,
            });
        }

        let data = &bytes[base..length - 1];
        let entries = parse_directory(directory, &leader, data.len())?;
        check_coverage(&entries, data.len())?;

        let fields = entries
            .iter()
            .map(|entry| {
                let end = entry.offset + entry.length - 1;
                if data[end] != FIELD_TERMINATOR {
                    return Err(MalformedReason::MissingFieldTerminator {
                        tag: entry.tag.clone(),
                    });
                }
                decode_field(&entry.tag, &data[entry.offset..end], &leader)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { leader, fields })
    }
}

#[derive(Debug)]
struct DirectoryEntry {
    tag: String,
    length: usize,
    offset: usize,
}

fn parse_directory(
    directory: &[u8],
    leader: &Leader,
    data_len: usize,
) -> Result<Vec<DirectoryEntry>, MalformedReason> {
    let entry_size = leader.directory_entry_size();
    let len_len = leader.length_of_length();
    let start_len = leader.length_of_start();

    directory
        .chunks_exact(entry_size)
        .enumerate()
        .map(|(index, chunk)| {
            let invalid = |_| MalformedReason::InvalidDirectoryEntry { index };
            let tag = std::str::from_utf8(&chunk[..3])
                .ok()
                .filter(|t| is_valid_tag(t))
                .ok_or(MalformedReason::InvalidDirectoryEntry { index })?
                .to_string();
            let length = digits(chunk, 3, len_len).map_err(invalid)?;
            let offset = digits(chunk, 3 + len_len, start_len).map_err(invalid)?;

            if length == 0 || offset + length > data_len {
                return Err(MalformedReason::FieldOutOfBounds {
                    tag,
                    offset,
                    length,
                    data_len,
                });
            }
            Ok(DirectoryEntry {
                tag,
                length,
                offset,
            })
        })
        .collect()
}

fn check_coverage(entries: &[DirectoryEntry], data_len: usize) -> Result<(), MalformedReason> {
    let mut spans: Vec<(usize, usize)> = entries.iter().map(|e| (e.offset, e.length)).collect();
    spans.sort_unstable();

    let mut expected = 0;
    for (offset, length) in spans {
        if offset > expected {
            return Err(MalformedReason::DirectoryGap {
                expected,
                found: offset,
            });
        }
        if offset < expected {
            return Err(MalformedReason::DirectoryOverlap {
                expected,
                found: offset,
            });
        }
        expected = offset + length;
    }

    if expected != data_len {
        return Err(MalformedReason::IncompleteCoverage {
            covered: expected,
            data_len,
        });
    }
    Ok(())
}

fn decode_field(tag: &str, body: &[u8], leader: &Leader) -> Result<Field, MalformedReason> {
    if is_control_tag(tag) {
        return Ok(Field::control(tag, String::from_utf8_lossy(body)));
    }

    let indicator_count = leader.indicator_count();
    if body.len() < indicator_count {
        return Err(MalformedReason::ShortDataField {
            tag: tag.to_string(),
        });
    }
    let indicators = body[..indicator_count].iter().map(|b| char::from(*b)).collect();

    let code_len = leader.subfield_code_length().saturating_sub(1).max(1);
    let subfields = body[indicator_count..]
        .split(|b| *b == SUBFIELD_DELIMITER)
        // Bytes before the first delimiter are not part of any subfield
        .skip(1)
        .filter(|chunk| chunk.len() >= code_len)
        .map(|chunk| {
            let code = String::from_utf8_lossy(&chunk[..code_len])
                .chars()
                .next()
                .unwrap_or(' ');
            Subfield::new(code, String::from_utf8_lossy(&chunk[code_len..]))
        })
        .collect();

    Ok(Field::data(tag, indicators, subfields))
}
