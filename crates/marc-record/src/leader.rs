//! Record leader
//!
//! The first 24 bytes of every record. Only the positions needed for framing
//! are interpreted; the rest is kept verbatim for rules that read the leader.
//! Positions are byte positions: each leader byte maps to one `char`.

use crate::error::MalformedReason;

/// Length of the leader in bytes
pub const LEADER_LEN: usize = 24;

/// Parsed leader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leader {
    raw: [u8; LEADER_LEN],
    /// `raw` with one char per byte
    text: String,
    record_length: usize,
    indicator_count: usize,
    subfield_code_length: usize,
    base_address: usize,
    length_of_length: usize,
    length_of_start: usize,
}

impl Leader {
    /// Parse leader bytes
    ///
    /// # Errors
    /// Returns [`MalformedReason::InvalidLeader`] when a numeric position is not a digit.
    pub fn parse(bytes: &[u8]) -> Result<Self, MalformedReason> {
        if bytes.len() < LEADER_LEN {
            return Err(MalformedReason::LengthTooShort(bytes.len()));
        }
        let mut raw = [0u8; LEADER_LEN];
        raw.copy_from_slice(&bytes[..LEADER_LEN]);
        let bytes = &raw;

        let record_length = digits(bytes, 0, 5)?;
        // Blank positions are common in the wild; fall back to the MARC 21 values.
        let indicator_count = digit_or(bytes, 10, 2)?;
        let subfield_code_length = digit_or(bytes, 11, 2)?;
        let base_address = digits(bytes, 12, 5)?;
        let length_of_length = digit_or(bytes, 20, 4)?;
        let length_of_start = digit_or(bytes, 21, 5)?;

        if subfield_code_length == 0 {
            return Err(MalformedReason::InvalidLeader {
                position: 11,
                found: '0',
            });
        }
        if length_of_length == 0 || length_of_start == 0 {
            let position = if length_of_length == 0 { 20 } else { 21 };
            return Err(MalformedReason::InvalidLeader {
                position,
                found: '0',
            });
        }

        Ok(Self {
            text: raw.iter().copied().map(char::from).collect(),
            raw,
            record_length,
            indicator_count,
            subfield_code_length,
            base_address,
            length_of_length,
            length_of_start,
        })
    }

    /// Leader text, one char per byte
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Leader bytes as read
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; LEADER_LEN] {
        &self.raw
    }

    /// Declared record length
    #[inline]
    #[must_use]
    pub fn record_length(&self) -> usize {
        self.record_length
    }

    /// Number of indicator characters per data field
    #[inline]
    #[must_use]
    pub fn indicator_count(&self) -> usize {
        self.indicator_count
    }

    /// Delimiter plus code length
    #[inline]
    #[must_use]
    pub fn subfield_code_length(&self) -> usize {
        self.subfield_code_length
    }

    /// Offset of the first data field
    #[inline]
    #[must_use]
    pub fn base_address(&self) -> usize {
        self.base_address
    }

    /// Size of one directory entry
    #[inline]
    #[must_use]
    pub fn directory_entry_size(&self) -> usize {
        3 + self.length_of_length + self.length_of_start
    }

    /// Digits used for a field's length in the directory
    #[inline]
    #[must_use]
    pub fn length_of_length(&self) -> usize {
        self.length_of_length
    }

    /// Digits used for a field's start offset in the directory
    #[inline]
    #[must_use]
    pub fn length_of_start(&self) -> usize {
        self.length_of_start
    }

    /// Character at a leader position
    #[inline]
    #[must_use]
    pub fn char_at(&self, position: usize) -> Option<char> {
        self.raw.get(position).copied().map(char::from)
    }

    /// Record status (position 5)
    #[must_use]
    pub fn status(&self) -> Option<char> {
        self.char_at(5)
    }

    /// Type of record (position 6)
    #[must_use]
    pub fn record_type(&self) -> Option<char> {
        self.char_at(6)
    }

    /// Bibliographic level (position 7)
    #[must_use]
    pub fn bibliographic_level(&self) -> Option<char> {
        self.char_at(7)
    }
}

/// Parse a fixed-width ASCII decimal number
pub(crate) fn digits(bytes: &[u8], start: usize, len: usize) -> Result<usize, MalformedReason> {
    let mut value = 0usize;
    for (i, b) in bytes[start..start + len].iter().enumerate() {
        if !b.is_ascii_digit() {
            return Err(MalformedReason::InvalidLeader {
                position: start + i,
                found: char::from(*b),
            });
        }
        value = value * 10 + usize::from(b - b'0');
    }
    Ok(value)
}

fn digit_or(bytes: &[u8], position: usize, fallback: usize) -> Result<usize, MalformedReason> {
    match bytes[position] {
        b' ' => Ok(fallback),
        _ => digits(bytes, position, 1),
    }
}
