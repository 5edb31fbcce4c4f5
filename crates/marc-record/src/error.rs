//! Error types for record decoding
//!
//! Two levels:
//! - [`MalformedReason`]: what is wrong with a single record's bytes
//! - [`DecodeError`]: a reason placed in stream context (ordinal, byte offset)

/// Structural defect found while parsing one record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedReason {
    /// Record length prefix is not five ASCII digits
    #[error("record length is not numeric: {0:?}")]
    InvalidLength(String),

    /// Declared length cannot hold a leader, directory terminator and record terminator
    #[error("declared record length {0} is too short")]
    LengthTooShort(usize),

    /// Declared length disagrees with the number of bytes framed as this record
    #[error("declared length {declared} but record spans {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },

    /// Record terminator found before the declared length was reached
    #[error("record terminator at byte {position} precedes declared length {declared}")]
    EarlyTerminator { position: usize, declared: usize },

    /// Last byte of the record is not the record terminator
    #[error("missing record terminator")]
    MissingRecordTerminator,

    /// A numeric leader position holds a non-digit
    #[error("invalid leader at position {position}: {found:?}")]
    InvalidLeader { position: usize, found: char },

    /// Base address of data points outside the record
    #[error("base address {base} outside record of length {length}")]
    BaseAddressOutOfRange { base: usize, length: usize },

    /// Directory does not end with a field terminator
    #[error("directory is not terminated")]
    DirectoryNotTerminated,

    /// Directory length is not a multiple of the entry size
    #[error("directory length {length} is not a multiple of entry size {entry_size}")]
    DirectoryMisaligned { length: usize, entry_size: usize },

    /// Directory entry has a non-alphanumeric tag or non-numeric length/offset
    #[error("invalid directory entry #{index}")]
    InvalidDirectoryEntry { index: usize },

    /// Field extends past the end of the data area
    #[error("field {tag} (offset {offset}, length {length}) exceeds data area of {data_len} bytes")]
    FieldOutOfBounds {
        tag: String,
        offset: usize,
        length: usize,
        data_len: usize,
    },

    /// Field does not end with a field terminator
    #[error("field {tag} is missing its field terminator")]
    MissingFieldTerminator { tag: String },

    /// Directory leaves bytes of the data area unaccounted for
    #[error("directory gap: expected a field at offset {expected}, next starts at {found}")]
    DirectoryGap { expected: usize, found: usize },

    /// Two directory entries claim the same bytes
    #[error("directory overlap: field at offset {found} overlaps data ending at {expected}")]
    DirectoryOverlap { expected: usize, found: usize },

    /// Fields end before the data area does
    #[error("directory covers {covered} of {data_len} data bytes")]
    IncompleteCoverage { covered: usize, data_len: usize },

    /// Data field is shorter than its indicators
    #[error("data field {tag} is shorter than its indicators")]
    ShortDataField { tag: String },
}

/// Errors produced by [`RecordReader`](crate::RecordReader)
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A single record could not be decoded; the reader has resynchronised
    #[error("malformed record #{ordinal} at byte offset {offset}: {reason}")]
    MalformedRecord {
        /// 1-based position of the record in the stream
        ordinal: usize,
        /// Byte offset of the record's first byte
        offset: u64,
        /// What was wrong
        reason: MalformedReason,
    },

    /// Stream ended inside a record
    #[error("truncated stream: record #{ordinal} at byte offset {offset} has only {remaining} trailing bytes")]
    TruncatedStream {
        ordinal: usize,
        offset: u64,
        remaining: usize,
    },

    /// Underlying reader failed
    #[error("io error at byte offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    /// Create malformed-record error
    pub fn malformed(ordinal: usize, offset: u64, reason: MalformedReason) -> Self {
        Self::MalformedRecord {
            ordinal,
            offset,
            reason,
        }
    }

    /// Stable name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRecord { .. } => "MalformedRecord",
            Self::TruncatedStream { .. } => "TruncatedStream",
            Self::Io { .. } => "Io",
        }
    }

    /// Ordinal of the record the error refers to, when known
    #[must_use]
    pub fn ordinal(&self) -> Option<usize> {
        match self {
            Self::MalformedRecord { ordinal, .. } | Self::TruncatedStream { ordinal, .. } => {
                Some(*ordinal)
            }
            Self::Io { .. } => None,
        }
    }

    /// Byte offset where the failing record starts
    #[must_use]
    pub fn offset(&self) -> u64 {
        match self {
            Self::MalformedRecord { offset, .. }
            | Self::TruncatedStream { offset, .. }
            | Self::Io { offset, .. } => *offset,
        }
    }

    /// Whether the reader can continue with the next record
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }
}
