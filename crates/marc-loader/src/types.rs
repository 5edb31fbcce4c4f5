//! Request and response types of the service boundary

use marc_record::DecodeError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Status of a successful load
pub const STATUS_CREATED: u16 = 201;

/// Response of a load call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResponse {
    /// HTTP-style status
    pub status: u16,
    /// `"<ordinal>|<json>"` lines, each newline-terminated
    pub body: String,
    /// Records left out under the skip policy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<RecordFailure>,
}

impl LoadResponse {
    /// Create 201 response
    #[must_use]
    pub fn created(body: String) -> Self {
        Self {
            status: STATUS_CREATED,
            body,
            skipped: Vec::new(),
        }
    }

    /// With skipped records
    #[inline]
    #[must_use]
    pub fn with_skipped(mut self, skipped: Vec<RecordFailure>) -> Self {
        self.skipped = skipped;
        self
    }

    /// Body lines without terminators
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines()
    }
}

/// A record that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// 1-based position in the input, when known
    pub ordinal: Option<usize>,
    /// Byte offset of the record
    pub offset: u64,
    /// Error kind
    pub kind: String,
    /// Error message
    pub message: String,
}

impl From<&DecodeError> for RecordFailure {
    fn from(error: &DecodeError) -> Self {
        Self {
            ordinal: error.ordinal(),
            offset: error.offset(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// One item of a streaming data load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamItem {
    /// `"<ordinal>|<json>"` line, without terminator
    Line(String),
    /// Record left out under the skip policy
    Skipped(RecordFailure),
}

impl StreamItem {
    /// Encoded line, if this item is one
    #[must_use]
    pub fn line(&self) -> Option<&str> {
        match self {
            Self::Line(line) => Some(line),
            Self::Skipped(_) => None,
        }
    }

    /// Skipped record, if this item is one
    #[must_use]
    pub fn skipped(&self) -> Option<&RecordFailure> {
        match self {
            Self::Skipped(failure) => Some(failure),
            Self::Line(_) => None,
        }
    }
}

/// Shared flag that stops a streaming load before its next record
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// Create untriggered handle
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check if cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
