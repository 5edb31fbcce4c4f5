//! Streaming record reader
//!
//! [`RecordReader`] frames records by their self-declared length and yields
//! them one at a time. A malformed record produces one error item; the reader
//! then resynchronises on the next record terminator and carries on.

use crate::error::{DecodeError, MalformedReason};
use crate::leader::LEADER_LEN;
use crate::record::{RawRecord, RECORD_TERMINATOR};
use std::io::{ErrorKind, Read};

const LENGTH_DIGITS: usize = 5;
const READ_CHUNK: usize = 8 * 1024;
/// Leader, directory terminator and record terminator
const MIN_RECORD_LEN: usize = LEADER_LEN + 2;

/// Lazy iterator of records over any byte source
#[derive(Debug)]
pub struct RecordReader<R> {
    inner: R,
    buf: Vec<u8>,
    /// Absolute offset of `buf[0]`
    offset: u64,
    ordinal: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> RecordReader<R> {
    /// Create reader over a byte source
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
            offset: 0,
            ordinal: 0,
            eof: false,
            finished: false,
        }
    }

    /// Ordinal of the most recently started record (0 before the first)
    #[inline]
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Byte offset of the next unread byte
    #[inline]
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    fn fill_to(&mut self, wanted: usize) -> std::io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        while self.buf.len() < wanted && !self.eof {
            match self.inner.read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn consume(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        self.buf.drain(..n);
        self.offset += n as u64;
    }

    /// Position of the next record terminator at or after `from`, reading ahead as needed
    fn find_terminator(&mut self, mut from: usize) -> std::io::Result<Option<usize>> {
        loop {
            if let Some(i) = self.buf[from.min(self.buf.len())..]
                .iter()
                .position(|b| *b == RECORD_TERMINATOR)
            {
                return Ok(Some(from + i));
            }
            if self.eof {
                return Ok(None);
            }
            from = self.buf.len();
            self.fill_to(self.buf.len() + READ_CHUNK)?;
        }
    }

    /// Skip past the next record terminator so the following record starts aligned
    fn resync(&mut self, from: usize) -> std::io::Result<()> {
        match self.find_terminator(from)? {
            Some(end) => self.consume(end + 1),
            None => {
                let rest = self.buf.len();
                self.consume(rest);
                self.finished = true;
            }
        }
        Ok(())
    }

    fn io_error(&mut self, source: std::io::Error) -> DecodeError {
        self.finished = true;
        DecodeError::Io {
            offset: self.offset,
            source,
        }
    }

    fn next_record(&mut self) -> Option<Result<RawRecord, DecodeError>> {
        if self.finished {
            return None;
        }
        if let Err(e) = self.fill_to(LENGTH_DIGITS) {
            return Some(Err(self.io_error(e)));
        }
        if self.buf.is_empty() {
            self.finished = true;
            return None;
        }

        self.ordinal += 1;
        let ordinal = self.ordinal;
        let start = self.offset;

        if self.buf.len() < LENGTH_DIGITS {
            return Some(Err(self.truncated(ordinal, start)));
        }

        let declared = match declared_length(&self.buf[..LENGTH_DIGITS]) {
            Ok(n) if n >= MIN_RECORD_LEN => n,
            Ok(n) => {
                let reason = MalformedReason::LengthTooShort(n);
                return Some(self.malformed_then_resync(ordinal, start, 0, reason));
            }
            Err(reason) => return Some(self.malformed_then_resync(ordinal, start, 0, reason)),
        };

        if let Err(e) = self.fill_to(declared) {
            return Some(Err(self.io_error(e)));
        }

        // Terminator inside the declared span means the length lies about the content
        if let Some(i) = self.buf[..declared.min(self.buf.len())]
            .iter()
            .position(|b| *b == RECORD_TERMINATOR)
            .filter(|i| i + 1 < declared)
        {
            self.consume(i + 1);
            let reason = MalformedReason::EarlyTerminator {
                position: i + 1,
                declared,
            };
            tracing::debug!(ordinal, offset = start, %reason, "resynchronised after early terminator");
            return Some(Err(DecodeError::malformed(ordinal, start, reason)));
        }

        if self.buf.len() < declared {
            return Some(Err(self.truncated(ordinal, start)));
        }

        if self.buf[declared - 1] != RECORD_TERMINATOR {
            return Some(self.malformed_then_resync(
                ordinal,
                start,
                declared,
                MalformedReason::MissingRecordTerminator,
            ));
        }

        let parsed = RawRecord::parse(&self.buf[..declared]);
        self.consume(declared);
        Some(parsed.map_err(|reason| {
            tracing::debug!(ordinal, offset = start, %reason, "malformed record");
            DecodeError::malformed(ordinal, start, reason)
        }))
    }

    fn malformed_then_resync(
        &mut self,
        ordinal: usize,
        start: u64,
        from: usize,
        reason: MalformedReason,
    ) -> Result<RawRecord, DecodeError> {
        if let Err(e) = self.resync(from) {
            return Err(self.io_error(e));
        }
        tracing::debug!(ordinal, offset = start, %reason, "resynchronised after malformed record");
        Err(DecodeError::malformed(ordinal, start, reason))
    }

    fn truncated(&mut self, ordinal: usize, start: u64) -> DecodeError {
        let remaining = self.buf.len();
        self.consume(remaining);
        self.finished = true;
        DecodeError::TruncatedStream {
            ordinal,
            offset: start,
            remaining,
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<RawRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

fn declared_length(prefix: &[u8]) -> Result<usize, MalformedReason> {
    if !prefix.iter().all(u8::is_ascii_digit) {
        return Err(MalformedReason::InvalidLength(
            String::from_utf8_lossy(prefix).into_owned(),
        ));
    }
    Ok(prefix
        .iter()
        .fold(0usize, |acc, b| acc * 10 + usize::from(b - b'0')))
}

/// Iterate records in an in-memory buffer
#[must_use]
pub fn records(bytes: &[u8]) -> RecordReader<&[u8]> {
    RecordReader::new(bytes)
}

/// Decode every record in a buffer, keeping per-record failures
#[must_use]
pub fn decode_all(bytes: &[u8]) -> Vec<Result<RawRecord, DecodeError>> {
    records(bytes).collect()
}
