//! Batch response encoding
//!
//! One line per record: `<1-based ordinal>|<compact json>`. Lines are produced
//! one at a time, either as an iterator ([`encode`]) or written straight into
//! an [`io::Write`] sink ([`BatchEncoder`]).

use serde::Serialize;
use std::io::{self, Write};

/// Separator between ordinal and JSON
pub const ORDINAL_SEPARATOR: char = '|';

/// Encode one record as a line, without terminator
///
/// # Errors
/// Returns the serializer error when the record cannot be represented as JSON.
pub fn encode_line<T: Serialize + ?Sized>(ordinal: usize, record: &T) -> serde_json::Result<String> {
    let json = serde_json::to_string(record)?;
    Ok(format!("{ordinal}{ORDINAL_SEPARATOR}{json}"))
}

/// Iterator of encoded lines, numbered from 1
#[derive(Debug)]
pub struct EncodedLines<I> {
    records: I,
    ordinal: usize,
}

impl<I, T> Iterator for EncodedLines<I>
where
    I: Iterator<Item = T>,
    T: Serialize,
{
    type Item = serde_json::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.ordinal += 1;
        Some(encode_line(self.ordinal, &record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

/// Lazily encode records in order
pub fn encode<I>(records: I) -> EncodedLines<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    EncodedLines {
        records: records.into_iter(),
        ordinal: 0,
    }
}

/// Writes newline-terminated lines into a sink as records arrive
#[derive(Debug)]
pub struct BatchEncoder<W: Write> {
    writer: W,
    last_ordinal: usize,
    lines: usize,
}

impl<W: Write> BatchEncoder<W> {
    /// Create encoder over a sink
    #[inline]
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            last_ordinal: 0,
            lines: 0,
        }
    }

    /// Write a record with the next ordinal
    ///
    /// # Errors
    /// Serialization or sink failure.
    pub fn push<T: Serialize + ?Sized>(&mut self, record: &T) -> io::Result<()> {
        self.write_record(self.last_ordinal + 1, record)
    }

    /// Write a record with an explicit ordinal
    ///
    /// Ordinals may skip values (records dropped upstream) but must increase.
    ///
    /// # Errors
    /// Serialization or sink failure, or an ordinal that does not increase.
    pub fn write_record<T: Serialize + ?Sized>(&mut self, ordinal: usize, record: &T) -> io::Result<()> {
        if ordinal <= self.last_ordinal {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("ordinal {ordinal} does not follow {}", self.last_ordinal),
            ));
        }
        let line = encode_line(ordinal, record)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.last_ordinal = ordinal;
        self.lines += 1;
        Ok(())
    }

    /// Number of lines written
    #[inline]
    #[must_use]
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    /// Flush the sink
    ///
    /// # Errors
    /// Sink failure.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Take back the sink
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}
