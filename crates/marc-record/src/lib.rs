//! MARC record decoding
//!
//! Turns a byte stream of concatenated ISO 2709 records into a lazy sequence
//! of [`RawRecord`]s.
//!
//! # Framing
//!
//! ```text
//! | leader (24) | directory (12 * n) 0x1E | field 0x1E | field 0x1E | ... | 0x1D |
//!   ^ length     ^ tag/length/offset        ^ indicators + 0x1F code value ...
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use marc_record::RecordReader;
//!
//! let file = std::fs::File::open("records.mrc")?;
//! for item in RecordReader::new(file) {
//!     match item {
//!         Ok(record) => println!("{} fields", record.fields().len()),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod leader;
pub mod reader;
pub mod record;

pub use error::{DecodeError, MalformedReason};
pub use leader::{Leader, LEADER_LEN};
pub use reader::{decode_all, records, RecordReader};
pub use record::{
    is_control_tag, is_valid_tag, Field, FieldContent, RawRecord, Subfield, FIELD_TERMINATOR,
    LEADER_TAG, RECORD_TERMINATOR, SUBFIELD_DELIMITER,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
