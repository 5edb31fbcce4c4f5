//! MARC loader service
//!
//! Ties the record decoder, the rule interpreter and the static loader
//! together behind a small request/response facade.
//!
//! # Core Concepts
//!
//! - [`LoaderService`]: per-tenant rule loading, data loading, static loading
//! - [`LoaderConfig`]: TOML configuration with defaults for every field
//! - [`BatchEncoder`]: `"<ordinal>|<json>"` line output
//! - [`LoaderError`]: one error type with a status and a stable kind
//!
//! # Example
//!
//! ```rust,ignore
//! use marc_loader::{LoaderConfig, LoaderService};
//!
//! let service = LoaderService::new(LoaderConfig::default());
//! service.load_rules("diku", &rules_json)?;
//! let response = service.load_data("diku", "stream-1", &marc_bytes)?;
//! for line in response.lines() {
//!     println!("{line}");
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod encoder;
pub mod error;
pub mod service;
pub mod types;

pub use config::{ConfigError, DecodeErrorPolicy, LoaderConfig};
pub use encoder::{encode, encode_line, BatchEncoder, EncodedLines, ORDINAL_SEPARATOR};
pub use error::{LoaderError, LoaderResult, STATUS_BAD_REQUEST, STATUS_INTERNAL};
pub use service::{LoaderService, INSTANCE_ID_FIELD};
pub use types::{Cancellation, LoadResponse, RecordFailure, StreamItem, STATUS_CREATED};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
