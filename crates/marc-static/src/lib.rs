//! Static reference data loading
//!
//! Bulk definitions of small lookup tables (material types, loan types,
//! templates, ...) validated against a [`ShapeCatalog`] and turned into
//! [`StaticRecord`]s with stable identifiers.
//!
//! # Example
//!
//! ```rust,ignore
//! use marc_static::StaticLoader;
//!
//! let batch = StaticLoader::default().load(br#"{"type": "mtype", "values": [{"name": "book"}]}"#)?;
//! assert_eq!(batch.record_type(), "material_types");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod loader;
pub mod shape;

pub use error::{StaticLoadError, StaticResult};
pub use loader::{StaticBatch, StaticLoader, StaticRecord, ID_FIELD};
pub use shape::{Shape, ShapeCatalog};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
