//! MARC mapping rules
//!
//! Declarative rule documents that turn decoded records into JSON objects.
//!
//! # Core Concepts
//!
//! - [`RuleSet`]: validated rule document, immutable once built
//! - [`TargetPath`]: where a rule writes (`title`, `subjects[]`, `identifiers[].value`)
//! - [`map`]: applies a rule set to a [`RawRecord`](marc_record::RawRecord)
//! - [`RuleSetRegistry`]: tenant → current rule set, replaced atomically
//!
//! # Example
//!
//! ```rust,ignore
//! use marc_rules::{map, ParseOptions, RuleSet};
//!
//! let rules = RuleSet::parse(br#"{"title": [{"tag": "245", "subfields": ["a"]}]}"#, &ParseOptions::default())?;
//! for record in marc_record::records(&bytes) {
//!     println!("{}", serde_json::Value::Object(map(&record?, &rules)));
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod document;
pub mod error;
pub mod interpreter;
pub mod path;
pub mod registry;
pub mod rule;
pub mod ruleset;

pub use document::{parse_document, ParseOptions, DEFAULT_SEPARATOR};
pub use error::{RuleLoadError, RuleResult};
pub use interpreter::{map, DomainRecord};
pub use path::{PathError, Segment, TargetPath};
pub use registry::{EmptyTenantId, RuleSetRegistry, TenantId};
pub use rule::{
    CharRange, Condition, Extraction, RuleEntry, SubfieldSelection, TargetRules, Transform,
    ValueSource,
};
pub use ruleset::RuleSet;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
