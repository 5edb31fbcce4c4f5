//! Loader configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! decode_error_policy = "skip"
//! default_separator = " "
//! assign_instance_ids = true
//! stream_channel_capacity = 64
//! log_filter = "info,marc_record=debug"
//!
//! [[static_shapes]]
//! name = "statistical_codes"
//! required = ["code", "name"]
//! strings = ["code", "name"]
//! ```

use marc_rules::{ParseOptions, DEFAULT_SEPARATOR};
use marc_static::{Shape, ShapeCatalog};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a data load does when a record fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeErrorPolicy {
    /// Fail the whole call with the first decode error
    #[default]
    Abort,
    /// Log and report the failing record, continue with the next one
    Skip,
}

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Behaviour on per-record decode failures
    pub decode_error_policy: DecodeErrorPolicy,
    /// Join separator for rule entries that do not declare one
    pub default_separator: String,
    /// Add a generated `id` to mapped records that have none
    pub assign_instance_ids: bool,
    /// Bound of the streaming data-load channel
    pub stream_channel_capacity: usize,
    /// `tracing` filter used by the binary when `RUST_LOG` is unset
    pub log_filter: String,
    /// Extra static shapes merged into the built-in catalog
    pub static_shapes: Vec<Shape>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            decode_error_policy: DecodeErrorPolicy::Abort,
            default_separator: DEFAULT_SEPARATOR.to_string(),
            assign_instance_ids: true,
            stream_channel_capacity: 64,
            log_filter: "info".to_string(),
            static_shapes: Vec::new(),
        }
    }
}

impl LoaderConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for invalid TOML, [`ConfigError::Invalid`] for bad values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// As [`from_toml_str`](Self::from_toml_str), plus [`ConfigError::Io`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "stream_channel_capacity must be at least 1".to_string(),
            ));
        }
        if let Some(shape) = self.static_shapes.iter().find(|s| s.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "static shape with aliases {:?} has no name",
                shape.aliases
            )));
        }
        Ok(())
    }

    /// With decode error policy
    #[inline]
    #[must_use]
    pub fn with_decode_error_policy(mut self, policy: DecodeErrorPolicy) -> Self {
        self.decode_error_policy = policy;
        self
    }

    /// With default separator
    #[inline]
    #[must_use]
    pub fn with_default_separator(mut self, separator: impl Into<String>) -> Self {
        self.default_separator = separator.into();
        self
    }

    /// With instance id assignment
    #[inline]
    #[must_use]
    pub fn with_assign_instance_ids(mut self, assign: bool) -> Self {
        self.assign_instance_ids = assign;
        self
    }

    /// With stream channel capacity
    #[inline]
    #[must_use]
    pub fn with_stream_channel_capacity(mut self, capacity: usize) -> Self {
        self.stream_channel_capacity = capacity;
        self
    }

    /// With an extra static shape
    #[inline]
    #[must_use]
    pub fn with_static_shape(mut self, shape: Shape) -> Self {
        self.static_shapes.push(shape);
        self
    }

    /// Rule parsing options derived from this config
    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::default().with_default_separator(self.default_separator.clone())
    }

    /// Built-in shapes plus configured ones
    #[must_use]
    pub fn shape_catalog(&self) -> ShapeCatalog {
        ShapeCatalog::builtin().with_shapes(self.static_shapes.iter().cloned())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(LoaderConfig::from_toml_str("").unwrap(), LoaderConfig::default());
    }

    #[test]
    fn parses_all_fields() {
        let config = LoaderConfig::from_toml_str(
            r#"
            decode_error_policy = "skip"
            default_separator = "; "
            assign_instance_ids = false
            stream_channel_capacity = 8
            log_filter = "debug"

            [[static_shapes]]
            name = "statistical_codes"
            aliases = ["statcode"]
            required = ["code"]
            "#,
        )
        .unwrap();
        assert_eq!(config.decode_error_policy, DecodeErrorPolicy::Skip);
        assert_eq!(config.parse_options().default_separator, "; ");
        assert!(!config.assign_instance_ids);
        assert_eq!(config.stream_channel_capacity, 8);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(
            config.shape_catalog().resolve("statcode").unwrap().name,
            "statistical_codes"
        );
    }

    #[test]
    fn rejects_zero_capacity_and_bad_policy() {
        assert!(matches!(
            LoaderConfig::from_toml_str("stream_channel_capacity = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LoaderConfig::from_toml_str("decode_error_policy = \"retry\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "decode_error_policy = \"skip\"").unwrap();
        let config = LoaderConfig::from_path(file.path()).unwrap();
        assert_eq!(config.decode_error_policy, DecodeErrorPolicy::Skip);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoaderConfig::from_path(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn builders() {
        let config = LoaderConfig::new()
            .with_decode_error_policy(DecodeErrorPolicy::Skip)
            .with_assign_instance_ids(false)
            .with_stream_channel_capacity(2)
            .with_default_separator("|")
            .with_static_shape(Shape::new("statistical_codes"));
        assert_eq!(config.decode_error_policy, DecodeErrorPolicy::Skip);
        assert_eq!(config.default_separator, "|");
        assert_eq!(config.shape_catalog().len(), 8);
        assert!(config.validate().is_ok());
    }
}
