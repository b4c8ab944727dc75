//! Configuration validation and defaulting.
//!
//! # Responsibilities
//! - Semantic validation of decoded candidates (serde handles shape and types)
//! - Translate free-form `format`/`compression` strings into closed variants
//! - Fill in defaults for absent or zero-valued fields after validation passes
//!
//! # Rule order
//! Rules run in a fixed order and the first failure wins, so the same
//! document always produces the same message:
//!
//! 1. `path` must be non-empty after trimming
//! 2. `format`, if set, must be supported
//! 3. `compression`, if set, must be supported
//!
//! Rotation numbers are not checked here. They are unsigned in the schema,
//! so negative values never get past decoding.

use super::component_id::ComponentId;
use super::loader::ConfigError;
use super::schema::{Compression, FileExporterConfig, Format, RawExporterConfig, Rotation};
use thiserror::Error;

/// Backup count used when a rotation block leaves `max_backups` at zero.
pub const DEFAULT_MAX_BACKUPS: u32 = 100;

/// Reason a candidate was rejected.
///
/// The `Display` text is the reason fragment of the operator-facing message
/// `exporter "<id>" has invalid configuration: <reason>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("path must be non-empty")]
    EmptyPath,

    /// Carries the offending value as written in the document.
    #[error("format type is not supported")]
    UnsupportedFormat(String),

    /// Carries the offending value as written in the document.
    #[error("compression is not supported")]
    UnsupportedCompression(String),
}

/// Validates candidates and applies defaults.
///
/// Carries its own default backup count; see [`Validator::new`].
///
/// # Example
///
/// ```rust
/// use otlp_file_sink::config::{Format, RawExporterConfig, Validator};
///
/// let candidate = RawExporterConfig {
///     path: Some("./foo".to_string()),
///     ..RawExporterConfig::default()
/// };
/// let config = Validator::default().validate(&candidate).unwrap();
/// assert_eq!(config.format, Format::Json);
/// assert!(config.rotation.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    default_max_backups: u32,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BACKUPS)
    }
}

impl Validator {
    #[must_use]
    pub const fn new(default_max_backups: u32) -> Self {
        Self {
            default_max_backups,
        }
    }

    #[must_use]
    pub const fn default_max_backups(&self) -> u32 {
        self.default_max_backups
    }

    /// Validates a candidate and returns the defaulted configuration.
    ///
    /// The candidate is only borrowed; a rejected candidate is left exactly
    /// as the caller passed it.
    ///
    /// # Errors
    ///
    /// Returns the first rule violated, in the order listed in the module
    /// documentation.
    pub fn validate(
        &self,
        candidate: &RawExporterConfig,
    ) -> Result<FileExporterConfig, ValidationError> {
        let path = candidate
            .path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(ValidationError::EmptyPath)?;

        let format = candidate
            .format
            .as_deref()
            .map(str::parse::<Format>)
            .transpose()?
            .unwrap_or_default();

        let compression = candidate
            .compression
            .as_deref()
            .map(str::parse::<Compression>)
            .transpose()?
            .unwrap_or_default();

        Ok(FileExporterConfig {
            path: path.to_string(),
            format,
            compression,
            rotation: candidate.rotation.map(|r| self.apply_defaults(r)),
        })
    }

    /// Validates the candidate of one named instance.
    ///
    /// # Errors
    ///
    /// Wraps the rule violation in [`ConfigError::Invalid`] tagged with `id`.
    pub fn validate_instance(
        &self,
        id: &ComponentId,
        candidate: &RawExporterConfig,
    ) -> Result<FileExporterConfig, ConfigError> {
        let _span = tracing::debug_span!("validate_instance", id = %id).entered();

        self.validate(candidate).map_err(|source| {
            tracing::debug!(error = %source, "candidate rejected");
            ConfigError::Invalid {
                id: id.clone(),
                source,
            }
        })
    }

    /// Replaces a zero `max_backups` with the default backup count.
    ///
    /// Idempotent: a value that already went through this is returned as is.
    #[must_use]
    pub const fn apply_defaults(&self, rotation: Rotation) -> Rotation {
        if rotation.max_backups == 0 {
            Rotation {
                max_backups: self.default_max_backups,
                ..rotation
            }
        } else {
            rotation
        }
    }
}
