//! Configuration schema for the file exporter.
//!
//! Two shapes exist for the same settings:
//!
//! - [`RawExporterConfig`]: the decoded candidate. `format` and `compression`
//!   are still free strings exactly as written in the document.
//! - [`FileExporterConfig`]: the validated, defaulted value handed to writers.
//!   Enumerated fields are closed variants here.
//!
//! The only way from the first to the second is
//! [`Validator::validate`](super::Validator::validate).

use super::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serialization format of exported records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// OTLP/JSON, one document per line when uncompressed.
    #[default]
    Json,
    /// OTLP protobuf, length-prefixed.
    Proto,
}

impl Format {
    /// Canonical document spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Proto => "proto",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "proto" | "protobuf" => Ok(Self::Proto),
            other => Err(ValidationError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Compression applied to each encoded payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Payloads are written as encoded.
    #[default]
    None,
    /// Each payload is a zstd frame.
    Zstd,
}

impl Compression {
    /// Canonical document spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zstd => "zstd",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = ValidationError;

    /// An empty string is read as "no compression".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(Self::None),
            "zstd" => Ok(Self::Zstd),
            other => Err(ValidationError::UnsupportedCompression(other.to_string())),
        }
    }
}

/// Log rotation policy.
///
/// Every field defaults to zero/false when omitted from the document. Zero
/// values are meaningful: `max_megabytes = 0` selects the writer's built-in
/// size threshold, `max_days = 0` disables age-based pruning, and
/// `max_backups = 0` is replaced by the validator's default backup count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rotation {
    /// Size threshold in megabytes before the file is rolled.
    pub max_megabytes: u32,
    /// Maximum age in days of a rolled file before it is removed.
    pub max_days: u32,
    /// Maximum number of rolled files kept.
    pub max_backups: u32,
    /// Timestamp rolled files in local time instead of UTC.
    pub local_time: bool,
}

/// A decoded, not yet validated exporter configuration.
///
/// Fields left `None` were not present in the document (or in the factory
/// default the document was overlaid on).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawExporterConfig {
    pub path: Option<String>,
    pub format: Option<String>,
    pub compression: Option<String>,
    pub rotation: Option<Rotation>,
}

impl RawExporterConfig {
    /// Returns `self` with every field that `overrides` sets replaced.
    ///
    /// A `rotation` block in `overrides` replaces the whole block; rotation
    /// fields are not merged one by one.
    #[must_use]
    pub fn overlay(self, overrides: Self) -> Self {
        Self {
            path: overrides.path.or(self.path),
            format: overrides.format.or(self.format),
            compression: overrides.compression.or(self.compression),
            rotation: overrides.rotation.or(self.rotation),
        }
    }
}

/// Validated configuration of one file exporter instance.
///
/// Produced by [`Validator::validate`](super::Validator::validate) and
/// immutable from then on; writers share it behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileExporterConfig {
    /// Destination file.
    pub path: String,
    pub format: Format,
    pub compression: Compression,
    /// `None` disables rotation: the file grows without rolling.
    pub rotation: Option<Rotation>,
}

impl From<&FileExporterConfig> for RawExporterConfig {
    fn from(config: &FileExporterConfig) -> Self {
        Self {
            path: Some(config.path.clone()),
            format: Some(config.format.as_str().to_string()),
            compression: Some(config.compression.as_str().to_string()),
            rotation: config.rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_accepts_known_spellings_only() {
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("proto".parse::<Format>().unwrap(), Format::Proto);
        assert_eq!("protobuf".parse::<Format>().unwrap(), Format::Proto);

        for bad in ["", "JSON", "exotic", "yaml"] {
            assert_eq!(
                bad.parse::<Format>(),
                Err(ValidationError::UnsupportedFormat(bad.to_string()))
            );
        }
    }

    #[test]
    fn compression_treats_empty_as_none() {
        assert_eq!("".parse::<Compression>().unwrap(), Compression::None);
        assert_eq!("none".parse::<Compression>().unwrap(), Compression::None);
        assert_eq!("zstd".parse::<Compression>().unwrap(), Compression::Zstd);
        assert_eq!(
            "gzip".parse::<Compression>(),
            Err(ValidationError::UnsupportedCompression("gzip".to_string()))
        );
    }

    #[test]
    fn overlay_prefers_overrides() {
        let base = RawExporterConfig {
            path: Some(String::new()),
            format: Some("json".to_string()),
            compression: Some("none".to_string()),
            rotation: None,
        };
        let overrides = RawExporterConfig {
            path: Some("./foo".to_string()),
            rotation: Some(Rotation {
                max_megabytes: 1234,
                ..Rotation::default()
            }),
            ..RawExporterConfig::default()
        };

        let merged = base.overlay(overrides);
        assert_eq!(merged.path.as_deref(), Some("./foo"));
        assert_eq!(merged.format.as_deref(), Some("json"));
        assert_eq!(merged.compression.as_deref(), Some("none"));
        assert_eq!(merged.rotation.map(|r| r.max_megabytes), Some(1234));
    }

    #[test]
    fn validated_config_round_trips_into_candidate() {
        let config = FileExporterConfig {
            path: "./filename".to_string(),
            format: Format::Proto,
            compression: Compression::Zstd,
            rotation: None,
        };
        let raw = RawExporterConfig::from(&config);
        assert_eq!(raw.format.as_deref(), Some("proto"));
        assert_eq!(raw.compression.as_deref(), Some("zstd"));
    }
}
