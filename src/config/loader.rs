//! Settings document loading.
//!
//! Loading runs in two stages:
//!
//! 1. **Decode**: parse the TOML document and build one
//!    [`RawExporterConfig`] per declared instance, overlaid on the factory
//!    default. Only shape and types are checked here.
//! 2. **Validate**: run every candidate through the [`Validator`] in
//!    instance-id order. The first rejection aborts the whole load.
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [exporters.file]
//!
//! [exporters."file/2"]
//! path = "./filename.json"
//! format = "json"
//!
//! [exporters."file/2".rotation]
//! max_megabytes = 10
//! max_days = 3
//! max_backups = 3
//! local_time = true
//! ```

use super::component_id::ComponentId;
use super::factory::FileExporterFactory;
use super::schema::{FileExporterConfig, RawExporterConfig};
use super::validation::{ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Error returned when a settings document cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid component id {0:?}")]
    InvalidId(String),

    #[error("unknown exporters type {:?} for {:?}", .0.kind(), .0.to_string())]
    UnknownType(ComponentId),

    #[error("exporter \"{id}\" has invalid configuration: {source}")]
    Invalid {
        id: ComponentId,
        source: ValidationError,
    },
}

/// Logging section of the settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Filter directive for the stderr logs, e.g. `"debug"`. Exported spans
    /// are not filtered by it.
    pub level: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    logging: LoggingSettings,
    #[serde(default)]
    exporters: BTreeMap<String, RawExporterConfig>,
}

/// A decoded document whose exporters have not been validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates {
    pub logging: LoggingSettings,
    pub exporters: BTreeMap<ComponentId, RawExporterConfig>,
}

/// A fully validated settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub logging: LoggingSettings,
    #[serde(serialize_with = "serialize_by_id")]
    pub exporters: BTreeMap<ComponentId, FileExporterConfig>,
}

fn serialize_by_id<S>(
    exporters: &BTreeMap<ComponentId, FileExporterConfig>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_map(exporters.iter().map(|(id, config)| (id.to_string(), config)))
}

/// Decodes and validates settings documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Loader {
    factory: FileExporterFactory,
    validator: Validator,
}

impl Loader {
    #[must_use]
    pub const fn new(factory: FileExporterFactory, validator: Validator) -> Self {
        Self { factory, validator }
    }

    /// Decodes a document into per-instance candidates.
    ///
    /// # Errors
    ///
    /// Fails on TOML syntax or type errors (including negative rotation
    /// values and unknown fields), malformed instance ids, and instance
    /// kinds other than the factory's.
    pub fn decode(&self, text: &str) -> Result<Candidates, ConfigError> {
        let document: Document = toml::from_str(text)?;

        let mut exporters = BTreeMap::new();
        for (key, overrides) in document.exporters {
            let id: ComponentId = key.parse()?;
            if id.kind() != self.factory.type_str() {
                return Err(ConfigError::UnknownType(id));
            }
            let candidate = self.factory.default_candidate().overlay(overrides);
            exporters.insert(id, candidate);
        }

        tracing::debug!(exporters = exporters.len(), "settings document decoded");

        Ok(Candidates {
            logging: document.logging,
            exporters,
        })
    }

    /// Validates every decoded candidate.
    ///
    /// # Errors
    ///
    /// Returns the first instance, in id order, that fails validation.
    pub fn validate(&self, candidates: Candidates) -> Result<Settings, ConfigError> {
        let exporters = candidates
            .exporters
            .iter()
            .map(|(id, candidate)| {
                self.validator
                    .validate_instance(id, candidate)
                    .map(|config| (id.clone(), config))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Settings {
            logging: candidates.logging,
            exporters,
        })
    }

    /// Decodes and validates a document held in memory.
    ///
    /// # Errors
    ///
    /// See [`Loader::decode`] and [`Loader::validate`].
    pub fn load_str(&self, text: &str) -> Result<Settings, ConfigError> {
        let _span = tracing::debug_span!("load_settings").entered();

        let settings = self.validate(self.decode(text)?)?;

        tracing::debug!(exporters = settings.exporters.len(), "settings validated");
        Ok(settings)
    }

    /// Reads, decodes and validates a document from disk.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, or as [`Loader::load_str`].
    pub fn load_file(&self, path: &Path) -> Result<Settings, ConfigError> {
        tracing::debug!(path = ?path, "loading settings file");
        let text = std::fs::read_to_string(path)?;
        self.load_str(&text)
    }
}

/// Loads and validates a settings file with the default factory and validator.
///
/// # Errors
///
/// See [`Loader::load_file`].
pub fn load_config(path: &Path) -> Result<Settings, ConfigError> {
    Loader::default().load_file(path)
}

/// Loads and validates an in-memory settings document with defaults.
///
/// # Errors
///
/// See [`Loader::load_str`].
pub fn load_str(text: &str) -> Result<Settings, ConfigError> {
    Loader::default().load_str(text)
}
