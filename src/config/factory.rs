//! Factory for file exporter instances.

use super::schema::{Compression, FileExporterConfig, Format, RawExporterConfig};
use crate::domain::Result;
use crate::exporter::FileSpanExporter;
use opentelemetry_sdk::resource::Resource;
use std::sync::Arc;

/// Component kind handled by this factory, as written in instance ids.
pub const TYPE_STR: &str = "file";

/// Creates default configurations and exporters for the `file` kind.
///
/// The loader asks the factory for a default per declared instance and
/// overlays the document on top of it. The default path is empty, so an
/// instance that declares nothing fails validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExporterFactory;

impl FileExporterFactory {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Kind this factory serves.
    #[must_use]
    pub const fn type_str(&self) -> &'static str {
        TYPE_STR
    }

    /// Zero-value configuration: empty path, JSON, no compression, no rotation.
    #[must_use]
    pub fn create_default_config(&self) -> FileExporterConfig {
        FileExporterConfig {
            path: String::new(),
            format: Format::Json,
            compression: Compression::None,
            rotation: None,
        }
    }

    /// The default configuration as a candidate, ready to be overlaid.
    #[must_use]
    pub fn default_candidate(&self) -> RawExporterConfig {
        RawExporterConfig::from(&self.create_default_config())
    }

    /// Builds a span exporter writing to the validated destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination's parent directory cannot be
    /// created.
    pub fn create_exporter(
        &self,
        config: Arc<FileExporterConfig>,
        resource: Resource,
    ) -> Result<FileSpanExporter> {
        FileSpanExporter::new(config, resource)
    }
}
