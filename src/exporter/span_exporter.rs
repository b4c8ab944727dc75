//! OpenTelemetry span exporter writing to a local file.

use super::file_writer::FileWriter;
use super::marshaler::Marshaler;
use crate::config::FileExporterConfig;
use crate::domain::Result;
use futures_util::future::BoxFuture;
use opentelemetry::trace::TraceError;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::resource::Resource;
use opentelemetry_sdk::trace::TracerProvider;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// File-based OpenTelemetry span exporter.
///
/// Each exported batch is encoded according to the instance's configured
/// format and compression and appended to its destination, rolling the file
/// if the configuration carries a rotation policy.
pub struct FileSpanExporter {
    config: Arc<FileExporterConfig>,
    writer: FileWriter,
    marshaler: Marshaler,
    is_shutdown: AtomicBool,
}

impl FileSpanExporter {
    /// Creates an exporter for a validated configuration.
    ///
    /// Creates the destination's parent directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn new(config: Arc<FileExporterConfig>, resource: Resource) -> Result<Self> {
        let path = PathBuf::from(&config.path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tracing::debug!(parent = ?parent, "creating output directory");
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self {
            writer: FileWriter::new(path, config.rotation),
            marshaler: Marshaler::for_config(&config, resource),
            config,
            is_shutdown: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn config(&self) -> &FileExporterConfig {
        &self.config
    }

    /// Encodes and writes one batch synchronously.
    ///
    /// # Errors
    ///
    /// Fails after [`SpanExporter::shutdown`], or if encoding or writing fails.
    pub fn export_batch(&self, batch: &[SpanData]) -> Result<()> {
        if self.is_shutdown.load(Ordering::SeqCst) {
            return Err(crate::FileSinkError::Export("exporter is shut down".to_string()));
        }

        let payload = self.marshaler.marshal(batch)?;
        self.writer.write_all(&payload)?;

        tracing::trace!(
            path = %self.config.path,
            spans = batch.len(),
            bytes = payload.len(),
            "batch written"
        );
        Ok(())
    }
}

impl SpanExporter for FileSpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = self
            .export_batch(&batch)
            .map_err(|e| TraceError::from(e.to_string()));
        Box::pin(std::future::ready(result))
    }

    /// Stops accepting batches. Already written data stays on disk; every
    /// write is flushed as it happens.
    fn shutdown(&mut self) {
        self.is_shutdown.store(true, Ordering::SeqCst);
    }

    fn set_resource(&mut self, res: &Resource) {
        self.marshaler.set_resource(res.clone());
    }
}

impl std::fmt::Debug for FileSpanExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSpanExporter")
            .field("config", &self.config)
            .field("writer", &self.writer)
            .field("marshaler", &self.marshaler)
            .field("is_shutdown", &self.is_shutdown)
            .finish()
    }
}

/// Creates a tracer provider exporting to every given file exporter.
///
/// Spans are exported immediately as they end (simple, non-batched
/// processing), one processor per exporter.
///
/// # Example
///
/// ```rust,no_run
/// use opentelemetry::KeyValue;
/// use opentelemetry_sdk::resource::Resource;
/// use otlp_file_sink::config::load_str;
/// use otlp_file_sink::exporter::{create_tracer_provider, FileSpanExporter};
/// use std::sync::Arc;
///
/// let settings = load_str("[exporters.file]\npath = \"/tmp/traces.json\"\n")?;
/// let resource = Resource::new(vec![KeyValue::new("service.name", "myapp")]);
/// let exporters = settings
///     .exporters
///     .into_values()
///     .map(|config| FileSpanExporter::new(Arc::new(config), resource.clone()))
///     .collect::<Result<Vec<_>, _>>()?;
/// let provider = create_tracer_provider(exporters, resource);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn create_tracer_provider(exporters: Vec<FileSpanExporter>, resource: Resource) -> TracerProvider {
    let builder = TracerProvider::builder()
        .with_config(opentelemetry_sdk::trace::Config::default().with_resource(resource));

    exporters
        .into_iter()
        .fold(builder, |builder, exporter| builder.with_simple_exporter(exporter))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Compression, Format};
    use crate::exporter::test_support::sample_span;
    use opentelemetry::KeyValue;
    use tempfile::TempDir;

    fn config(path: PathBuf) -> Arc<FileExporterConfig> {
        Arc::new(FileExporterConfig {
            path: path.to_string_lossy().into_owned(),
            format: Format::Json,
            compression: Compression::None,
            rotation: None,
        })
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("traces.json");

        let exporter = FileSpanExporter::new(config(path.clone()), Resource::empty()).unwrap();
        exporter.export_batch(&[sample_span("a")]).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn refuses_exports_after_shutdown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("traces.json");
        let mut exporter = FileSpanExporter::new(config(path.clone()), Resource::empty()).unwrap();

        exporter.export_batch(&[sample_span("a")]).unwrap();
        exporter.shutdown();

        let err = exporter.export_batch(&[sample_span("b")]).unwrap_err();
        assert_eq!(err.to_string(), "Export error: exporter is shut down");
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn set_resource_changes_exported_attributes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("traces.json");
        let mut exporter = FileSpanExporter::new(config(path.clone()), Resource::empty()).unwrap();

        exporter.set_resource(&Resource::new(vec![KeyValue::new("service.name", "late")]));
        exporter.export_batch(&[sample_span("a")]).unwrap();

        let line = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(
            json["resourceSpans"][0]["resource"]["attributes"][0]["value"]["stringValue"],
            "late"
        );
    }
}
