//! Subscriber setup for the sink's own logs and for traces routed to files.

use crate::exporter::SCOPE_NAME;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log level used when neither `RUST_LOG` nor the settings document set one.
pub const DEFAULT_LEVEL: &str = "info";

/// Target prefix of this crate's own events.
const CRATE_TARGET: &str = "otlp_file_sink";

/// Resolves the filter: `RUST_LOG` first, then `level`, then [`DEFAULT_LEVEL`].
fn env_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(DEFAULT_LEVEL)))
}

/// Stderr log layer. `level` filters this layer only.
fn stderr_layer<S>(level: Option<&str>) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter(level))
}

/// Installs a stderr log subscriber.
///
/// Idempotent: only the first subscriber installed in a process takes effect.
pub fn init_logging(level: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(stderr_layer(level))
        .try_init();
}

/// Runs `f` with a stderr log subscriber at the default level, without
/// installing it globally.
///
/// Covers work done before the settings document, and with it the configured
/// level, is known, such as loading that document.
pub fn with_startup_logging<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::registry().with(stderr_layer(None));
    tracing::subscriber::with_default(subscriber, f)
}

/// Stderr logs plus an OpenTelemetry layer feeding `provider`.
///
/// Every span outside the crate's own target reaches the OpenTelemetry layer
/// whatever the log level is.
fn tracing_subscriber_for(
    level: Option<&str>,
    provider: &TracerProvider,
) -> impl Subscriber + Send + Sync {
    let tracer = provider.tracer(SCOPE_NAME);
    let otel_layer = OpenTelemetryLayer::new(tracer).with_filter(
        Targets::new()
            .with_default(LevelFilter::TRACE)
            .with_target(CRATE_TARGET, LevelFilter::OFF),
    );

    tracing_subscriber::registry()
        .with(stderr_layer(level))
        .with(otel_layer)
}

/// Installs a stderr log subscriber plus an OpenTelemetry layer feeding
/// `provider`.
///
/// `level` only filters the stderr logs. The crate's own spans are kept out
/// of the OpenTelemetry layer: they are emitted while a batch is being
/// written, and exporting them would re-enter the exporter.
///
/// # Example
///
/// ```rust,no_run
/// use opentelemetry_sdk::resource::Resource;
/// use otlp_file_sink::exporter::create_tracer_provider;
/// use otlp_file_sink::observability::init_tracing;
///
/// let provider = create_tracer_provider(Vec::new(), Resource::empty());
/// init_tracing(Some("debug"), &provider);
///
/// tracing::info_span!(target: "app", "request").in_scope(|| {
///     tracing::info!(target: "app", "handled");
/// });
/// ```
pub fn init_tracing(level: Option<&str>, provider: &TracerProvider) {
    let _ = tracing_subscriber_for(level, provider).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Compression, FileExporterConfig, Format};
    use crate::exporter::{create_tracer_provider, FileSpanExporter};
    use opentelemetry_sdk::resource::Resource;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn json_exporter(dir: &TempDir) -> (FileSpanExporter, std::path::PathBuf) {
        let path = dir.path().join("traces.json");
        let config = Arc::new(FileExporterConfig {
            path: path.to_string_lossy().into_owned(),
            format: Format::Json,
            compression: Compression::None,
            rotation: None,
        });
        (FileSpanExporter::new(config, Resource::empty()).unwrap(), path)
    }

    #[test]
    fn log_level_does_not_filter_exported_spans() {
        let dir = TempDir::new().unwrap();
        let (exporter, path) = json_exporter(&dir);
        let provider = create_tracer_provider(vec![exporter], Resource::empty());

        let subscriber = tracing_subscriber_for(Some("warn"), &provider);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info_span!(target: "emit", "sample").in_scope(|| {
                tracing::info!(target: "emit", "sample event");
            });
        });
        let _ = provider.force_flush();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"sample\""));
    }

    #[test]
    fn crate_spans_are_not_exported() {
        let dir = TempDir::new().unwrap();
        let (exporter, path) = json_exporter(&dir);
        let provider = create_tracer_provider(vec![exporter], Resource::empty());

        let subscriber = tracing_subscriber_for(None, &provider);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info_span!(target: "otlp_file_sink::config", "internal").in_scope(|| {});
        });
        let _ = provider.force_flush();

        assert!(!path.exists() || std::fs::read_to_string(&path).unwrap().is_empty());
    }

    #[test]
    fn startup_logging_runs_the_closure() {
        let settings = with_startup_logging(|| crate::config::load_str(""));
        assert!(settings.unwrap().exporters.is_empty());
    }

    #[test]
    fn explicit_level_is_used_without_rust_log() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert_eq!(env_filter(Some("debug")).to_string(), "debug");
        assert_eq!(env_filter(None).to_string(), DEFAULT_LEVEL);
    }
}
