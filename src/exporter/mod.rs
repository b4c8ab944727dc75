//! File-based OTLP trace export.
//!
//! This module turns a validated [`FileExporterConfig`](crate::config::FileExporterConfig)
//! into a working OpenTelemetry span exporter:
//!
//! ```text
//! tracing-opentelemetry → OpenTelemetry SDK → FileSpanExporter
//!     → Marshaler (OTLP JSON | OTLP protobuf, optional zstd, framing)
//!     → FileWriter (append, optional rotation)
//! ```
//!
//! # Modules
//!
//! - [`span_exporter`]: `SpanExporter` implementation and tracer provider setup
//! - [`marshaler`]: encoding, compression and framing of batches
//! - [`span_formatter`]: OTLP/JSON serialization
//! - [`proto`]: OTLP protobuf serialization
//! - [`file_writer`]: appending writer with size-based rotation

pub mod file_writer;
pub mod marshaler;
pub mod proto;
pub mod span_exporter;
pub mod span_formatter;

pub use file_writer::FileWriter;
pub use marshaler::{split_frames, Marshaler};
pub use span_exporter::{create_tracer_provider, FileSpanExporter};

/// Instrumentation scope name recorded on every exported batch.
pub const SCOPE_NAME: &str = "otlp-file-sink";

#[cfg(test)]
pub(crate) mod test_support {
    use opentelemetry::trace::{
        SpanContext, SpanId, SpanKind, Status, TraceFlags, TraceId, TraceState,
    };
    use opentelemetry::InstrumentationLibrary;
    use opentelemetry_sdk::export::trace::SpanData;
    use opentelemetry_sdk::trace::{SpanEvents, SpanLinks};
    use std::time::{Duration, SystemTime};

    /// A finished client span: trace id 42, span id 7, no parent, started one
    /// second after the epoch, failed with "card declined".
    pub fn sample_span(name: &'static str) -> SpanData {
        SpanData {
            span_context: SpanContext::new(
                TraceId::from_bytes(42_u128.to_be_bytes()),
                SpanId::from_bytes(7_u64.to_be_bytes()),
                TraceFlags::SAMPLED,
                false,
                TraceState::default(),
            ),
            parent_span_id: SpanId::INVALID,
            span_kind: SpanKind::Client,
            name: name.into(),
            start_time: SystemTime::UNIX_EPOCH + Duration::from_secs(1),
            end_time: SystemTime::UNIX_EPOCH + Duration::from_secs(2),
            attributes: Vec::new(),
            dropped_attributes_count: 0,
            events: SpanEvents::default(),
            links: SpanLinks::default(),
            status: Status::error("card declined"),
            instrumentation_lib: InstrumentationLibrary::builder(super::SCOPE_NAME).build(),
        }
    }
}
