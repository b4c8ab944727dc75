//! OTLP/JSON span formatter.
//!
//! Converts OpenTelemetry span data into the OTLP JSON encoding, the same
//! shape an OTLP/HTTP collector accepts with `Content-Type: application/json`.

use super::SCOPE_NAME;
use opentelemetry::trace::{SpanId, SpanKind, Status};
use opentelemetry::{Array, KeyValue, Value};
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::resource::Resource;
use serde_json::Value as JsonValue;
use std::time::SystemTime;

/// OTLP/JSON span formatter.
///
/// Formats batches of spans into complete OTLP documents with resource
/// attributes, scope information and span details.
pub struct SpanFormatter {
    resource: Resource,
}

impl SpanFormatter {
    pub const fn new(resource: Resource) -> Self {
        Self { resource }
    }

    pub const fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn set_resource(&mut self, resource: Resource) {
        self.resource = resource;
    }

    /// Formats a batch of spans as one OTLP/JSON document.
    ///
    /// ```json
    /// {
    ///   "resourceSpans": [{
    ///     "resource": {
    ///       "attributes": [{"key": "service.name", "value": {"stringValue": "checkout"}}]
    ///     },
    ///     "scopeSpans": [{
    ///       "scope": {"name": "otlp-file-sink"},
    ///       "spans": [...]
    ///     }]
    ///   }]
    /// }
    /// ```
    pub fn format_batch(&self, batch: &[SpanData]) -> JsonValue {
        let resource_attrs: Vec<JsonValue> = self
            .resource
            .iter()
            .map(|(k, v)| {
                serde_json::json!({
                    "key": k.to_string(),
                    "value": format_attribute_value(v)
                })
            })
            .collect();

        let spans_json: Vec<JsonValue> = batch.iter().map(Self::format_span).collect();

        serde_json::json!({
            "resourceSpans": [{
                "resource": {
                    "attributes": resource_attrs
                },
                "scopeSpans": [{
                    "scope": {
                        "name": SCOPE_NAME,
                    },
                    "spans": spans_json
                }],
                "schemaUrl": self.resource.schema_url().unwrap_or_default(),
            }]
        })
    }

    /// Formats a single span.
    ///
    /// IDs are lowercase hex, timestamps are decimal strings of nanoseconds
    /// since the Unix epoch, as the OTLP/JSON mapping requires for 64-bit
    /// integers.
    fn format_span(span: &SpanData) -> JsonValue {
        let (status_code, status_message) = format_status(&span.status);
        let events: Vec<JsonValue> = span
            .events
            .iter()
            .map(|event| {
                serde_json::json!({
                    "timeUnixNano": unix_nanos(event.timestamp).to_string(),
                    "name": event.name,
                    "attributes": format_attributes(&event.attributes),
                    "droppedAttributesCount": event.dropped_attributes_count,
                })
            })
            .collect();
        let links: Vec<JsonValue> = span
            .links
            .iter()
            .map(|link| {
                serde_json::json!({
                    "traceId": format!("{:032x}", link.span_context.trace_id()),
                    "spanId": format!("{:016x}", link.span_context.span_id()),
                    "attributes": format_attributes(&link.attributes),
                    "droppedAttributesCount": link.dropped_attributes_count,
                })
            })
            .collect();
        let parent_span_id = if span.parent_span_id == SpanId::INVALID {
            String::new()
        } else {
            format!("{:016x}", span.parent_span_id)
        };

        serde_json::json!({
            "traceId": format!("{:032x}", span.span_context.trace_id()),
            "spanId": format!("{:016x}", span.span_context.span_id()),
            "traceState": span.span_context.trace_state().header(),
            "parentSpanId": parent_span_id,
            "name": span.name,
            "kind": span_kind_code(&span.span_kind),
            "startTimeUnixNano": unix_nanos(span.start_time).to_string(),
            "endTimeUnixNano": unix_nanos(span.end_time).to_string(),
            "attributes": format_attributes(&span.attributes),
            "droppedAttributesCount": span.dropped_attributes_count,
            "events": events,
            "droppedEventsCount": span.events.dropped_count,
            "links": links,
            "droppedLinksCount": span.links.dropped_count,
            "status": {
                "code": status_code,
                "message": status_message,
            },
        })
    }
}

impl std::fmt::Debug for SpanFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanFormatter").finish()
    }
}

/// Nanoseconds since the Unix epoch; times before the epoch map to zero.
pub(crate) fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// OTLP span kind code (1 = internal … 5 = consumer).
pub(crate) const fn span_kind_code(kind: &SpanKind) -> i32 {
    match kind {
        SpanKind::Internal => 1,
        SpanKind::Server => 2,
        SpanKind::Client => 3,
        SpanKind::Producer => 4,
        SpanKind::Consumer => 5,
    }
}

/// OTLP status code and message (0 = unset, 1 = ok, 2 = error).
pub(crate) fn format_status(status: &Status) -> (i32, String) {
    match status {
        Status::Unset => (0, String::new()),
        Status::Ok => (1, String::new()),
        Status::Error { description } => (2, description.to_string()),
    }
}

fn format_attributes(attributes: &[KeyValue]) -> Vec<JsonValue> {
    attributes
        .iter()
        .map(|kv| {
            serde_json::json!({
                "key": kv.key.to_string(),
                "value": format_attribute_value(&kv.value)
            })
        })
        .collect()
}

/// Maps an attribute value to its OTLP `AnyValue` JSON form.
///
/// Integers are strings, per the OTLP/JSON mapping.
fn format_attribute_value(value: &Value) -> JsonValue {
    match value {
        Value::Bool(b) => serde_json::json!({ "boolValue": b }),
        Value::I64(i) => serde_json::json!({ "intValue": i.to_string() }),
        Value::F64(f) => serde_json::json!({ "doubleValue": f }),
        Value::String(s) => serde_json::json!({ "stringValue": s.to_string() }),
        Value::Array(array) => serde_json::json!({
            "arrayValue": { "values": format_array(array) }
        }),
    }
}

#[allow(unreachable_patterns)]
fn format_array(array: &Array) -> Vec<JsonValue> {
    match array {
        Array::Bool(values) => values
            .iter()
            .map(|b| serde_json::json!({ "boolValue": b }))
            .collect(),
        Array::I64(values) => values
            .iter()
            .map(|i| serde_json::json!({ "intValue": i.to_string() }))
            .collect(),
        Array::F64(values) => values
            .iter()
            .map(|f| serde_json::json!({ "doubleValue": f }))
            .collect(),
        Array::String(values) => values
            .iter()
            .map(|s| serde_json::json!({ "stringValue": s.to_string() }))
            .collect(),
        other => vec![serde_json::json!({ "stringValue": other.to_string() })],
    }
}
