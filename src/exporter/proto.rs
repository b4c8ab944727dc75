//! OTLP protobuf encoding of span batches.
//!
//! Builds an `ExportTraceServiceRequest`, the message an OTLP/gRPC collector
//! receives, and serializes it with `prost`.

use super::span_formatter::{format_status, span_kind_code, unix_nanos};
use super::SCOPE_NAME;
use opentelemetry::trace::SpanId;
use opentelemetry::{Array, KeyValue, Value};
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{
    any_value, AnyValue, ArrayValue, InstrumentationScope, KeyValue as ProtoKeyValue,
};
use opentelemetry_proto::tonic::resource::v1::Resource as ProtoResource;
use opentelemetry_proto::tonic::trace::v1::{span, ResourceSpans, ScopeSpans, Span, Status};
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::resource::Resource;
use prost::Message;

/// Encodes `batch` as a serialized `ExportTraceServiceRequest`.
pub fn encode_batch(resource: &Resource, batch: &[SpanData]) -> Vec<u8> {
    build_request(resource, batch).encode_to_vec()
}

pub(crate) fn build_request(resource: &Resource, batch: &[SpanData]) -> ExportTraceServiceRequest {
    let attributes = resource
        .iter()
        .map(|(k, v)| ProtoKeyValue {
            key: k.to_string(),
            value: Some(to_any_value(v)),
        })
        .collect();

    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(ProtoResource {
                attributes,
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                scope: Some(InstrumentationScope {
                    name: SCOPE_NAME.to_string(),
                    ..Default::default()
                }),
                spans: batch.iter().map(proto_span).collect(),
                ..Default::default()
            }],
            schema_url: resource.schema_url().unwrap_or_default().to_string(),
            ..Default::default()
        }],
    }
}

fn proto_span(data: &SpanData) -> Span {
    let (code, message) = format_status(&data.status);
    let parent_span_id = if data.parent_span_id == SpanId::INVALID {
        Vec::new()
    } else {
        data.parent_span_id.to_bytes().to_vec()
    };

    Span {
        trace_id: data.span_context.trace_id().to_bytes().to_vec(),
        span_id: data.span_context.span_id().to_bytes().to_vec(),
        trace_state: data.span_context.trace_state().header(),
        parent_span_id,
        name: data.name.to_string(),
        kind: span_kind_code(&data.span_kind),
        start_time_unix_nano: unix_nanos(data.start_time),
        end_time_unix_nano: unix_nanos(data.end_time),
        attributes: key_values(&data.attributes),
        dropped_attributes_count: data.dropped_attributes_count,
        events: data
            .events
            .iter()
            .map(|event| span::Event {
                time_unix_nano: unix_nanos(event.timestamp),
                name: event.name.to_string(),
                attributes: key_values(&event.attributes),
                dropped_attributes_count: event.dropped_attributes_count,
                ..Default::default()
            })
            .collect(),
        dropped_events_count: data.events.dropped_count,
        links: data
            .links
            .iter()
            .map(|link| span::Link {
                trace_id: link.span_context.trace_id().to_bytes().to_vec(),
                span_id: link.span_context.span_id().to_bytes().to_vec(),
                trace_state: link.span_context.trace_state().header(),
                attributes: key_values(&link.attributes),
                dropped_attributes_count: link.dropped_attributes_count,
                ..Default::default()
            })
            .collect(),
        dropped_links_count: data.links.dropped_count,
        status: Some(Status { message, code }),
        ..Default::default()
    }
}

fn key_values(attributes: &[KeyValue]) -> Vec<ProtoKeyValue> {
    attributes
        .iter()
        .map(|kv| ProtoKeyValue {
            key: kv.key.to_string(),
            value: Some(to_any_value(&kv.value)),
        })
        .collect()
}

fn to_any_value(value: &Value) -> AnyValue {
    let value = match value {
        Value::Bool(b) => any_value::Value::BoolValue(*b),
        Value::I64(i) => any_value::Value::IntValue(*i),
        Value::F64(f) => any_value::Value::DoubleValue(*f),
        Value::String(s) => any_value::Value::StringValue(s.to_string()),
        Value::Array(array) => any_value::Value::ArrayValue(ArrayValue {
            values: array_values(array),
        }),
    };
    AnyValue { value: Some(value) }
}

#[allow(unreachable_patterns)]
fn array_values(array: &Array) -> Vec<AnyValue> {
    let wrap = |value| AnyValue { value: Some(value) };
    match array {
        Array::Bool(values) => values
            .iter()
            .map(|b| wrap(any_value::Value::BoolValue(*b)))
            .collect(),
        Array::I64(values) => values
            .iter()
            .map(|i| wrap(any_value::Value::IntValue(*i)))
            .collect(),
        Array::F64(values) => values
            .iter()
            .map(|f| wrap(any_value::Value::DoubleValue(*f)))
            .collect(),
        Array::String(values) => values
            .iter()
            .map(|s| wrap(any_value::Value::StringValue(s.to_string())))
            .collect(),
        other => vec![wrap(any_value::Value::StringValue(other.to_string()))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::test_support::sample_span;

    #[test]
    fn request_decodes_back_with_ids_and_status() {
        let resource = Resource::new(vec![KeyValue::new("service.name", "checkout")]);
        let bytes = encode_batch(&resource, &[sample_span("charge")]);

        let request = ExportTraceServiceRequest::decode(bytes.as_slice()).unwrap();
        let resource_spans = &request.resource_spans[0];
        let scope_spans = &resource_spans.scope_spans[0];
        assert_eq!(scope_spans.scope.as_ref().unwrap().name, SCOPE_NAME);

        let exported = &scope_spans.spans[0];
        assert_eq!(exported.name, "charge");
        assert_eq!(exported.kind, span::SpanKind::Client as i32);
        assert_eq!(exported.trace_id.len(), 16);
        assert_eq!(exported.span_id, 7_u64.to_be_bytes().to_vec());
        assert!(exported.parent_span_id.is_empty());
        assert_eq!(exported.start_time_unix_nano, 1_000_000_000);
        assert_eq!(exported.status.as_ref().unwrap().message, "card declined");

        let attrs = &resource_spans.resource.as_ref().unwrap().attributes;
        assert_eq!(attrs[0].key, "service.name");
    }
}
