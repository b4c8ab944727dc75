//! Payload encoding and framing.
//!
//! | format | compression | on disk                               |
//! |--------|-------------|---------------------------------------|
//! | json   | none        | one OTLP/JSON document per line       |
//! | json   | zstd        | length-prefixed zstd frame            |
//! | proto  | none        | length-prefixed protobuf message      |
//! | proto  | zstd        | length-prefixed zstd frame            |
//!
//! A length prefix is a 4-byte big-endian payload size.

use super::proto;
use super::span_formatter::SpanFormatter;
use crate::config::{Compression, FileExporterConfig, Format};
use crate::domain::{FileSinkError, Result};
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::resource::Resource;

const LENGTH_PREFIX_BYTES: usize = 4;

/// Encodes span batches into framed bytes ready to append to the output file.
#[derive(Debug)]
pub struct Marshaler {
    format: Format,
    compression: Compression,
    formatter: SpanFormatter,
}

impl Marshaler {
    pub const fn new(format: Format, compression: Compression, resource: Resource) -> Self {
        Self {
            format,
            compression,
            formatter: SpanFormatter::new(resource),
        }
    }

    pub fn for_config(config: &FileExporterConfig, resource: Resource) -> Self {
        Self::new(config.format, config.compression, resource)
    }

    pub fn set_resource(&mut self, resource: Resource) {
        self.formatter.set_resource(resource);
    }

    /// Whether output is newline-delimited text rather than length-prefixed.
    pub fn is_line_delimited(&self) -> bool {
        self.format == Format::Json && self.compression == Compression::None
    }

    /// Encodes, compresses and frames one batch.
    ///
    /// # Errors
    ///
    /// Fails if JSON serialization or compression fails, or if a framed
    /// payload would not fit the 4-byte length prefix.
    pub fn marshal(&self, batch: &[SpanData]) -> Result<Vec<u8>> {
        let encoded = match self.format {
            Format::Json => serde_json::to_vec(&self.formatter.format_batch(batch))
                .map_err(|e| FileSinkError::Encode(format!("failed to serialize JSON: {e}")))?,
            Format::Proto => proto::encode_batch(self.formatter.resource(), batch),
        };

        let payload = match self.compression {
            Compression::None => encoded,
            Compression::Zstd => zstd::encode_all(encoded.as_slice(), 0)
                .map_err(|e| FileSinkError::Encode(format!("failed to compress: {e}")))?,
        };

        if self.is_line_delimited() {
            let mut line = payload;
            line.push(b'\n');
            return Ok(line);
        }

        let length = u32::try_from(payload.len())
            .map_err(|_| FileSinkError::Encode("payload exceeds 4 GiB".to_string()))?;
        let mut framed = Vec::with_capacity(LENGTH_PREFIX_BYTES + payload.len());
        framed.extend_from_slice(&length.to_be_bytes());
        framed.extend_from_slice(&payload);
        Ok(framed)
    }
}

/// Splits length-prefixed output back into its payloads.
///
/// # Errors
///
/// Fails with [`FileSinkError::Encode`] if the data ends inside a frame.
pub fn split_frames(mut data: &[u8]) -> Result<Vec<&[u8]>> {
    let truncated = || FileSinkError::Encode("truncated frame".to_string());
    let mut frames = Vec::new();

    while !data.is_empty() {
        if data.len() < LENGTH_PREFIX_BYTES {
            return Err(truncated());
        }
        let (prefix, rest) = data.split_at(LENGTH_PREFIX_BYTES);
        let prefix: [u8; LENGTH_PREFIX_BYTES] = prefix.try_into().map_err(|_| truncated())?;
        let length = usize::try_from(u32::from_be_bytes(prefix)).map_err(|_| truncated())?;
        if rest.len() < length {
            return Err(truncated());
        }
        let (frame, rest) = rest.split_at(length);
        frames.push(frame);
        data = rest;
    }

    Ok(frames)
}
