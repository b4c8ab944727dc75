//! otlp-file-sink: a telemetry file sink with a strictly validated configuration.
//!
//! The sink accepts OpenTelemetry spans and persists them to local files, one
//! file per configured exporter instance, with a choice of OTLP JSON or OTLP
//! protobuf, optional zstd compression and optional size/age-based rotation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  CLI (main.rs)                                      │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Configuration (config/)                            │
//! │  - Settings document decoding (TOML)                │
//! │  - Factory defaults per instance                    │
//! │  - Validation and defaulting                        │
//! └─────────────────────────────────────────────────────┘
//!                        │  FileExporterConfig (immutable, Arc)
//! ┌─────────────────────────────────────────────────────┐
//! │  Export (exporter/)                                 │
//! │  - SpanExporter for the OpenTelemetry SDK           │
//! │  - OTLP JSON / protobuf encoding, zstd, framing     │
//! │  - Rotating file writer                             │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Observability (observability/)                     │
//! │  - tracing subscriber, OpenTelemetry layer          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [exporters.file]
//! path = "./traces.json"
//!
//! [exporters."file/archive"]
//! path = "./archive/traces.pb"
//! format = "proto"
//! compression = "zstd"
//!
//! [exporters."file/archive".rotation]
//! max_megabytes = 10
//! max_days = 3
//! max_backups = 3
//! local_time = true
//! ```
//!
//! Every declared instance must validate; one invalid instance fails the
//! whole load with a message naming it:
//!
//! ```rust
//! use otlp_file_sink::config::load_str;
//!
//! let err = load_str("[exporters.file]\n").unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "exporter \"file\" has invalid configuration: path must be non-empty"
//! );
//! ```
//!
//! # Modules
//!
//! - [`config`]: settings decoding, validation, defaults, factory
//! - [`exporter`]: span export to local files
//! - [`observability`]: subscriber setup
//! - [`domain`]: crate-wide error type

#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod domain;
pub mod exporter;
pub mod observability;

pub use config::{
    ComponentId, Compression, ConfigError, FileExporterConfig, FileExporterFactory, Format,
    Rotation, Settings, ValidationError, Validator,
};
pub use domain::{FileSinkError, Result};
pub use exporter::{create_tracer_provider, FileSpanExporter};
