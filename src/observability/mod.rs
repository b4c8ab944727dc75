//! Logging and trace pipeline initialization.
//!
//! The sink logs through `tracing`. Level resolution:
//! 1. `RUST_LOG` environment variable (highest priority)
//! 2. `[logging] level` in the settings document
//! 3. Default: `"info"`
//!
//! [`init_tracing`] additionally routes `tracing` spans through the
//! OpenTelemetry SDK into the configured file exporters.

mod init;

pub use init::{init_logging, init_tracing, with_startup_logging, DEFAULT_LEVEL};
