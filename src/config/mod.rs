//! Exporter configuration: decoding, validation and defaulting.
//!
//! # Data Flow
//! ```text
//! settings document (TOML)
//!     → loader.rs (decode, overlay on factory default)
//!     → RawExporterConfig per instance id
//!     → validation.rs (rules in fixed order, then defaults)
//!     → FileExporterConfig (validated, immutable)
//!     → shared via Arc with the exporter
//! ```
//!
//! # Design Decisions
//! - Decode-time checks (types, unknown fields, negative numbers) are separate
//!   from validation-time checks (semantic acceptability)
//! - Defaults apply only to absent or zero-valued fields, never to invalid ones
//! - One invalid instance fails the whole document; nothing partial is returned

pub mod component_id;
pub mod factory;
pub mod loader;
pub mod schema;
pub mod validation;

pub use component_id::ComponentId;
pub use factory::{FileExporterFactory, TYPE_STR};
pub use loader::{load_config, load_str, Candidates, ConfigError, Loader, LoggingSettings, Settings};
pub use schema::{Compression, FileExporterConfig, Format, RawExporterConfig, Rotation};
pub use validation::{ValidationError, Validator, DEFAULT_MAX_BACKUPS};
