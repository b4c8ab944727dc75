//! Error types for the file sink.
//!
//! This module defines the crate-wide error type [`FileSinkError`] and a type alias
//! [`Result`] used by the exporter and the command-line entry point. Configuration
//! loading has its own, more specific error ([`crate::config::ConfigError`]) which
//! converts into [`FileSinkError`] with `?`.

use crate::config::ConfigError;
use thiserror::Error;

/// The main error type for file sink operations.
///
/// Most variants wrap underlying errors using `#[from]` so call sites can
/// propagate with `?`.
///
/// # Examples
///
/// ```
/// use otlp_file_sink::FileSinkError;
///
/// fn refuse() -> Result<(), FileSinkError> {
///     Err(FileSinkError::Export("exporter is shut down".to_string()))
/// }
/// assert!(refuse().is_err());
/// ```
#[derive(Debug, Error)]
pub enum FileSinkError {
    /// The exporter configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Filesystem or I/O operation failed.
    ///
    /// Covers opening, writing, rotating and pruning output files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A batch could not be encoded in the configured format.
    #[error("Encoding error: {0}")]
    Encode(String),

    /// The exporter refused or failed an export.
    #[error("Export error: {0}")]
    Export(String),
}

/// A specialized `Result` type for file sink operations.
pub type Result<T> = std::result::Result<T, FileSinkError>;
