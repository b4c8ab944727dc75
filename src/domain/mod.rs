//! Domain layer shared by configuration and export.
//!
//! - [`error`]: crate-wide error type and result alias

pub mod error;

pub use error::{FileSinkError, Result};
