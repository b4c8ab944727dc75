//! Instance identifiers for configured components.
//!
//! A settings document may declare several instances of the same component
//! kind. Each one is addressed as `kind` or `kind/name`, e.g. `file` and
//! `file/2`.

use super::loader::ConfigError;
use std::fmt;
use std::str::FromStr;

const NAME_SEPARATOR: char = '/';

/// Identifies one configured instance of a component.
///
/// Ordering is by kind, then by name, with the unnamed instance first. The
/// loader relies on this to validate instances in a reproducible order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId {
    kind: String,
    name: Option<String>,
}

impl ComponentId {
    /// Creates the unnamed instance id for `kind`.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
        }
    }

    /// Creates the id `kind/name`.
    #[must_use]
    pub fn with_name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: Some(name.into()),
        }
    }

    /// Component kind, e.g. `file`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Instance name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}{NAME_SEPARATOR}{name}", self.kind),
            None => f.write_str(&self.kind),
        }
    }
}

impl FromStr for ComponentId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidId(s.to_string());

        let (kind, name) = match s.split_once(NAME_SEPARATOR) {
            Some((kind, name)) => (kind.trim(), Some(name.trim())),
            None => (s.trim(), None),
        };

        if kind.is_empty() {
            return Err(invalid());
        }

        match name {
            Some(name) if name.is_empty() => Err(invalid()),
            Some(name) => Ok(Self::with_name(kind, name)),
            None => Ok(Self::new(kind)),
        }
    }
}
