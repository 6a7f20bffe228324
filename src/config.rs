//! Binding options.

use crate::error::BindError;
use serde::{Deserialize, Serialize};

/// Options for a [`Bindings`](crate::Bindings) hub.
///
/// # JSON Schema
///
/// ```json
/// {
///   "registry_capacity": 64,
///   "warn_cross_thread": false
/// }
/// ```
///
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Initial capacity of each category's registry map
    pub registry_capacity: usize,
    /// Log a warning when a wrapper is disposed or dropped on a thread other
    /// than the one that created it
    pub warn_cross_thread: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            registry_capacity: 64,
            warn_cross_thread: false,
        }
    }
}

impl Options {
    /// Parse options from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, BindError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let options = Options::from_json(r#"{"warn_cross_thread": true}"#).unwrap();
        assert_eq!(options.registry_capacity, 64);
        assert!(options.warn_cross_thread);

        assert_eq!(Options::from_json("{}").unwrap(), Options::default());
    }

    #[test]
    fn test_invalid_json() {
        let err = Options::from_json(r#"{"registry_capacity": "lots"}"#).unwrap_err();
        assert!(matches!(err, BindError::Json(_)));
    }
}
