//! Declared, validated handler construction options (spec §4.7).
//!
//! A handler declares the option names it needs up front; each is either
//! required (construction fails if absent) or carries a default. This
//! mirrors the `ConnectionConfig`-with-`Default` pattern the teacher uses for
//! connection settings, generalized to an open set of named values so a
//! handler can declare whatever options it needs without a bespoke struct.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// An option name declared but not supplied, with no default to fall back to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing required option: {0}")]
pub struct MissingRequired(pub String);

/// A validated bag of named construction options.
#[derive(Debug, Clone, Default)]
pub struct Options {
    values: HashMap<String, Value>,
}

impl Options {
    /// Build options from caller-supplied values, checking every name in
    /// `required` is present and filling in any declared `defaults` that
    /// were not supplied.
    pub fn build(
        supplied: HashMap<String, Value>,
        required: &[&str],
        defaults: HashMap<String, Value>,
    ) -> Result<Self, MissingRequired> {
        let mut values = defaults;
        values.extend(supplied);
        for name in required {
            if !values.contains_key(*name) {
                return Err(MissingRequired((*name).to_string()));
            }
        }
        Ok(Self { values })
    }

    /// Fetch a declared option by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Fetch and deserialize a declared option by name.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.values.get(name).cloned().and_then(|v| serde_json::from_value(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_option_fails_construction() {
        let err = Options::build(HashMap::new(), &["timeout"], HashMap::new()).unwrap_err();
        assert_eq!(err, MissingRequired("timeout".to_string()));
    }

    #[test]
    fn defaults_fill_in_unsupplied_values() {
        let mut defaults = HashMap::new();
        defaults.insert("retries".to_string(), serde_json::json!(3));
        let options = Options::build(HashMap::new(), &[], defaults).unwrap();
        assert_eq!(options.get_as::<u32>("retries"), Some(3));
    }

    #[test]
    fn supplied_values_override_defaults() {
        let mut defaults = HashMap::new();
        defaults.insert("retries".to_string(), serde_json::json!(3));
        let mut supplied = HashMap::new();
        supplied.insert("retries".to_string(), serde_json::json!(7));
        let options = Options::build(supplied, &[], defaults).unwrap();
        assert_eq!(options.get_as::<u32>("retries"), Some(7));
    }
}
