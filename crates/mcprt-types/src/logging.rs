//! `logging/setLevel` and `notifications/message` severity levels.

use serde::{Deserialize, Serialize};

/// RFC 5424 syslog severity levels, as used by `logging/setLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// System unusable.
    Emergency,
    /// Action must be taken immediately.
    Alert,
    /// Critical condition.
    Critical,
    /// Error condition.
    Error,
    /// Warning condition.
    Warning,
    /// Normal but significant.
    Notice,
    /// Informational.
    Info,
    /// Debug-level messages.
    Debug,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&LogLevel::Warning).unwrap(), "\"warning\"");
    }

    #[test]
    fn ordering_runs_from_most_to_least_severe() {
        assert!(LogLevel::Emergency < LogLevel::Debug);
    }
}
