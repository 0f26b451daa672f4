//! The frozen set of protocol versions this runtime understands.
//!
//! MCP protocol versions are date strings negotiated during `initialize`
//! (spec §4.1, §6). The set below is fixed at compile time; widening it is a
//! crate release, never a runtime config knob.

/// All protocol versions this runtime can speak, oldest first.
pub const SUPPORTED_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// The version this runtime proposes when a caller does not pin one.
pub const DEFAULT_VERSION: &str = "2025-03-26";

/// The newest version this runtime understands.
pub const LATEST_VERSION: &str = "2025-06-18";

/// Whether `version` is one this runtime can negotiate.
pub fn is_supported(version: &str) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

/// Resolve the version to use given what the server proposed in its
/// `initialize` response.
///
/// Per the MCP spec, the client echoes the version it requested; if the
/// server instead counters with a different version, the client accepts it
/// only if supported, and otherwise fails the handshake with
/// [`crate::error::McprtError::UnsupportedProtocolVersion`].
pub fn negotiate(requested: &str, server_proposed: &str) -> Result<String, crate::error::McprtError> {
    if server_proposed == requested {
        return Ok(server_proposed.to_string());
    }
    if is_supported(server_proposed) {
        return Ok(server_proposed.to_string());
    }
    Err(crate::error::McprtError::UnsupportedProtocolVersion(server_proposed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_and_latest_are_in_the_supported_set() {
        assert!(is_supported(DEFAULT_VERSION));
        assert!(is_supported(LATEST_VERSION));
    }

    #[test]
    fn negotiate_accepts_matching_echo() {
        assert_eq!(negotiate(DEFAULT_VERSION, DEFAULT_VERSION).unwrap(), DEFAULT_VERSION);
    }

    #[test]
    fn negotiate_accepts_a_supported_counter_offer() {
        assert_eq!(negotiate(DEFAULT_VERSION, "2024-11-05").unwrap(), "2024-11-05");
    }

    #[test]
    fn negotiate_rejects_an_unknown_counter_offer() {
        assert!(negotiate(DEFAULT_VERSION, "1999-01-01").is_err());
    }
}
