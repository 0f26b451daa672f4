//! A name-keyed registry for transports beyond the three built-ins (spec §2,
//! "Custom transport registry").
//!
//! Grounded on [`mcprt_transport::Transport`]'s own contract: a factory only
//! needs to produce a boxed trait object, so the registry stores closures
//! rather than anything transport-specific.

use std::collections::HashMap;
use std::sync::Arc;

use mcprt_core::McprtError;
use mcprt_transport::Transport;
use serde_json::Value;

/// Builds one transport instance from a caller-supplied configuration blob.
pub type TransportFactory = Arc<dyn Fn(Value) -> Result<Box<dyn Transport>, McprtError> + Send + Sync>;

/// Maps a carrier name to the factory that builds it.
#[derive(Clone, Default)]
pub struct Registry {
    factories: HashMap<String, TransportFactory>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("names", &self.factories.keys().collect::<Vec<_>>()).finish()
    }
}

impl Registry {
    /// A registry with no custom transports.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, factory: TransportFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Build a transport from the factory registered under `name`.
    pub fn create(&self, name: &str, config: Value) -> Result<Box<dyn Transport>, McprtError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| McprtError::InvalidRequest(format!("no transport registered under {name:?}")))?;
        factory(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcprt_transport::{TransportKind, TransportResult};

    #[derive(Debug)]
    struct Null;

    #[async_trait]
    impl Transport for Null {
        fn kind(&self) -> TransportKind {
            TransportKind::Custom
        }
        async fn connect(&self) -> TransportResult<()> {
            Ok(())
        }
        async fn send(&self, _message: Value) -> TransportResult<()> {
            Ok(())
        }
        async fn recv(&self) -> TransportResult<Option<Value>> {
            Ok(None)
        }
        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }
        fn is_alive(&self) -> bool {
            true
        }
    }

    #[test]
    fn unregistered_name_is_an_error() {
        let registry = Registry::new();
        assert!(registry.create("nope", Value::Null).is_err());
    }

    #[test]
    fn registered_factory_builds_a_transport() {
        let mut registry = Registry::new();
        registry.register("null", Arc::new(|_cfg| Ok(Box::new(Null) as Box<dyn Transport>)));
        let transport = registry.create("null", Value::Null).unwrap();
        assert_eq!(transport.kind(), TransportKind::Custom);
    }
}
