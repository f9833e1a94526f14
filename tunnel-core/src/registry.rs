use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use vpn_types::{Credentials, ServerDescriptor, Settings};

use crate::connection::{Connection, ConnectionFactory};
use crate::error::ConnectorError;

/// Keyed registry of backend factories (§4.9). Deliberately thin: it exists
/// so `Connector::connect` has a way to go from an optional tag to a live
/// `Connection`, and so crash recovery can look a tag up again without the
/// core knowing anything about what the tag actually builds.
pub struct BackendRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ConnectionFactory>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        BackendRegistry { factories: RwLock::new(HashMap::new()) }
    }

    /// Re-registering a tag replaces the previous factory, expected in
    /// tests, where a fake backend is swapped in per scenario.
    pub fn register_backend(&self, tag: impl Into<String>, factory: Arc<dyn ConnectionFactory>) {
        self.factories.write().insert(tag.into(), factory);
    }

    /// Resolves a backend tag: the explicit tag if the caller named one (it
    /// must exist and validate), otherwise the highest-priority backend that
    /// validates successfully.
    pub fn select_backend(&self, explicit_tag: Option<&str>) -> Result<String, ConnectorError> {
        let factories = self.factories.read();

        if let Some(tag) = explicit_tag {
            return match factories.get(tag) {
                Some(factory) if factory.validate() => Ok(tag.to_string()),
                _ => Err(ConnectorError::UnknownBackend(tag.to_string())),
            };
        }

        factories
            .iter()
            .filter(|(_, factory)| factory.validate())
            .max_by_key(|(_, factory)| factory.priority())
            .map(|(tag, _)| tag.clone())
            .ok_or(ConnectorError::NoValidatedBackend)
    }

    pub async fn create(
        &self,
        tag: &str,
        server: ServerDescriptor,
        credentials: Credentials,
        settings: Settings,
        protocol: &str,
    ) -> Result<Arc<dyn Connection>, ConnectorError> {
        let factory = self.factory(tag)?;
        Ok(factory.create(server, credentials, settings, protocol).await)
    }

    /// Looks `tag` up and asks it to reattach to a connection described only
    /// by persisted parameters (§4.8, E5). Returns `None` rather than an
    /// error when the tag is no longer registered, since that's the ordinary
    /// "backend capability absence" case (§7), not a programming error.
    pub async fn reconstruct(
        &self,
        tag: &str,
        params: &vpn_types::PersistedParameters,
    ) -> Option<Arc<dyn Connection>> {
        let factory = self.factory(tag).ok()?;
        Some(factory.reconstruct(params).await)
    }

    fn factory(&self, tag: &str) -> Result<Arc<dyn ConnectionFactory>, ConnectorError> {
        self.factories
            .read()
            .get(tag)
            .cloned()
            .ok_or_else(|| ConnectorError::UnknownBackend(tag.to_string()))
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        BackendRegistry::new()
    }
}

/// The registry backends actually register themselves with. Kept separate
/// from `Connector` (rather than a field on it) so a backend crate can call
/// [`global`] and register at its own startup time, independent of whether
/// the Connector singleton has been bootstrapped yet. Bootstrap-time crash
/// recovery (§4.8, E5) needs backends already registered by the time it
/// runs.
static GLOBAL: once_cell::sync::Lazy<BackendRegistry> = once_cell::sync::Lazy::new(BackendRegistry::new);

pub fn global() -> &'static BackendRegistry {
    &GLOBAL
}
