use std::sync::{Arc, Weak};

use async_trait::async_trait;
use vpn_types::{Credentials, ServerDescriptor, Settings};

use crate::error::ConnectorError;
use crate::event::Event;
use crate::state::State;

/// Sink a backend calls back into when it has something to report. Wraps a
/// weak reference to the `Connector` rather than a strong one or a channel:
/// the `Connection` trait object is reachable from the Connector's state, and
/// the Connector is reachable from the connection via this callback, so a
/// strong reference here would make the pair uncollectable. Weak breaks the
/// cycle; `upgrade()` fails only once the Connector itself has been dropped,
/// which in practice only happens at process shutdown.
#[derive(Clone)]
pub struct EventSink {
    connector: Weak<dyn Dispatch>,
}

impl EventSink {
    pub fn new(connector: Weak<dyn Dispatch>) -> Self {
        EventSink { connector }
    }

    /// Hands the event to the Connector's dispatcher. Silently dropped if the
    /// Connector no longer exists; a dispatch error has no caller to surface
    /// to from this path, so it is logged instead.
    pub async fn emit(&self, event: Event) {
        if let Some(connector) = self.connector.upgrade() {
            if let Err(err) = connector.dispatch(event).await {
                log::error!("dispatch of backend-originated event failed: {}", err);
            }
        } else {
            log::warn!("event sink fired after connector was dropped, dropping event");
        }
    }
}

/// The narrow surface `EventSink` needs from `Connector`, kept as a trait so
/// this module doesn't depend on `connector.rs` directly (which in turn
/// depends on this module for the `Connection` trait).
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, event: Event) -> Result<(), ConnectorError>;
}

/// The capability every backend must provide (§4.7). Implemented once per
/// transport (OpenVPN, WireGuard, ...) and handed to the core as an opaque
/// `Arc<dyn Connection>`, the core never downcasts it.
#[async_trait]
pub trait Connection: Send + Sync {
    fn connection_id(&self) -> &vpn_types::ConnectionId;

    fn server_id(&self) -> &str;

    /// Full server record, needed by `Connecting.run_tasks` to enable the
    /// kill switch in routed mode (§4.4) and by persistence (§4.6) to record
    /// `server_name`.
    fn server(&self) -> &ServerDescriptor;

    fn backend_tag(&self) -> &str;

    fn protocol_tag(&self) -> &str;

    /// Begins tunnel bringup asynchronously; returns promptly. Must
    /// eventually emit `Connected`, an error-subclass event, or `Disconnected`
    /// through the registered sink.
    async fn start(&self);

    /// Begins tunnel teardown asynchronously; returns promptly. Must
    /// eventually emit `Disconnected` through the registered sink.
    async fn stop(&self);

    async fn register(&self, sink: EventSink);

    async fn unregister(&self);

    async fn enable_ipv6_leak_protection(&self);

    async fn disable_ipv6_leak_protection(&self);

    /// `server` selects routed mode (permit this endpoint); `None` selects
    /// full mode (permit nothing but the tunnel).
    async fn enable_killswitch(&self, server: Option<&ServerDescriptor>);

    async fn disable_killswitch(&self);

    async fn add_persistence(&self);

    async fn remove_persistence(&self);

    /// Reconstructs the state the engine should resume in, given parameters
    /// persisted by a previous process. Typically `Connected` if the backend
    /// still observes a live tunnel, otherwise `Disconnected`.
    async fn initial_state(&self, params: &vpn_types::PersistedParameters) -> State;
}

/// Produces a `Connection` for a given protocol tag, plus the two
/// class-level hooks the backend registry needs to rank and validate
/// candidates (§4.7).
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Higher wins among backends that validate successfully.
    fn priority(&self) -> i32;

    /// False if this backend's runtime dependencies are unavailable on this host.
    fn validate(&self) -> bool;

    async fn create(
        &self,
        server: ServerDescriptor,
        credentials: Credentials,
        settings: Settings,
        protocol: &str,
    ) -> Arc<dyn Connection>;

    /// Reattaches to whatever the backend itself can observe about a
    /// connection that outlived the process that started it, using only the
    /// thin identifiers persistence kept; no fresh credentials or server
    /// record are available this long after the fact (§4.8, E5).
    async fn reconstruct(&self, params: &vpn_types::PersistedParameters) -> Arc<dyn Connection>;
}
