use std::sync::Arc;

use crate::connection::Connection;

/// Context carried by every event: a reference to the connection the event
/// originates from (absent only for a user-initiated `Down` when no
/// connection has ever been established), and an optional human-readable
/// detail for the error-subclass variants.
#[derive(Clone)]
pub struct EventContext {
    pub connection: Option<Arc<dyn Connection>>,
    pub error: Option<String>,
}

impl EventContext {
    pub fn new(connection: Option<Arc<dyn Connection>>) -> Self {
        EventContext { connection, error: None }
    }

    pub fn with_error(connection: Option<Arc<dyn Connection>>, error: impl Into<String>) -> Self {
        EventContext { connection, error: Some(error.into()) }
    }
}

impl std::fmt::Debug for EventContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventContext")
            .field("connection", &self.connection.as_ref().map(|c| c.connection_id().to_string()))
            .field("error", &self.error)
            .finish()
    }
}

/// Tagged variants of backend-emitted (and user-initiated) events.
///
/// `DeviceDisconnected | Timeout | AuthDenied | TunnelSetupFailed |
/// UnexpectedError` form the *error* subclass: the transition table treats
/// all five identically, but [`Event::is_error`] lets callers ask the
/// question without a five-way match, and the specific variant is preserved
/// for observability.
#[derive(Clone, Debug)]
pub enum Event {
    Up(EventContext),
    Down(EventContext),
    Connected(EventContext),
    Disconnected(EventContext),
    DeviceDisconnected(EventContext),
    Timeout(EventContext),
    AuthDenied(EventContext),
    TunnelSetupFailed(EventContext),
    UnexpectedError(EventContext),
}

impl Event {
    pub fn up(connection: Option<Arc<dyn Connection>>) -> Self {
        Event::Up(EventContext::new(connection))
    }

    pub fn down(connection: Option<Arc<dyn Connection>>) -> Self {
        Event::Down(EventContext::new(connection))
    }

    pub fn connected(connection: Option<Arc<dyn Connection>>) -> Self {
        Event::Connected(EventContext::new(connection))
    }

    pub fn disconnected(connection: Option<Arc<dyn Connection>>) -> Self {
        Event::Disconnected(EventContext::new(connection))
    }

    pub fn device_disconnected(connection: Option<Arc<dyn Connection>>, detail: impl Into<String>) -> Self {
        Event::DeviceDisconnected(EventContext::with_error(connection, detail))
    }

    pub fn timeout(connection: Option<Arc<dyn Connection>>, detail: impl Into<String>) -> Self {
        Event::Timeout(EventContext::with_error(connection, detail))
    }

    pub fn auth_denied(connection: Option<Arc<dyn Connection>>, detail: impl Into<String>) -> Self {
        Event::AuthDenied(EventContext::with_error(connection, detail))
    }

    pub fn tunnel_setup_failed(connection: Option<Arc<dyn Connection>>, detail: impl Into<String>) -> Self {
        Event::TunnelSetupFailed(EventContext::with_error(connection, detail))
    }

    pub fn unexpected_error(connection: Option<Arc<dyn Connection>>, detail: impl Into<String>) -> Self {
        Event::UnexpectedError(EventContext::with_error(connection, detail))
    }

    pub fn context(&self) -> &EventContext {
        match self {
            Event::Up(ctx)
            | Event::Down(ctx)
            | Event::Connected(ctx)
            | Event::Disconnected(ctx)
            | Event::DeviceDisconnected(ctx)
            | Event::Timeout(ctx)
            | Event::AuthDenied(ctx)
            | Event::TunnelSetupFailed(ctx)
            | Event::UnexpectedError(ctx) => ctx,
        }
    }

    pub fn into_context(self) -> EventContext {
        match self {
            Event::Up(ctx)
            | Event::Down(ctx)
            | Event::Connected(ctx)
            | Event::Disconnected(ctx)
            | Event::DeviceDisconnected(ctx)
            | Event::Timeout(ctx)
            | Event::AuthDenied(ctx)
            | Event::TunnelSetupFailed(ctx)
            | Event::UnexpectedError(ctx) => ctx,
        }
    }

    /// True for the five variants that form the error subclass (§3.1).
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Event::DeviceDisconnected(_)
                | Event::Timeout(_)
                | Event::AuthDenied(_)
                | Event::TunnelSetupFailed(_)
                | Event::UnexpectedError(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Up(_) => "Up",
            Event::Down(_) => "Down",
            Event::Connected(_) => "Connected",
            Event::Disconnected(_) => "Disconnected",
            Event::DeviceDisconnected(_) => "DeviceDisconnected",
            Event::Timeout(_) => "Timeout",
            Event::AuthDenied(_) => "AuthDenied",
            Event::TunnelSetupFailed(_) => "TunnelSetupFailed",
            Event::UnexpectedError(_) => "UnexpectedError",
        }
    }
}

/// Pointer-identity comparison for the two sides of the concurrent-connection
/// invariant (§3.2 invariant 2): two `None`s are "the same", two `Some`s are
/// the same iff they point at the same connection, and a `None`/`Some` pair
/// never matches.
pub(crate) fn same_connection(a: &Option<Arc<dyn Connection>>, b: &Option<Arc<dyn Connection>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}
