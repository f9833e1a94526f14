use std::sync::Arc;

use crate::connection::Connection;
use crate::error::ConnectorError;
use crate::event::{same_connection, Event};

/// Data carried by every state. `reconnection` is populated only transiently,
/// while a replacement connection is queued behind a teardown in progress.
#[derive(Clone)]
pub struct StateContext {
    pub connection: Option<Arc<dyn Connection>>,
    pub event: Option<Event>,
    pub reconnection: Option<Arc<dyn Connection>>,
}

impl StateContext {
    pub fn new(connection: Option<Arc<dyn Connection>>) -> Self {
        StateContext { connection, event: None, reconnection: None }
    }

    fn with_event(connection: Option<Arc<dyn Connection>>, event: Event) -> Self {
        StateContext { connection, event: Some(event), reconnection: None }
    }
}

/// The five lifecycle states (§3.1, §4.2).
#[derive(Clone)]
pub enum State {
    Disconnected(StateContext),
    Connecting(StateContext),
    Connected(StateContext),
    Disconnecting(StateContext),
    Error(StateContext),
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.name())
            .field("connection", &self.connection().map(|c| c.connection_id().to_string()))
            .field(
                "reconnection",
                &self.context().reconnection.as_ref().map(|c| c.connection_id().to_string()),
            )
            .finish()
    }
}

/// The outcome of feeding an event through [`State::on_event`]. `Changed`
/// means the dispatcher must commit the new state, notify subscribers, and
/// run its entry tasks. `Unchanged` means none of that happens, but a genuine
/// repeat of an already-settled state still gets a WARN log, while
/// `Disconnecting` absorbing a second `Up` to update its queued reconnection
/// is expected traffic and stays quiet.
pub enum Transition {
    Changed(State),
    Unchanged(State),
}

impl State {
    pub fn context(&self) -> &StateContext {
        match self {
            State::Disconnected(ctx)
            | State::Connecting(ctx)
            | State::Connected(ctx)
            | State::Disconnecting(ctx)
            | State::Error(ctx) => ctx,
        }
    }

    pub fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.context().connection.as_ref()
    }

    pub fn name(&self) -> &'static str {
        match self {
            State::Disconnected(_) => "Disconnected",
            State::Connecting(_) => "Connecting",
            State::Connected(_) => "Connected",
            State::Disconnecting(_) => "Disconnecting",
            State::Error(_) => "Error",
        }
    }

    /// True iff this state is neither `Disconnected` nor `Error`, i.e. some
    /// connection is in flight or established (§4.8 `is_connection_ongoing`).
    pub fn is_ongoing(&self) -> bool {
        !matches!(self, State::Disconnected(_) | State::Error(_))
    }

    fn unchanged_noop(self) -> Transition {
        log::warn!(
            "{} received unexpected event, ignoring and retaining current state",
            self.name()
        );
        Transition::Unchanged(self)
    }

    /// Pure transition function (§4.3). Consumes `self` and the incoming
    /// event, producing a [`Transition`]. The only error path is the
    /// concurrent-connection guard (§3.2 invariant 2): any non-`Up` event
    /// must reference the same connection as the state it's being applied
    /// to, or dispatch must abort as a fatal programming error.
    pub fn on_event(self, event: Event) -> Result<Transition, ConnectorError> {
        if !matches!(event, Event::Up(_)) {
            let event_conn = &event.context().connection;
            if !same_connection(event_conn, &self.context().connection) {
                return Err(ConnectorError::ConcurrentConnections);
            }
        }

        let transition = match (&self, &event) {
            (State::Disconnected(_), Event::Up(ctx)) => {
                Transition::Changed(State::Connecting(StateContext::with_event(
                    ctx.connection.clone(),
                    event.clone(),
                )))
            }
            (State::Disconnected(_), _) => self.unchanged_noop(),

            (State::Connecting(ctx), Event::Up(ev_ctx)) => {
                let mut next = StateContext::with_event(ctx.connection.clone(), event.clone());
                next.reconnection = ev_ctx.connection.clone();
                Transition::Changed(State::Disconnecting(next))
            }
            (State::Connecting(ctx), Event::Down(_)) => Transition::Changed(State::Disconnecting(
                StateContext::with_event(ctx.connection.clone(), event.clone()),
            )),
            (State::Connecting(_), Event::Connected(ev_ctx)) => Transition::Changed(State::Connected(
                StateContext::with_event(ev_ctx.connection.clone(), event.clone()),
            )),
            (State::Connecting(_), Event::Disconnected(ev_ctx)) => {
                Transition::Changed(State::Disconnected(StateContext::with_event(
                    ev_ctx.connection.clone(),
                    event.clone(),
                )))
            }
            (State::Connecting(_), _) if event.is_error() => {
                let ev_ctx = event.context().clone();
                Transition::Changed(State::Error(StateContext::with_event(
                    ev_ctx.connection.clone(),
                    event.clone(),
                )))
            }

            (State::Connected(ctx), Event::Up(ev_ctx)) => {
                let mut next = StateContext::with_event(ctx.connection.clone(), event.clone());
                next.reconnection = ev_ctx.connection.clone();
                Transition::Changed(State::Disconnecting(next))
            }
            (State::Connected(ctx), Event::Down(_)) => Transition::Changed(State::Disconnecting(
                StateContext::with_event(ctx.connection.clone(), event.clone()),
            )),
            (State::Connected(_), Event::Connected(_)) => self.unchanged_noop(),
            (State::Connected(_), Event::Disconnected(ev_ctx)) => {
                Transition::Changed(State::Disconnected(StateContext::with_event(
                    ev_ctx.connection.clone(),
                    event.clone(),
                )))
            }
            (State::Connected(_), _) if event.is_error() => {
                let ev_ctx = event.context().clone();
                Transition::Changed(State::Error(StateContext::with_event(
                    ev_ctx.connection.clone(),
                    event.clone(),
                )))
            }

            (State::Disconnecting(ctx), Event::Up(ev_ctx)) => {
                let mut next = ctx.clone();
                next.reconnection = ev_ctx.connection.clone();
                Transition::Unchanged(State::Disconnecting(next))
            }
            (State::Disconnecting(_), Event::Down(_)) => self.unchanged_noop(),
            (State::Disconnecting(_), Event::Connected(_)) => self.unchanged_noop(),
            (State::Disconnecting(ctx), Event::Disconnected(ev_ctx)) => {
                let mut next = StateContext::with_event(ev_ctx.connection.clone(), event.clone());
                next.reconnection = ctx.reconnection.clone();
                Transition::Changed(State::Disconnected(next))
            }
            (State::Disconnecting(ctx), _) if event.is_error() => {
                let ev_ctx = event.context().clone();
                let mut next = StateContext::with_event(ev_ctx.connection.clone(), event.clone());
                next.reconnection = ctx.reconnection.clone();
                Transition::Changed(State::Disconnected(next))
            }

            (State::Error(_), Event::Up(ev_ctx)) => {
                Transition::Changed(State::Connecting(StateContext::with_event(
                    ev_ctx.connection.clone(),
                    event.clone(),
                )))
            }
            (State::Error(_), Event::Down(ev_ctx)) => {
                Transition::Changed(State::Disconnected(StateContext::with_event(
                    ev_ctx.connection.clone(),
                    event.clone(),
                )))
            }
            (State::Error(_), Event::Connected(_)) => self.unchanged_noop(),
            (State::Error(_), Event::Disconnected(_)) => self.unchanged_noop(),
            (State::Error(_), _) if event.is_error() => {
                let ev_ctx = event.context().clone();
                Transition::Changed(State::Error(StateContext::with_event(
                    ev_ctx.connection.clone(),
                    event.clone(),
                )))
            }

            // Unreachable: every (state, event-kind) pair is covered above;
            // the `is_error()` guards subsume the five error variants.
            _ => unreachable!("on_event: uncovered (state, event) pair"),
        };

        Ok(transition)
    }
}
