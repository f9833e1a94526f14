mod connected;
mod connecting;
mod disconnected;
mod disconnecting;
mod error;

use vpn_types::KillSwitchSetting;

use crate::event::Event;
use crate::state::State;

/// Runs the side-effect routine attached to whichever state `state` holds
/// (§4.4), after it has been committed and subscribers notified. Returns a
/// follow-up event to re-inject into the dispatcher, or `None` at
/// quiescence.
///
/// `killswitch` is the setting in effect for the current connection, not
/// part of `StateContext` because it is Connector-level configuration, not
/// per-transition data, and every state but `Connecting`/`Connected`/
/// `Disconnected` ignores it entirely.
pub async fn run_tasks(state: &State, killswitch: KillSwitchSetting) -> Option<Event> {
    match state {
        State::Disconnected(ctx) => disconnected::run_tasks(ctx, killswitch).await,
        State::Connecting(ctx) => connecting::run_tasks(ctx, killswitch).await,
        State::Connected(ctx) => connected::run_tasks(ctx, killswitch).await,
        State::Disconnecting(ctx) => disconnecting::run_tasks(ctx).await,
        State::Error(ctx) => error::run_tasks(ctx).await,
    }
}
