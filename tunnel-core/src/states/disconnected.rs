use vpn_types::KillSwitchSetting;

use crate::event::Event;
use crate::state::StateContext;

/// §4.4 `Disconnected.run_tasks`.
pub async fn run_tasks(ctx: &StateContext, killswitch: KillSwitchSetting) -> Option<Event> {
    let connection = ctx.connection.as_ref()?;

    if let Some(reconnection) = ctx.reconnection.clone() {
        log::debug!("disconnected with a reconnection queued, skipping teardown of leak protection and kill switch");
        return Some(Event::up(Some(reconnection)));
    }

    let disable_leak_protection = connection.disable_ipv6_leak_protection();
    let disable_killswitch = async {
        if killswitch == KillSwitchSetting::Permanent {
            log::debug!("kill switch is permanent, leaving it enabled across disconnect");
        } else {
            connection.disable_killswitch().await;
        }
    };
    let remove_persistence = connection.remove_persistence();

    futures::join!(disable_leak_protection, disable_killswitch, remove_persistence);
    None
}
