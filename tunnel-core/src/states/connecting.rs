use vpn_types::KillSwitchSetting;

use crate::event::Event;
use crate::state::StateContext;

/// §4.4 `Connecting.run_tasks`.
pub async fn run_tasks(ctx: &StateContext, killswitch: KillSwitchSetting) -> Option<Event> {
    let connection = ctx.connection.as_ref().expect("Connecting always carries a connection");

    connection.enable_ipv6_leak_protection().await;

    if matches!(killswitch, KillSwitchSetting::On | KillSwitchSetting::Permanent) {
        connection.enable_killswitch(Some(connection.server())).await;
    }

    connection.start().await;
    None
}
