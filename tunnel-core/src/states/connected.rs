use vpn_types::KillSwitchSetting;

use crate::event::Event;
use crate::state::StateContext;

/// §4.4 `Connected.run_tasks`.
pub async fn run_tasks(ctx: &StateContext, killswitch: KillSwitchSetting) -> Option<Event> {
    let connection = ctx.connection.as_ref().expect("Connected always carries a connection");

    if matches!(killswitch, KillSwitchSetting::On | KillSwitchSetting::Permanent) {
        // Upgrade from the routed mode `Connecting` entered with to full mode.
        connection.enable_killswitch(None).await;
    }

    connection.add_persistence().await;
    None
}
