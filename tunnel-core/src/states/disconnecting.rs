use crate::event::Event;
use crate::state::StateContext;

/// §4.4 `Disconnecting.run_tasks`.
pub async fn run_tasks(ctx: &StateContext) -> Option<Event> {
    let connection = ctx.connection.as_ref().expect("Disconnecting always carries a connection");
    connection.stop().await;
    None
}
