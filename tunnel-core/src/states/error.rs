use crate::event::Event;
use crate::state::StateContext;

/// §4.4 `Error.run_tasks`. Deliberately does not disable leak protection or
/// the kill switch: the host stays protected until the user acknowledges
/// the failure with an explicit `Down`.
pub async fn run_tasks(ctx: &StateContext) -> Option<Event> {
    let connection = ctx.connection.as_ref().expect("Error always carries a connection");
    connection.stop().await;
    None
}
