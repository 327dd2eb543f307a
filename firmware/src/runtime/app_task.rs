use crate::app::{AppContext, EventReceiver, task};
use crate::net::SharedNetState;

#[embassy_executor::task]
pub async fn run(
    receiver: EventReceiver<'static>,
    shared: &'static SharedNetState,
    ctx: AppContext,
) -> ! {
    task::run(receiver, shared, ctx).await
}
