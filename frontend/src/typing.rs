use std::time::Duration;

use crate::models::{EntryId, MessageBody};
use crate::view::ChatView;

/// Suspends the current task. Abstracted so the typing effect can run
/// without a browser timer.
#[allow(async_fn_in_trait)]
pub trait Delay {
    async fn sleep(&self, duration: Duration);
}

/// `setTimeout`-backed delay.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimerDelay;

impl Delay for TimerDelay {
    async fn sleep(&self, duration: Duration) {
        gloo_timers::future::sleep(duration).await;
    }
}

/// Clears the entry, then reveals `text` one character at a time, pausing
/// after each. Purely presentational: `text` has already been received.
pub async fn type_out<V, D>(view: &V, delay: &D, pause: Duration, id: EntryId, text: &str)
where
    V: ChatView,
    D: Delay,
{
    view.set_body(id, MessageBody::empty());
    for ch in text.chars() {
        view.push_char(id, ch);
        view.scroll_to_bottom();
        delay.sleep(pause).await;
    }
}
