// Bounded retry combinator
//
// Every "wait until the screen shows X" in the codebase goes through
// `wait_until`: a probe polled at a fixed interval under a hard deadline,
// with an optional cancellation flag checked before each attempt. No wait in
// the system blocks indefinitely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct WaitOpts {
    pub interval: Duration,
    pub timeout: Duration,
}

/// Poll `probe` until it yields a value, the timeout elapses, or `cancel` is
/// raised. Returns `None` on timeout or cancellation.
pub async fn wait_until<F, Fut, T>(
    opts: WaitOpts,
    cancel: Option<&AtomicBool>,
    mut probe: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + opts.timeout;
    loop {
        if let Some(flag) = cancel
            && flag.load(Ordering::SeqCst)
        {
            return None;
        }
        if let Some(value) = probe().await {
            return Some(value);
        }
        if Instant::now() + opts.interval > deadline {
            return None;
        }
        tokio::time::sleep(opts.interval).await;
    }
}
