// ── Coalescing trigger ──
//
// `trigger()` is cheap and callable from anywhere. The task returned by
// `spawn` waits for the first trigger, sleeps out the window, then runs
// the rebuild once for however many triggers arrived meanwhile.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Debug, Default)]
pub struct Debouncer {
    dirty: AtomicBool,
    notify: Notify,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.dirty.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    /// Run `rebuild` at most once per `window` while triggers keep coming.
    pub fn spawn<F, Fut>(
        self: &Arc<Self>,
        window: Duration,
        cancel: CancellationToken,
        mut rebuild: F,
    ) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = this.notify.notified() => {}
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(window) => {}
                }
                if this.dirty.swap(false, Ordering::AcqRel) {
                    trace!("debounced rebuild");
                    rebuild().await;
                }
            }
        })
    }
}
