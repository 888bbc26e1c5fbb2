// ── Command queue ──
//
// Serializes every RPC call onto one worker task: FIFO admission, one
// task in flight, and a minimum gap between the starts of consecutive
// tasks. The RRCS firmware needs the spacing, not just the exclusion.
//
// Discarded tasks (clear or shutdown) never run and their callers get
// `None`, which they treat as silent cancellation.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct QueuedJob {
    generation: u64,
    run: Job,
}

/// Strictly serialized, rate-limited task scheduler.
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<QueuedJob>,
    generation: Arc<AtomicU64>,
    cancel: CancellationToken,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl CommandQueue {
    /// Spawn the worker. Must be called inside a Tokio runtime.
    pub fn new(min_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(dispatch_loop(
            rx,
            min_interval,
            Arc::clone(&generation),
            cancel.clone(),
        ));

        Self {
            tx,
            generation,
            cancel,
            worker: std::sync::Mutex::new(Some(worker)),
        }
    }

    /// Admit `task` and wait for its result.
    ///
    /// Returns `None` if the task was discarded before it ran, or if the
    /// queue was torn down while it was running.
    pub async fn enqueue<F, Fut, T>(&self, task: F) -> Option<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let run: Job = Box::new(move || {
            async move {
                let _ = done_tx.send(task().await);
            }
            .boxed()
        });

        let job = QueuedJob {
            generation: self.generation.load(Ordering::Acquire),
            run,
        };
        if self.tx.send(job).is_err() {
            trace!("queue closed, task discarded");
            return None;
        }
        done_rx.await.ok()
    }

    /// Discard every task that has not started yet. The queue stays usable.
    pub fn clear(&self) {
        let previous = self.generation.fetch_add(1, Ordering::AcqRel);
        debug!(generation = previous + 1, "command queue cleared");
    }

    /// Discard pending tasks, abandon the running one, and stop the worker.
    pub async fn shutdown(&self) {
        self.clear();
        self.cancel.cancel();
        let worker = self
            .worker
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn dispatch_loop(
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    min_interval: Duration,
    generation: Arc<AtomicU64>,
    cancel: CancellationToken,
) {
    let mut last_start: Option<Instant> = None;

    loop {
        let job = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            job = rx.recv() => {
                let Some(job) = job else { break };
                job
            }
        };

        if let Some(prev) = last_start {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep_until(prev + min_interval) => {}
            }
        }

        // Checked after the spacing wait so a clear() during the wait still wins.
        if job.generation != generation.load(Ordering::Acquire) {
            trace!("dropping task admitted before clear");
            continue;
        }

        last_start = Some(Instant::now());
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = (job.run)() => {}
        }
    }

    debug!("command queue worker stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn runs_in_fifo_order_without_overlap_and_spaced() {
        let queue = Arc::new(CommandQueue::new(Duration::from_millis(5)));
        let log: Arc<Mutex<Vec<(usize, Instant, Instant)>>> = Arc::default();

        let mut handles = Vec::new();
        for i in 0..6 {
            let queue = Arc::clone(&queue);
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(move || async move {
                        let start = Instant::now();
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        log.lock().unwrap().push((i, start, Instant::now()));
                        i
                    })
                    .await
            }));
            // Admission order is the spawn order only if each enqueue lands first.
            tokio::task::yield_now().await;
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(i));
        }

        let log = log.lock().unwrap();
        let order: Vec<usize> = log.iter().map(|(i, _, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
        for pair in log.windows(2) {
            let (_, prev_start, prev_end) = pair[0];
            let (_, start, _) = pair[1];
            assert!(start >= prev_end, "tasks overlapped");
            assert!(
                start - prev_start >= Duration::from_millis(5),
                "dispatch spacing violated"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clear_discards_pending_tasks_silently() {
        let queue = Arc::new(CommandQueue::new(Duration::from_millis(5)));
        let ran: Arc<Mutex<Vec<u32>>> = Arc::default();

        let slow = {
            let queue = Arc::clone(&queue);
            let ran = Arc::clone(&ran);
            tokio::spawn(async move {
                queue
                    .enqueue(move || async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        ran.lock().unwrap().push(1);
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let pending = {
            let queue = Arc::clone(&queue);
            let ran = Arc::clone(&ran);
            tokio::spawn(async move {
                queue
                    .enqueue(move || async move {
                        ran.lock().unwrap().push(2);
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        queue.clear();

        assert_eq!(slow.await.unwrap(), Some(()));
        assert_eq!(pending.await.unwrap(), None);
        assert_eq!(*ran.lock().unwrap(), vec![1]);

        // still usable after a clear
        assert_eq!(queue.enqueue(|| async { 7 }).await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_in_flight_and_rejects_new_work() {
        let queue = Arc::new(CommandQueue::new(Duration::from_millis(5)));

        let in_flight = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .enqueue(|| async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        1
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        queue.shutdown().await;
        assert_eq!(in_flight.await.unwrap(), None);
        assert_eq!(queue.enqueue(|| async { 2 }).await, None);
    }
}
