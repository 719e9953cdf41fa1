//! Throttled single-consumer execution queue.
//!
//! Producers [`accept`](ChannelExecutor::accept) items without blocking; one
//! worker task hands them to the execution function in FIFO order and sleeps
//! a fixed delay after each. While auto-sync is disabled only one item is
//! executed: the first one ever received with the flag off.
//! [`user_accept`](ChannelExecutor::user_accept) bypasses the queue but
//! shares the execution lock with the worker.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type ExecutionFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Observable state of a [`ChannelExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    /// No execution function launched yet.
    Uninitialized,
    /// Waiting for items.
    Idle,
    /// Executing an item or waiting out the delay.
    Draining,
    /// Paused by [`ChannelExecutor::pause`].
    Paused,
    /// Shut down.
    Cancelled,
}

struct Shared<T> {
    function: RwLock<Option<ExecutionFn<T>>>,
    execution_lock: tokio::sync::Mutex<()>,
    launched: Notify,
    paused: watch::Sender<bool>,
    auto_sync: Arc<AtomicBool>,
    first_receive: AtomicBool,
    busy: AtomicBool,
    delay: Duration,
}

impl<T> Shared<T> {
    fn function(&self) -> Option<ExecutionFn<T>> {
        self.function
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn execute(&self, item: T) -> bool {
        let _guard = self.execution_lock.lock().await;
        match self.function() {
            Some(function) => {
                function(item).await;
                true
            }
            None => false,
        }
    }
}

/// Rate-limited, pausable queue in front of one execution function.
pub struct ChannelExecutor<T> {
    sender: mpsc::UnboundedSender<T>,
    shared: Arc<Shared<T>>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T> ChannelExecutor<T> {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> ExecutorState {
        if self.cancel.is_cancelled() {
            ExecutorState::Cancelled
        } else if self.shared.function().is_none() {
            ExecutorState::Uninitialized
        } else if self.shared.busy.load(Ordering::SeqCst) {
            ExecutorState::Draining
        } else if *self.shared.paused.borrow() {
            ExecutorState::Paused
        } else {
            ExecutorState::Idle
        }
    }
}

impl<T> std::fmt::Debug for ChannelExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelExecutor")
            .field("state", &self.state())
            .field("delay", &self.shared.delay)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> ChannelExecutor<T> {
    /// Create the executor and spawn its worker. Must be called within a tokio runtime.
    ///
    /// `auto_sync` is read for every received item, so it can be shared with
    /// the settings service and toggled at any time.
    #[must_use]
    pub fn new(delay: Duration, auto_sync: Arc<AtomicBool>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (paused, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            function: RwLock::new(None),
            execution_lock: tokio::sync::Mutex::new(()),
            launched: Notify::new(),
            paused,
            auto_sync,
            first_receive: AtomicBool::new(true),
            busy: AtomicBool::new(false),
            delay,
        });
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_loop(Arc::clone(&shared), receiver, cancel.clone()));

        Self {
            sender,
            shared,
            cancel,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Register the function run for every item. Later calls replace it.
    pub fn launch<F, Fut>(&self, function: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let function: ExecutionFn<T> =
            Arc::new(move |item| -> BoxFuture<'static, ()> { Box::pin(function(item)) });
        let first = self
            .shared
            .function
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(function)
            .is_none();
        if first {
            self.shared.launched.notify_one();
        }
    }

    /// Queue an item. Never blocks; items queued after shutdown are dropped.
    pub fn accept(&self, item: T) {
        if self.sender.send(item).is_err() {
            tracing::debug!("Channel executor stopped, item dropped");
        }
    }

    /// Execute `item` now, ignoring the auto-sync flag, the queue and pause.
    ///
    /// Waits for an in-flight queued execution to finish first. Returns
    /// `false` if no execution function was launched.
    pub async fn user_accept(&self, item: T) -> bool {
        self.shared.execute(item).await
    }

    /// Stop taking items from the queue until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.shared.paused.send_replace(true);
    }

    /// Continue after [`pause`](Self::pause). No-op when not paused.
    pub fn resume(&self) {
        self.shared.paused.send_if_modified(|paused| {
            let was_paused = *paused;
            *paused = false;
            was_paused
        });
    }

    /// Cancel the worker and wait until it has stopped.
    ///
    /// Nothing is executed from the queue once this returns. Safe to call
    /// more than once.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            tracing::warn!(error = %e, "Channel executor worker ended abnormally");
        }
    }
}

impl<T> Drop for ChannelExecutor<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_loop<T: Send + 'static>(
    shared: Arc<Shared<T>>,
    mut receiver: mpsc::UnboundedReceiver<T>,
    cancel: CancellationToken,
) {
    let mut paused = shared.paused.subscribe();
    loop {
        if shared.function().is_none() {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = shared.launched.notified() => continue,
            }
        }

        if *paused.borrow_and_update() {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    drain_one(&shared, &mut receiver).await;
                    break;
                }
                changed = paused.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                drain_one(&shared, &mut receiver).await;
                break;
            }
            changed = paused.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            item = receiver.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        if !admit(&shared) {
            tracing::debug!("Auto-sync disabled, queued item dropped");
            continue;
        }

        shared.busy.store(true, Ordering::SeqCst);
        shared.execute(item).await;
        tokio::select! {
            biased;
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(shared.delay) => {}
        }
        shared.busy.store(false, Ordering::SeqCst);
    }
    tracing::debug!("Channel executor stopped");
}

/// With auto-sync off, only the first item received while disabled runs.
fn admit<T>(shared: &Shared<T>) -> bool {
    shared.auto_sync.load(Ordering::SeqCst) || shared.first_receive.swap(false, Ordering::SeqCst)
}

async fn drain_one<T>(shared: &Shared<T>, receiver: &mut mpsc::UnboundedReceiver<T>) {
    if let Ok(item) = receiver.try_recv()
        && admit(shared)
    {
        shared.execute(item).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    type Log = Arc<Mutex<Vec<(u32, Instant)>>>;

    fn recording(executor: &ChannelExecutor<u32>) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        executor.launch(move |item| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push((item, Instant::now()));
            }
        });
        log
    }

    fn items(log: &Log) -> Vec<u32> {
        log.lock().unwrap().iter().map(|(i, _)| *i).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabled_processes_fifo_with_delay() {
        let delay = Duration::from_millis(100);
        let executor = ChannelExecutor::new(delay, Arc::new(AtomicBool::new(true)));
        let log = recording(&executor);

        for i in 1..=4 {
            executor.accept(i);
        }
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(items(&log), vec![1, 2, 3, 4]);
        let times: Vec<Instant> = log.lock().unwrap().iter().map(|(_, t)| *t).collect();
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_processes_only_first_item() {
        let flag = Arc::new(AtomicBool::new(false));
        let executor = ChannelExecutor::new(Duration::from_millis(10), Arc::clone(&flag));
        let log = recording(&executor);

        executor.accept(1);
        executor.accept(2);
        executor.accept(3);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(items(&log), vec![1]);

        flag.store(true, Ordering::SeqCst);
        executor.accept(4);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(items(&log), vec![1, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_item_after_disable_still_runs() {
        let flag = Arc::new(AtomicBool::new(true));
        let executor = ChannelExecutor::new(Duration::from_millis(10), Arc::clone(&flag));
        let log = recording(&executor);

        executor.accept(1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        flag.store(false, Ordering::SeqCst);
        executor.accept(2);
        executor.accept(3);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(items(&log), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_debug_reports_state() {
        let executor: ChannelExecutor<u32> =
            ChannelExecutor::new(Duration::from_millis(10), Arc::new(AtomicBool::new(true)));
        assert!(format!("{executor:?}").contains("Uninitialized"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_wait_for_launch() {
        let executor = ChannelExecutor::new(Duration::from_millis(10), Arc::new(AtomicBool::new(true)));
        assert_eq!(executor.state(), ExecutorState::Uninitialized);
        executor.accept(7);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let log = recording(&executor);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(items(&log), vec![7]);
        assert_eq!(executor.state(), ExecutorState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume() {
        let executor = ChannelExecutor::new(Duration::from_millis(10), Arc::new(AtomicBool::new(true)));
        let log = recording(&executor);
        tokio::time::sleep(Duration::from_millis(50)).await;

        executor.pause();
        assert_eq!(executor.state(), ExecutorState::Paused);
        executor.accept(1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(items(&log).is_empty());

        executor.resume();
        executor.resume();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(items(&log), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_accept_bypasses_flag_and_pause() {
        let executor = ChannelExecutor::new(Duration::from_millis(10), Arc::new(AtomicBool::new(false)));
        assert!(!executor.user_accept(0).await);

        let log = recording(&executor);
        executor.pause();
        assert!(executor.user_accept(5).await);
        assert!(executor.user_accept(6).await);
        assert_eq!(items(&log), vec![5, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_processing() {
        let executor = ChannelExecutor::new(Duration::from_millis(10), Arc::new(AtomicBool::new(true)));
        let log = recording(&executor);
        executor.accept(1);
        tokio::time::sleep(Duration::from_millis(100)).await;

        executor.shutdown().await;
        executor.shutdown().await;
        assert_eq!(executor.state(), ExecutorState::Cancelled);

        executor.accept(2);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(items(&log), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_one_buffered_item() {
        let executor = ChannelExecutor::new(Duration::from_secs(60), Arc::new(AtomicBool::new(true)));
        let log = recording(&executor);
        executor.accept(1);
        executor.accept(2);
        executor.accept(3);
        // let the worker pick up item 1 and start its delay
        tokio::time::sleep(Duration::from_millis(10)).await;

        executor.shutdown().await;
        assert_eq!(items(&log), vec![1, 2]);
    }
}
