//! Synchronization of files right after they are saved.

use crate::content::SyncProvider;
use crate::manager::DataOpsManager;
use formainframe_core::{ChannelExecutor, ConfigService, ExecutorState, ProgressIndicator};
use formainframe_events::{EventCategory, EventSender, SyncEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const EVENT_TARGET: &str = "formainframe::sync";

/// A file waiting to be synchronized.
#[derive(Clone)]
pub struct SyncRequest {
    /// Editor side of the file.
    pub provider: Arc<dyn SyncProvider>,
}

impl std::fmt::Debug for SyncRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRequest")
            .field("file", self.provider.file())
            .finish()
    }
}

/// Queues saved files for synchronization with the mainframe.
///
/// Requests go through a [`ChannelExecutor`], so bursts of saves are
/// spaced by the auto-sync delay and processed one at a time.
pub struct AutoSyncFileListener {
    manager: Arc<DataOpsManager>,
    executor: ChannelExecutor<SyncRequest>,
    auto_sync: Arc<AtomicBool>,
    events: Option<EventSender>,
}

impl std::fmt::Debug for AutoSyncFileListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSyncFileListener")
            .field("executor", &self.executor)
            .field("auto_sync", &self.auto_sync.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl AutoSyncFileListener {
    /// Listener following the auto-sync settings of `config`.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(
        manager: Arc<DataOpsManager>,
        config: &ConfigService,
        events: Option<EventSender>,
    ) -> Self {
        Self::with_flag(
            manager,
            config.settings().auto_sync_delay(),
            config.auto_sync_flag(),
            events,
        )
    }

    /// Listener with an explicit delay and auto-sync flag.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn with_flag(
        manager: Arc<DataOpsManager>,
        delay: Duration,
        auto_sync: Arc<AtomicBool>,
        events: Option<EventSender>,
    ) -> Self {
        let executor = ChannelExecutor::new(delay, Arc::clone(&auto_sync));
        let worker_manager = Arc::clone(&manager);
        let worker_events = events.clone();
        executor.launch(move |request: SyncRequest| {
            let manager = Arc::clone(&worker_manager);
            let events = worker_events.clone();
            async move { synchronize(&manager, &request, events.as_ref()).await }
        });
        Self {
            manager,
            executor,
            auto_sync,
            events,
        }
    }

    /// React to a document being written.
    ///
    /// Returns whether the file was queued: only saves of supported files
    /// are, and only while auto-sync is enabled.
    pub fn on_file_saved(&self, provider: Arc<dyn SyncProvider>, from_save: bool) -> bool {
        if !from_save || !self.auto_sync.load(Ordering::SeqCst) {
            return false;
        }
        let file = provider.file();
        if !self.manager.is_sync_supported(file) {
            tracing::debug!(file = %file, "Saved file is not synchronizable");
            return false;
        }
        publish(
            self.events.as_ref(),
            SyncEvent::AutoSyncFile {
                file: file.path().to_string(),
            },
        );
        self.executor.accept(SyncRequest { provider });
        true
    }

    /// Synchronize now, bypassing the queue and the auto-sync flag.
    pub async fn sync_now(&self, provider: Arc<dyn SyncProvider>) -> bool {
        self.executor.user_accept(SyncRequest { provider }).await
    }

    /// Hold queued requests.
    pub fn pause(&self) {
        self.executor.pause();
    }

    /// Release queued requests.
    pub fn resume(&self) {
        self.executor.resume();
    }

    /// State of the underlying queue.
    #[must_use]
    pub fn state(&self) -> ExecutorState {
        self.executor.state()
    }

    /// Stop processing and wait for the queue worker to end.
    pub async fn shutdown(&self) {
        self.executor.shutdown().await;
    }
}

async fn synchronize(manager: &DataOpsManager, request: &SyncRequest, events: Option<&EventSender>) {
    let file = request.provider.file();
    let Some(synchronizer) = manager.content_synchronizer(file) else {
        tracing::debug!(file = %file, "No synchronizer for file");
        return;
    };
    let progress = ProgressIndicator::new();
    match synchronizer
        .synchronize_with_remote(request.provider.as_ref(), &progress)
        .await
    {
        Ok(outcome) => publish(
            events,
            SyncEvent::Synced {
                file: file.path().to_string(),
                uploaded: outcome.uploaded,
                downloaded: outcome.downloaded,
            },
        ),
        Err(e) if e.is_cancelled() => {}
        Err(e) => publish(
            events,
            SyncEvent::Failed {
                file: file.path().to_string(),
                message: e.user_message(),
            },
        ),
    }
}

fn publish(events: Option<&EventSender>, event: SyncEvent) {
    if let Some(events) = events
        && let Err(e) = events.publish(EVENT_TARGET, EventCategory::Sync(event))
    {
        tracing::debug!(error = %e, "Sync event not delivered");
    }
}
