use super::{ConflictResolution, ContentSynchronizer, SyncOutcome, SyncProvider, SyncState};
use crate::attributes::{AttributesKind, FileAttributes};
use crate::context::DataOpsContext;
use crate::file::{FileId, MfVirtualFile};
use async_trait::async_trait;
use formainframe_core::{Error, ProgressIndicator, Result};
use formainframe_events::{emit_sync_completed, emit_sync_started};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Transfers of one resource kind.
#[async_trait]
pub trait RemoteContentIo: Send + Sync + 'static {
    /// Kind of resource transferred.
    const KIND: AttributesKind;

    /// Name used in logs.
    const NAME: &'static str;

    /// Raw remote content.
    async fn fetch_remote_content(
        &self,
        context: &DataOpsContext,
        attributes: &FileAttributes,
        progress: &ProgressIndicator,
    ) -> Result<Vec<u8>>;

    /// Replace the remote content.
    async fn upload_content(
        &self,
        context: &DataOpsContext,
        attributes: &FileAttributes,
        content: &[u8],
        progress: &ProgressIndicator,
    ) -> Result<()>;

    /// The resource cannot be written.
    fn is_read_only(&self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    successful_content: Option<Vec<u8>>,
    last_remote: Option<Vec<u8>>,
    state: Option<SyncState>,
}

#[derive(Debug, Default)]
struct FileSlot {
    running: tokio::sync::Mutex<()>,
    snapshot: Mutex<Snapshot>,
}

impl FileSlot {
    fn snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, successful: Vec<u8>, remote: Vec<u8>) {
        let mut snapshot = self.snapshot();
        snapshot.successful_content = Some(successful);
        snapshot.last_remote = Some(remote);
    }
}

/// Synchronizer for resources identified by their attributes.
///
/// Per file it remembers the content of the last successful
/// synchronization and the remote content seen then. A synchronization
/// compares both sides against those and moves content in whichever
/// direction changed; when both changed the [`SyncProvider`] decides.
pub struct RemoteAttributedContentSynchronizer<I: RemoteContentIo> {
    context: Arc<DataOpsContext>,
    io: I,
    files: Mutex<HashMap<FileId, Arc<FileSlot>>>,
}

impl<I: RemoteContentIo> std::fmt::Debug for RemoteAttributedContentSynchronizer<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAttributedContentSynchronizer")
            .field("name", &I::NAME)
            .finish_non_exhaustive()
    }
}

impl<I: RemoteContentIo> RemoteAttributedContentSynchronizer<I> {
    /// Synchronizer transferring through `io`.
    #[must_use]
    pub fn new(context: Arc<DataOpsContext>, io: I) -> Self {
        Self {
            context,
            io,
            files: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, file: &MfVirtualFile) -> Arc<FileSlot> {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(files.entry(file.id()).or_default())
    }

    fn existing_slot(&self, file: &MfVirtualFile) -> Option<Arc<FileSlot>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&file.id())
            .cloned()
    }

    fn attributes(&self, file: &MfVirtualFile) -> Result<FileAttributes> {
        self.context
            .attributes_service(I::KIND)?
            .get_attributes(file)
            .ok_or_else(|| Error::missing_metadata(format!("No attributes found for {file}")))
    }

    fn download(
        slot: &FileSlot,
        provider: &dyn SyncProvider,
        remote: Vec<u8>,
    ) -> Result<SyncOutcome> {
        provider.load_new_content(&remote)?;
        slot.record(remote.clone(), remote);
        Ok(SyncOutcome::new(false, true, SyncState::InSync))
    }

    async fn upload(
        &self,
        slot: &FileSlot,
        attributes: &FileAttributes,
        local: Vec<u8>,
        progress: &ProgressIndicator,
    ) -> Result<SyncOutcome> {
        let prepared = self.context.prepare_content_to_mainframe(attributes, &local);
        self.io
            .upload_content(&self.context, attributes, &prepared, progress)
            .await?;
        let expected_remote = self.context.adapt_content_from_mainframe(attributes, &prepared);
        slot.record(local, expected_remote);
        Ok(SyncOutcome::new(true, false, SyncState::InSync))
    }

    async fn reconcile(
        &self,
        slot: &FileSlot,
        attributes: &FileAttributes,
        provider: &dyn SyncProvider,
        progress: &ProgressIndicator,
    ) -> Result<SyncOutcome> {
        let raw = self
            .io
            .fetch_remote_content(&self.context, attributes, progress)
            .await?;
        let remote = self.context.adapt_content_from_mainframe(attributes, &raw);

        let (successful, last_remote) = {
            let snapshot = slot.snapshot();
            (
                snapshot.successful_content.clone(),
                snapshot.last_remote.clone(),
            )
        };
        let Some(successful) = successful else {
            tracing::debug!(file = %provider.file(), "First synchronization, loading remote content");
            return Self::download(slot, provider, remote);
        };

        let local = provider.retrieve_current_content();
        let local_changed = local != successful;
        let remote_changed = last_remote.as_deref() != Some(remote.as_slice());
        let read_only = self.io.is_read_only() || provider.is_read_only();
        tracing::debug!(
            file = %provider.file(),
            local_changed,
            remote_changed,
            read_only,
            "Comparing content"
        );

        match (local_changed, remote_changed) {
            (false, false) => Ok(SyncOutcome::new(false, false, SyncState::InSync)),
            (false, true) => Self::download(slot, provider, remote),
            (true, false) if read_only => {
                Ok(SyncOutcome::new(false, false, SyncState::LocallyModified))
            }
            (true, false) => self.upload(slot, attributes, local, progress).await,
            (true, true) if local == remote => {
                slot.record(local, remote);
                Ok(SyncOutcome::new(false, false, SyncState::InSync))
            }
            (true, true) => match provider.resolve_conflict(&local, &remote) {
                ConflictResolution::UploadLocal if !read_only => {
                    self.upload(slot, attributes, local, progress).await
                }
                ConflictResolution::AcceptRemote => Self::download(slot, provider, remote),
                ConflictResolution::UploadLocal | ConflictResolution::Skip => {
                    Ok(SyncOutcome::new(false, false, SyncState::Conflict))
                }
            },
        }
    }
}

#[async_trait]
impl<I: RemoteContentIo> ContentSynchronizer for RemoteAttributedContentSynchronizer<I> {
    fn name(&self) -> &'static str {
        I::NAME
    }

    fn accepts(&self, file: &MfVirtualFile) -> bool {
        self.context
            .attributes_service(I::KIND)
            .is_ok_and(|service| service.get_attributes(file).is_some())
    }

    async fn synchronize_with_remote(
        &self,
        provider: &dyn SyncProvider,
        progress: &ProgressIndicator,
    ) -> Result<SyncOutcome> {
        let file = provider.file();
        let slot = self.slot(file);
        let _running = slot.running.lock().await;
        progress.check_canceled()?;

        let attributes = self.attributes(file)?;
        emit_sync_started!(file);
        let previous = slot.snapshot().state.replace(SyncState::Syncing);

        match self.reconcile(&slot, &attributes, provider, progress).await {
            Ok(outcome) => {
                slot.snapshot().state = Some(outcome.state);
                emit_sync_completed!(file, outcome.uploaded, outcome.downloaded);
                provider.on_synced(&outcome);
                Ok(outcome)
            }
            Err(e) => {
                slot.snapshot().state = previous;
                if e.is_cancelled() {
                    tracing::debug!(file = %file, "Synchronization cancelled");
                } else {
                    tracing::warn!(file = %file, error = %e, "Synchronization failed");
                }
                Err(e)
            }
        }
    }

    fn sync_state(&self, file: &MfVirtualFile) -> Option<SyncState> {
        let slot = self.existing_slot(file)?;
        let state = slot.snapshot().state;
        state
    }

    fn is_file_upload_needed(&self, provider: &dyn SyncProvider) -> bool {
        let Some(slot) = self.existing_slot(provider.file()) else {
            return false;
        };
        let successful = slot.snapshot().successful_content.clone();
        successful.is_some_and(|content| content != provider.retrieve_current_content())
    }

    fn remove_file(&self, file: &MfVirtualFile) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&file.id());
    }
}
