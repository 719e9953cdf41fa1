//! Content adaptation and synchronization with the mainframe.
//!
//! A [`ContentSynchronizer`] reconciles the editor copy of one remote
//! resource with its remote content. The reconciliation logic lives in
//! [`RemoteAttributedContentSynchronizer`]; each resource kind supplies a
//! [`RemoteContentIo`] doing the actual transfers.

mod adapter;
mod io;
mod synchronizer;

pub use adapter::{ContentAdapter, DefaultContentAdapter};
pub use io::{DatasetContentIo, MemberContentIo, SpoolFileContentIo, UssContentIo};
pub use synchronizer::{RemoteAttributedContentSynchronizer, RemoteContentIo};

use crate::file::MfVirtualFile;
use async_trait::async_trait;
use formainframe_core::{ProgressIndicator, Result};

/// Where a tracked file stands relative to its remote content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Editor and remote match the last synchronized content.
    InSync,
    /// The editor holds changes not uploaded yet.
    LocallyModified,
    /// A synchronization is running.
    Syncing,
    /// Both sides changed and the conflict was left open.
    Conflict,
}

/// Decision taken when both sides changed since the last synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Overwrite the remote content with the editor content.
    UploadLocal,
    /// Replace the editor content with the remote content.
    AcceptRemote,
    /// Leave both untouched.
    Skip,
}

/// Result of one synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Editor content was sent to the mainframe.
    pub uploaded: bool,
    /// Remote content was loaded into the editor.
    pub downloaded: bool,
    /// State after the synchronization.
    pub state: SyncState,
}

impl SyncOutcome {
    const fn new(uploaded: bool, downloaded: bool, state: SyncState) -> Self {
        Self {
            uploaded,
            downloaded,
            state,
        }
    }
}

/// The editor side of a synchronization.
pub trait SyncProvider: Send + Sync {
    /// Handle being synchronized.
    fn file(&self) -> &MfVirtualFile;

    /// Current editor content.
    fn retrieve_current_content(&self) -> Vec<u8>;

    /// Replace the editor content.
    ///
    /// # Errors
    ///
    /// Fails when the editor cannot take the content.
    fn load_new_content(&self, content: &[u8]) -> Result<()>;

    /// Editor refuses local changes.
    fn is_read_only(&self) -> bool {
        false
    }

    /// Pick a side when both changed.
    fn resolve_conflict(&self, local: &[u8], remote: &[u8]) -> ConflictResolution;

    /// Called after every successful synchronization.
    fn on_synced(&self, _outcome: &SyncOutcome) {}
}

/// Keeps editor copies of one resource kind in step with the mainframe.
#[async_trait]
pub trait ContentSynchronizer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Whether `file` is handled.
    fn accepts(&self, file: &MfVirtualFile) -> bool;

    /// Upload, download or do nothing, depending on what changed.
    ///
    /// Calls for the same file are serialized.
    ///
    /// # Errors
    ///
    /// Fails when the file has no attributes or a transfer fails on every
    /// requester.
    async fn synchronize_with_remote(
        &self,
        provider: &dyn SyncProvider,
        progress: &ProgressIndicator,
    ) -> Result<SyncOutcome>;

    /// State of `file`, if it was ever synchronized.
    fn sync_state(&self, file: &MfVirtualFile) -> Option<SyncState>;

    /// Whether the editor content differs from the last synchronized one.
    fn is_file_upload_needed(&self, provider: &dyn SyncProvider) -> bool;

    /// Stop tracking `file`.
    fn remove_file(&self, file: &MfVirtualFile);
}
