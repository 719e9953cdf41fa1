//! Content synchronization against the fake mainframe.

mod common;

use common::{
    Editor, Fixture, dataset_info, fixture, masked, register_dataset, register_member,
    register_spool_file,
};
use formainframe_core::{Error, ProgressIndicator};
use formainframe_dataops::MfVirtualFile;
use formainframe_dataops::attributes::AttributesKind;
use formainframe_dataops::content::{ConflictResolution, ContentSynchronizer, SyncState};
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn sequential(fx: &Fixture, connections: &[&str]) -> MfVirtualFile {
    register_dataset(
        &fx.manager,
        dataset_info("IBMUSER.SEQ", "PS"),
        connections.iter().map(|c| masked(fx.connection(c))).collect(),
    )
}

fn synchronizer(fx: &Fixture, file: &MfVirtualFile) -> Arc<dyn ContentSynchronizer> {
    fx.manager
        .content_synchronizer(file)
        .expect("file is synchronizable")
}

// =============================================================================
// Direction of transfer
// =============================================================================

#[tokio::test]
async fn test_first_sync_downloads() {
    let fx = fixture(&["c1"]).await;
    fx.zosmf.set_content("IBMUSER.SEQ", b"HELLO   \nWORLD  ");
    let file = sequential(&fx, &["c1"]);
    let editor = Editor::new(file.clone());
    let sync = synchronizer(&fx, &file);
    assert_eq!(sync.name(), "dataset");

    let outcome = sync
        .synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap();

    assert!(outcome.downloaded);
    assert!(!outcome.uploaded);
    assert_eq!(outcome.state, SyncState::InSync);
    assert_eq!(editor.text(), "HELLO\nWORLD");
    assert_eq!(sync.sync_state(&file), Some(SyncState::InSync));
    assert_eq!(editor.synced.load(Ordering::SeqCst), 1);
    assert!(!sync.is_file_upload_needed(&editor));
}

#[tokio::test]
async fn test_local_change_uploads() {
    let fx = fixture(&["c1"]).await;
    fx.zosmf.set_content("IBMUSER.SEQ", b"HELLO");
    let file = sequential(&fx, &["c1"]);
    let editor = Editor::new(file.clone());
    let sync = synchronizer(&fx, &file);
    let progress = ProgressIndicator::new();
    sync.synchronize_with_remote(&editor, &progress).await.unwrap();

    editor.type_text("HELLO\r\nTHERE");
    assert!(sync.is_file_upload_needed(&editor));
    let outcome = sync.synchronize_with_remote(&editor, &progress).await.unwrap();

    assert!(outcome.uploaded);
    assert_eq!(fx.zosmf.content("IBMUSER.SEQ").unwrap(), b"HELLO\nTHERE");
    assert!(!sync.is_file_upload_needed(&editor));

    let outcome = sync.synchronize_with_remote(&editor, &progress).await.unwrap();
    assert!(!outcome.uploaded && !outcome.downloaded);
    assert_eq!(outcome.state, SyncState::InSync);
    assert_eq!(fx.zosmf.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remote_change_downloads() {
    let fx = fixture(&["c1"]).await;
    fx.zosmf.set_content("IBMUSER.SEQ", b"v1");
    let file = sequential(&fx, &["c1"]);
    let editor = Editor::new(file.clone());
    let sync = synchronizer(&fx, &file);
    let progress = ProgressIndicator::new();
    sync.synchronize_with_remote(&editor, &progress).await.unwrap();

    fx.zosmf.set_content("IBMUSER.SEQ", b"v2");
    let outcome = sync.synchronize_with_remote(&editor, &progress).await.unwrap();

    assert!(outcome.downloaded);
    assert_eq!(editor.text(), "v2");
    assert_eq!(fx.zosmf.uploads.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Conflicts
// =============================================================================

async fn diverged(fx: &Fixture) -> (Editor, Arc<dyn ContentSynchronizer>) {
    fx.zosmf.set_content("IBMUSER.SEQ", b"base");
    let file = sequential(fx, &["c1"]);
    let editor = Editor::new(file.clone());
    let sync = synchronizer(fx, &file);
    sync.synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap();
    editor.type_text("mine");
    fx.zosmf.set_content("IBMUSER.SEQ", b"theirs");
    (editor, sync)
}

#[tokio::test]
async fn test_conflict_skipped() {
    let fx = fixture(&["c1"]).await;
    let (editor, sync) = diverged(&fx).await;

    let outcome = sync
        .synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SyncState::Conflict);
    assert_eq!(editor.conflicts.load(Ordering::SeqCst), 1);
    assert_eq!(editor.text(), "mine");
    assert_eq!(fx.zosmf.content("IBMUSER.SEQ").unwrap(), b"theirs");
}

#[tokio::test]
async fn test_conflict_accept_remote() {
    let fx = fixture(&["c1"]).await;
    let (editor, sync) = diverged(&fx).await;
    editor.resolve_with(ConflictResolution::AcceptRemote);

    let outcome = sync
        .synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap();

    assert!(outcome.downloaded);
    assert_eq!(editor.text(), "theirs");
}

#[tokio::test]
async fn test_conflict_upload_local() {
    let fx = fixture(&["c1"]).await;
    let (editor, sync) = diverged(&fx).await;
    editor.resolve_with(ConflictResolution::UploadLocal);

    let outcome = sync
        .synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap();

    assert!(outcome.uploaded);
    assert_eq!(outcome.state, SyncState::InSync);
    assert_eq!(fx.zosmf.content("IBMUSER.SEQ").unwrap(), b"mine");
}

#[tokio::test]
async fn test_same_edit_on_both_sides_is_in_sync() {
    let fx = fixture(&["c1"]).await;
    let (editor, sync) = diverged(&fx).await;
    editor.type_text("theirs");

    let outcome = sync
        .synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SyncState::InSync);
    assert_eq!(editor.conflicts.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Dependent resources
// =============================================================================

#[tokio::test]
async fn test_member_falls_back_to_next_connection() {
    let fx = fixture(&["c1", "c2"]).await;
    fx.zosmf.fail("c1");
    fx.zosmf.set_content("IBMUSER.SRC(HELLO)", b"member text");
    let library = register_dataset(
        &fx.manager,
        dataset_info("IBMUSER.SRC", "PO"),
        vec![masked(fx.connection("c1")), masked(fx.connection("c2"))],
    );
    let member = register_member(&fx.manager, &library, "HELLO");
    let editor = Editor::new(member.clone());
    let sync = synchronizer(&fx, &member);
    assert_eq!(sync.name(), "member");

    sync.synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap();

    assert_eq!(editor.text(), "member text");
    assert_eq!(
        fx.zosmf.calls(),
        vec!["c1 get IBMUSER.SRC(HELLO)", "c2 get IBMUSER.SRC(HELLO)"]
    );
}

#[tokio::test]
async fn test_member_reports_last_failure() {
    let fx = fixture(&["c1", "c2"]).await;
    fx.zosmf.fail("c1");
    fx.zosmf.fail("c2");
    let library = register_dataset(
        &fx.manager,
        dataset_info("IBMUSER.SRC", "PO"),
        vec![masked(fx.connection("c1")), masked(fx.connection("c2"))],
    );
    let member = register_member(&fx.manager, &library, "HELLO");
    let editor = Editor::new(member.clone());
    let sync = synchronizer(&fx, &member);

    let err = sync
        .synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Cannot fetch data from IBMUSER.SRC(HELLO) (HTTP 500)"
    );
    assert_eq!(err.response().map(|r| r.body.as_str()), Some("c2 down"));
    assert_eq!(sync.sync_state(&member), None);
    assert_eq!(editor.synced.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_requesters_is_not_found() {
    let fx = fixture(&["c1"]).await;
    let file = sequential(&fx, &[]);
    let editor = Editor::new(file.clone());

    let err = synchronizer(&fx, &file)
        .synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound { .. }));
    assert!(fx.zosmf.calls().is_empty());
}

#[tokio::test]
async fn test_spool_file_is_read_only() {
    let fx = fixture(&["c1"]).await;
    fx.zosmf.set_content("IBMUSERA(JOB00042):2", b"IEF142I STEP1 - STEP WAS EXECUTED");
    let spool = register_spool_file(&fx.manager, fx.connection("c1"));
    let editor = Editor::new(spool.clone());
    let sync = synchronizer(&fx, &spool);
    assert_eq!(sync.name(), "spool-file");
    let progress = ProgressIndicator::new();
    sync.synchronize_with_remote(&editor, &progress).await.unwrap();
    assert_eq!(editor.text(), "IEF142I STEP1 - STEP WAS EXECUTED");

    editor.type_text("edited");
    let outcome = sync.synchronize_with_remote(&editor, &progress).await.unwrap();

    assert_eq!(outcome.state, SyncState::LocallyModified);
    assert!(!outcome.uploaded);
    assert_eq!(fx.zosmf.uploads.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_concurrent_syncs_of_one_file_are_serialized() {
    let fx = fixture(&["c1"]).await;
    fx.zosmf.set_content("IBMUSER.SEQ", b"content");
    let file = sequential(&fx, &["c1"]);
    let editor = Editor::new(file.clone());
    let sync = synchronizer(&fx, &file);
    let progress = ProgressIndicator::new();

    let outcomes = futures::future::join_all(
        (0..3).map(|_| sync.synchronize_with_remote(&editor, &progress)),
    )
    .await;

    let downloads = outcomes
        .into_iter()
        .map(Result::unwrap)
        .filter(|outcome| outcome.downloaded)
        .count();
    assert_eq!(downloads, 1);
    assert_eq!(fx.zosmf.calls().len(), 3);
}

#[tokio::test]
async fn test_cancelled_sync_keeps_state() {
    let fx = fixture(&["c1"]).await;
    fx.zosmf.set_content("IBMUSER.SEQ", b"content");
    let file = sequential(&fx, &["c1"]);
    let editor = Editor::new(file.clone());
    let sync = synchronizer(&fx, &file);
    sync.synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap();

    let cancelled = ProgressIndicator::new();
    cancelled.cancel();
    let err = sync
        .synchronize_with_remote(&editor, &cancelled)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(sync.sync_state(&file), Some(SyncState::InSync));
    assert_eq!(fx.zosmf.calls().len(), 1);
}

#[tokio::test]
async fn test_forgotten_file_has_no_metadata() {
    let fx = fixture(&["c1"]).await;
    let file = sequential(&fx, &["c1"]);
    let editor = Editor::new(file.clone());
    let sync = synchronizer(&fx, &file);
    fx.manager
        .attributes_service(AttributesKind::Dataset)
        .unwrap()
        .clear_attributes(&file);

    assert!(!fx.manager.is_sync_supported(&file));
    let err = sync
        .synchronize_with_remote(&editor, &ProgressIndicator::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingMetadata { .. }));

    sync.remove_file(&file);
    assert_eq!(sync.sync_state(&file), None);
}
