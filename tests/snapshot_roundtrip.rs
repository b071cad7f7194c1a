//! Snapshot persistence across a simulated host restart: an active session
//! is serialized to disk and rehydrated into a fresh session.

mod common;

use common::MockPlatform;
use intake_cli::engine::session::{QuestionnaireSession, SessionStatus};
use intake_cli::storage::SnapshotStore;
use serde_json::json;
use std::sync::Arc;

fn session_with(mock: &Arc<MockPlatform>) -> Arc<QuestionnaireSession> {
    Arc::new(QuestionnaireSession::new(Arc::clone(mock) as _))
}

fn temp_store() -> SnapshotStore {
    let dir = std::env::temp_dir().join(format!("intake-cli-it-{}", uuid::Uuid::new_v4()));
    SnapshotStore::new(dir).unwrap()
}

#[tokio::test]
async fn test_snapshot_survives_a_restart() {
    let mock = Arc::new(MockPlatform::new());
    let session = session_with(&mock);
    session.initialize_session("tpl-1", 4).await.unwrap();
    session.update_answer("name", json!("Ada")).await;
    session
        .update_answer("symptoms", json!(["pain", "swelling"]))
        .await;
    session.set_current_page(2).await;
    session.set_current_page(3).await;
    session.set_current_page(2).await;

    let snapshot = session.snapshot().await.unwrap();
    let token = snapshot.submission_token.clone();
    let start_time = snapshot.session_start_time;
    let store = temp_store();
    store.save(&snapshot).unwrap();

    // A brand new process loads the file and rebuilds the session.
    let loaded = store.load(&token).unwrap();
    assert_eq!(loaded.session_start_time, start_time);
    assert_eq!(loaded.current_page, 2);
    assert_eq!(loaded.total_pages, 4);
    // Revisits are deduplicated and ordered.
    assert_eq!(loaded.visited_pages, vec![1, 2, 3]);

    let restored = session_with(&mock);
    restored.restore_snapshot(loaded).await;

    assert_eq!(restored.status().await, SessionStatus::Active);
    assert_eq!(restored.current_page().await, 2);
    assert_eq!(restored.answer_value("name").await, Some(json!("Ada")));
    assert_eq!(
        restored.answer_value("symptoms").await,
        Some(json!(["pain", "swelling"]))
    );
    // The visited array becomes a set again: page 3 is reachable as a
    // previous visit, page 4 only as the immediate next page from 3.
    assert!(restored.can_navigate_to_page(3).await);
    assert!(restored.can_navigate_to_page(1).await);
    assert!(!restored.can_navigate_to_page(4).await);
    assert_eq!(restored.completion_percentage().await, 75);

    // Restored answers have not been confirmed against the server.
    assert!(restored.is_dirty().await);

    store.delete(&token).unwrap();
    assert!(store.load(&token).is_err());
}

#[tokio::test]
async fn test_restored_session_keeps_its_submission_identity() {
    let mock = Arc::new(MockPlatform::new());
    let session = session_with(&mock);
    session.initialize_session("tpl-1", 2).await.unwrap();
    session.update_answer("q", json!("v")).await;

    let snapshot = session.snapshot().await.unwrap();

    let restored = session_with(&mock);
    restored.restore_snapshot(snapshot).await;

    let submission = restored.submission().await.unwrap();
    assert_eq!(submission.id, "sub-1");
    assert!(submission.server_assigned);

    // Saving from the restored session patches the same record instead of
    // creating a new one.
    restored.save_progress().await.unwrap();
    assert_eq!(
        mock.create_calls.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(
        mock.patch_calls.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn test_listing_orders_snapshots_newest_first() {
    let mock = Arc::new(MockPlatform::new());
    let store = temp_store();

    for template in ["tpl-a", "tpl-b"] {
        let session = session_with(&mock);
        session.initialize_session(template, 2).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let snapshot = session.snapshot().await.unwrap();
        store.save(&snapshot).unwrap();
    }

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].template_id, "tpl-b");
    assert_eq!(listed[1].template_id, "tpl-a");
}
