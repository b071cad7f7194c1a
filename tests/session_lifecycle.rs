//! Session state machine: initialization, dirty tracking, save/retry,
//! completion and reset.

mod common;

use common::MockPlatform;
use intake_cli::engine::session::{QuestionnaireSession, SaveOutcome, SessionStatus};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn session_with(mock: &Arc<MockPlatform>) -> Arc<QuestionnaireSession> {
    Arc::new(QuestionnaireSession::new(Arc::clone(mock) as _))
}

#[tokio::test]
async fn test_initialize_creates_submission_and_visits_page_one() {
    let mock = Arc::new(MockPlatform::new());
    let session = session_with(&mock);

    session.initialize_session("tpl-1", 5).await.unwrap();

    assert_eq!(session.status().await, SessionStatus::Active);
    assert_eq!(session.current_page().await, 1);
    assert_eq!(mock.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.completion_percentage().await, 20);

    let submission = session.submission().await.unwrap();
    assert_eq!(submission.id, "sub-1");
    assert!(submission.server_assigned);
    assert!(!session.is_dirty().await);
}

#[tokio::test]
async fn test_update_answer_sets_dirty_and_save_clears_it() {
    let mock = Arc::new(MockPlatform::new());
    let session = session_with(&mock);
    session.initialize_session("tpl-1", 5).await.unwrap();

    session.update_answer("name", json!("Ada")).await;
    assert!(session.is_dirty().await);
    assert!(session.last_saved().await.is_none());

    let outcome = session.save_progress().await.unwrap();
    assert_eq!(outcome, SaveOutcome::Saved);
    assert!(!session.is_dirty().await);
    assert!(session.last_saved().await.is_some());

    let patch = mock.last_patch.lock().unwrap().clone().unwrap();
    assert_eq!(patch.submission_data["name"], json!("Ada"));
    assert_eq!(patch.completion_percentage, 20);

    // Clean session: nothing further is sent.
    let outcome = session.save_progress().await.unwrap();
    assert_eq!(outcome, SaveOutcome::Clean);
    assert_eq!(mock.patch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_save_keeps_dirty_and_retries() {
    let mock = Arc::new(MockPlatform::new());
    let session = session_with(&mock);
    session.initialize_session("tpl-1", 5).await.unwrap();
    session.update_answer("name", json!("Ada")).await;

    mock.fail_patch.store(true, Ordering::SeqCst);
    assert!(session.save_progress().await.is_err());
    assert!(session.is_dirty().await);

    mock.fail_patch.store(false, Ordering::SeqCst);
    assert_eq!(session.save_progress().await.unwrap(), SaveOutcome::Saved);
    assert!(!session.is_dirty().await);
}

#[tokio::test]
async fn test_create_failure_is_tolerated_and_retried_before_patch() {
    let mock = Arc::new(MockPlatform::new());
    mock.fail_create.store(true, Ordering::SeqCst);
    let session = session_with(&mock);

    // The UI must not crash: the session continues locally.
    session.initialize_session("tpl-1", 5).await.unwrap();
    assert_eq!(session.status().await, SessionStatus::Active);
    let submission = session.submission().await.unwrap();
    assert!(!submission.server_assigned);

    session.update_answer("name", json!("Ada")).await;

    // Still failing: the save defers instead of PATCHing a placeholder id.
    assert_eq!(session.save_progress().await.unwrap(), SaveOutcome::Deferred);
    assert!(session.is_dirty().await);
    assert_eq!(mock.patch_calls.load(Ordering::SeqCst), 0);

    // Next tick: create succeeds, then the PATCH goes out.
    mock.fail_create.store(false, Ordering::SeqCst);
    assert_eq!(session.save_progress().await.unwrap(), SaveOutcome::Saved);
    assert_eq!(mock.patch_calls.load(Ordering::SeqCst), 1);
    assert!(session.submission().await.unwrap().server_assigned);
}

#[tokio::test]
async fn test_completion_is_idempotent_and_fires_analytics() {
    let mock = Arc::new(MockPlatform::new());
    let session = session_with(&mock);
    session.initialize_session("tpl-1", 2).await.unwrap();
    session.update_answer("name", json!("Ada")).await;
    session.set_current_page(2).await;

    session.complete_submission().await.unwrap();
    assert_eq!(session.status().await, SessionStatus::Completed);
    let submission = session.submission().await.unwrap();
    assert!(submission.is_complete);
    assert_eq!(submission.completion_percentage, 100);
    assert!(submission.completed_at.is_some());
    assert!(!session.is_dirty().await);

    // Second call is a no-op.
    session.complete_submission().await.unwrap();
    assert_eq!(mock.complete_calls.load(Ordering::SeqCst), 1);

    // Analytics is fire-and-forget on a spawned task.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        mock.events.lock().unwrap().as_slice(),
        ["submission_completed"]
    );
}

#[tokio::test]
async fn test_completed_session_ignores_mutations() {
    let mock = Arc::new(MockPlatform::new());
    let session = session_with(&mock);
    session.initialize_session("tpl-1", 1).await.unwrap();
    session.complete_submission().await.unwrap();

    session.update_answer("late", json!("nope")).await;
    assert!(!session.is_dirty().await);
    assert!(session.answers().await.is_empty());
    assert_eq!(session.save_progress().await.unwrap(), SaveOutcome::Inactive);
}

#[tokio::test]
async fn test_reset_returns_to_uninitialized() {
    let mock = Arc::new(MockPlatform::new());
    let session = session_with(&mock);
    session.initialize_session("tpl-1", 5).await.unwrap();
    session.update_answer("name", json!("Ada")).await;

    session.reset_session().await;
    assert_eq!(session.status().await, SessionStatus::Uninitialized);
    assert!(session.answers().await.is_empty());
    assert!(!session.is_dirty().await);
    assert_eq!(session.save_progress().await.unwrap(), SaveOutcome::Inactive);
}

#[tokio::test]
async fn test_page_navigation_rules() {
    let mock = Arc::new(MockPlatform::new());
    let session = session_with(&mock);
    session.initialize_session("tpl-1", 3).await.unwrap();

    assert!(!session.can_navigate_back().await);
    assert!(session.can_navigate_forward().await);
    // Immediate next page is reachable, skipping ahead is not.
    assert!(session.can_navigate_to_page(2).await);
    assert!(!session.can_navigate_to_page(3).await);

    session.set_current_page(2).await;
    assert!(session.can_navigate_back().await);
    assert!(session.can_navigate_to_page(1).await); // visited
    assert!(session.can_navigate_to_page(3).await); // next

    session.set_current_page(3).await;
    assert!(!session.can_navigate_forward().await);
    assert_eq!(session.completion_percentage().await, 100);
}

#[tokio::test]
async fn test_remove_answer_marks_dirty_only_when_present() {
    let mock = Arc::new(MockPlatform::new());
    let session = session_with(&mock);
    session.initialize_session("tpl-1", 1).await.unwrap();

    session.remove_answer("ghost").await;
    assert!(!session.is_dirty().await);

    session.update_answer("q", json!(1)).await;
    session.save_progress().await.unwrap();
    session.remove_answer("q").await;
    assert!(session.is_dirty().await);
    assert!(session.answers().await.is_empty());
}
