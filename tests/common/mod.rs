//! Shared test fixtures: an in-memory platform collaborator with
//! controllable failures and a gate for holding a PATCH in flight.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

use intake_cli::api::models::{AnalyticsEvent, CompletionPayload, SubmissionPatch};
use intake_cli::api::PlatformApi;
use intake_cli::engine::model::{Page, Submission, Template};

#[derive(Default)]
pub struct MockPlatform {
    pub fail_create: AtomicBool,
    pub fail_patch: AtomicBool,
    pub fail_complete: AtomicBool,
    pub create_calls: AtomicUsize,
    pub patch_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,
    pub last_patch: Mutex<Option<SubmissionPatch>>,
    pub events: Mutex<Vec<String>>,
    /// When set, `update_submission` signals `patch_entered` and then waits
    /// for `patch_release`, letting tests observe an in-flight save.
    pub hold_patch: AtomicBool,
    pub patch_entered: Notify,
    pub patch_release: Notify,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn server_submission(&self, id: &str, template_id: &str, token: &str) -> Submission {
        Submission {
            id: id.to_string(),
            template_id: template_id.to_string(),
            submission_token: token.to_string(),
            submission_data: json!({}),
            is_complete: false,
            completion_percentage: 0,
            time_spent_seconds: 0,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
            completed_at: None,
            server_assigned: true,
        }
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn fetch_templates(&self) -> Result<Vec<Template>> {
        Ok(vec![])
    }

    async fn fetch_template(&self, template_id: &str) -> Result<Template> {
        Ok(Template {
            id: template_id.to_string(),
            name: "Dental intake".to_string(),
            description: None,
            total_pages: 5,
            is_active: true,
            language: Some("en".to_string()),
            intro_text: None,
            completion_text: None,
        })
    }

    async fn fetch_pages(&self, _template_id: &str) -> Result<Vec<Page>> {
        Ok(vec![])
    }

    async fn create_submission(&self, template_id: &str, token: &str) -> Result<Submission> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("simulated create failure");
        }
        Ok(self.server_submission("sub-1", template_id, token))
    }

    async fn update_submission(
        &self,
        submission_id: &str,
        patch: &SubmissionPatch,
    ) -> Result<Submission> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_patch.lock().unwrap() = Some(patch.clone());

        if self.hold_patch.load(Ordering::SeqCst) {
            self.patch_entered.notify_one();
            self.patch_release.notified().await;
        }

        if self.fail_patch.load(Ordering::SeqCst) {
            anyhow::bail!("simulated patch failure");
        }
        Ok(self.server_submission(submission_id, "tpl-1", "token"))
    }

    async fn complete_submission(
        &self,
        submission_id: &str,
        _payload: &CompletionPayload,
    ) -> Result<Submission> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_complete.load(Ordering::SeqCst) {
            anyhow::bail!("simulated completion failure");
        }
        let mut submission = self.server_submission(submission_id, "tpl-1", "token");
        submission.is_complete = true;
        submission.completion_percentage = 100;
        submission.completed_at = Some(Utc::now());
        Ok(submission)
    }

    async fn track_event(&self, event: &AnalyticsEvent) {
        self.events.lock().unwrap().push(event.event.clone());
    }
}
