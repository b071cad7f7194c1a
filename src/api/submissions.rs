//! Submission persistence calls: create, patch, complete, analytics.

use anyhow::Result;
use log::{debug, warn};
use serde_json::json;
use urlencoding::encode;

use super::client::PlatformClient;
use super::models::{AnalyticsEvent, CompletionPayload, SubmissionPatch};
use crate::engine::model::Submission;

impl PlatformClient {
    pub(super) async fn create_submission_impl(
        &self,
        template_id: &str,
        submission_token: &str,
    ) -> Result<Submission> {
        let body = json!({
            "template_id": template_id,
            "submission_token": submission_token,
        });

        let mut submission: Submission = self.post_json("/api/submissions", &body).await?;
        submission.server_assigned = true;
        debug!(
            "Created submission {} for template {}",
            submission.id, template_id
        );
        Ok(submission)
    }

    pub(super) async fn update_submission_impl(
        &self,
        submission_id: &str,
        patch: &SubmissionPatch,
    ) -> Result<Submission> {
        let mut submission: Submission = self
            .patch_json(&format!("/api/submissions/{}", encode(submission_id)), patch)
            .await?;
        submission.server_assigned = true;
        debug!(
            "Patched submission {} ({}% complete, {}s spent)",
            submission_id, patch.completion_percentage, patch.time_spent_seconds
        );
        Ok(submission)
    }

    pub(super) async fn complete_submission_impl(
        &self,
        submission_id: &str,
        payload: &CompletionPayload,
    ) -> Result<Submission> {
        let mut submission: Submission = self
            .post_json(
                &format!("/api/submissions/{}/complete", encode(submission_id)),
                payload,
            )
            .await?;
        submission.server_assigned = true;
        debug!("Completed submission {}", submission_id);
        Ok(submission)
    }

    /// Fire-and-forget: failures are logged, never surfaced.
    pub(super) async fn track_event_impl(&self, event: &AnalyticsEvent) {
        match self
            .post_json::<serde_json::Value>("/api/analytics/events", event)
            .await
        {
            Ok(_) => debug!("Tracked analytics event '{}'", event.event),
            Err(e) => warn!("Failed to track analytics event '{}': {}", event.event, e),
        }
    }
}
