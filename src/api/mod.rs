//! Platform API boundary.
//!
//! The engine talks to the platform exclusively through the [`PlatformApi`]
//! trait so tests can substitute an in-memory collaborator. The production
//! implementation is [`PlatformClient`], a pooled reqwest JSON client.

pub mod catalog;
pub mod client;
pub mod models;
pub mod submissions;

use anyhow::Result;
use async_trait::async_trait;

pub use client::PlatformClient;
pub use models::{AnalyticsEvent, CompletionPayload, RawPage, RawQuestion, SubmissionPatch};

use crate::engine::model::{Page, Submission, Template};

/// Collaborator contract for the questionnaire platform.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// List active templates.
    async fn fetch_templates(&self) -> Result<Vec<Template>>;

    /// Fetch one template; fails when missing or inactive.
    async fn fetch_template(&self, template_id: &str) -> Result<Template>;

    /// Fetch a template's pages with nested questions, ordered by
    /// page_number then order_index.
    async fn fetch_pages(&self, template_id: &str) -> Result<Vec<Page>>;

    /// Create a new submission record. Each call creates a new record; the
    /// engine relies on the returned id.
    async fn create_submission(
        &self,
        template_id: &str,
        submission_token: &str,
    ) -> Result<Submission>;

    /// Partial update; omitted fields are left unchanged server-side.
    async fn update_submission(
        &self,
        submission_id: &str,
        patch: &SubmissionPatch,
    ) -> Result<Submission>;

    /// Finalize a submission: sets is_complete, completion_percentage=100
    /// and completed_at server-side.
    async fn complete_submission(
        &self,
        submission_id: &str,
        payload: &CompletionPayload,
    ) -> Result<Submission>;

    /// Best-effort analytics; must never fail the caller.
    async fn track_event(&self, event: &AnalyticsEvent);
}

#[async_trait]
impl PlatformApi for PlatformClient {
    async fn fetch_templates(&self) -> Result<Vec<Template>> {
        self.fetch_templates_impl().await
    }

    async fn fetch_template(&self, template_id: &str) -> Result<Template> {
        self.fetch_template_impl(template_id).await
    }

    async fn fetch_pages(&self, template_id: &str) -> Result<Vec<Page>> {
        self.fetch_pages_impl(template_id).await
    }

    async fn create_submission(
        &self,
        template_id: &str,
        submission_token: &str,
    ) -> Result<Submission> {
        self.create_submission_impl(template_id, submission_token).await
    }

    async fn update_submission(
        &self,
        submission_id: &str,
        patch: &SubmissionPatch,
    ) -> Result<Submission> {
        self.update_submission_impl(submission_id, patch).await
    }

    async fn complete_submission(
        &self,
        submission_id: &str,
        payload: &CompletionPayload,
    ) -> Result<Submission> {
        self.complete_submission_impl(submission_id, payload).await
    }

    async fn track_event(&self, event: &AnalyticsEvent) {
        self.track_event_impl(event).await
    }
}
