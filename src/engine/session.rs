//! Session state store: the single source of truth for one in-progress
//! questionnaire attempt.
//!
//! The store is an explicit, constructor-injected object owned by whichever
//! host drives the flow. Lifecycle: Uninitialized -> Active -> Completed,
//! with `reset_session` returning to Uninitialized at any point. All
//! mutations happen under one lock so re-renders never observe a partial
//! update.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::model::{answers_to_submission_data, Answer, AnswerMap, Submission};
use crate::api::models::{AnalyticsEvent, CompletionPayload, SubmissionPatch};
use crate::api::PlatformApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Active,
    /// Terminal; the session is immutable once completed.
    Completed,
}

/// Result of a save attempt that did not fail at the network level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A PATCH was sent and acknowledged.
    Saved,
    /// Nothing to save: state was not dirty.
    Clean,
    /// No active session or no submission record.
    Inactive,
    /// Another save was already in flight; this attempt was skipped.
    InFlight,
    /// Could not save yet (no server id, or superseded); state stays dirty
    /// and the next tick will retry.
    Deferred,
}

#[derive(Debug)]
struct SessionState {
    status: SessionStatus,
    template_id: String,
    submission: Option<Submission>,
    current_page: u32,
    total_pages: u32,
    answers: AnswerMap,
    is_dirty: bool,
    last_saved: Option<DateTime<Utc>>,
    visited_pages: BTreeSet<u32>,
    session_start_time: Option<DateTime<Utc>>,
    autosave_enabled: bool,
    save_in_flight: bool,
    /// Bumped by completion and reset so an in-flight save that resolves
    /// afterwards cannot clobber the newer state.
    save_generation: u64,
}

impl SessionState {
    fn empty() -> Self {
        Self {
            status: SessionStatus::Uninitialized,
            template_id: String::new(),
            submission: None,
            current_page: 1,
            total_pages: 0,
            answers: AnswerMap::new(),
            is_dirty: false,
            last_saved: None,
            visited_pages: BTreeSet::new(),
            session_start_time: None,
            autosave_enabled: true,
            save_in_flight: false,
            save_generation: 0,
        }
    }

    /// Page-visitation progress proxy: round(100 * |visited| / total),
    /// clamped to [0, 100]. Deliberately not answer-completeness based.
    fn completion_percentage(&self) -> u8 {
        if self.total_pages == 0 {
            return 0;
        }
        let pct = (self.visited_pages.len() as f64 / self.total_pages as f64) * 100.0;
        pct.round().clamp(0.0, 100.0) as u8
    }

    fn time_spent_seconds(&self) -> u64 {
        self.session_start_time
            .map(|start| (Utc::now() - start).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }

    fn patch(&self) -> SubmissionPatch {
        SubmissionPatch {
            submission_data: answers_to_submission_data(&self.answers),
            completion_percentage: self.completion_percentage(),
            time_spent_seconds: self.time_spent_seconds(),
        }
    }
}

/// Serializable form of the session, used to survive a host restart within
/// the same session. The visited-page set becomes a sorted array here and is
/// rebuilt as a set on restore; timestamps round-trip as chrono values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub template_id: String,
    pub submission_token: String,
    pub submission: Option<Submission>,
    pub current_page: u32,
    pub total_pages: u32,
    pub answers: AnswerMap,
    pub visited_pages: Vec<u32>,
    pub session_start_time: DateTime<Utc>,
    pub last_saved: Option<DateTime<Utc>>,
    pub autosave_enabled: bool,
    pub saved_at: DateTime<Utc>,
}

/// One user's in-progress attempt at a template.
pub struct QuestionnaireSession {
    api: Arc<dyn PlatformApi>,
    state: Mutex<SessionState>,
}

impl QuestionnaireSession {
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self {
            api,
            state: Mutex::new(SessionState::empty()),
        }
    }

    /// Start a fresh attempt: reset state, generate a submission token and
    /// issue the create call. A failed create is tolerated; the session
    /// continues locally and later saves retry the create first.
    pub async fn initialize_session(&self, template_id: &str, total_pages: u32) -> Result<()> {
        let token = generate_submission_token();
        info!(
            "Initializing session for template {} (token {})",
            template_id, token
        );

        {
            let mut state = self.state.lock().await;
            *state = SessionState::empty();
            state.status = SessionStatus::Active;
            state.template_id = template_id.to_string();
            state.total_pages = total_pages;
            state.current_page = 1;
            state.visited_pages.insert(1);
            state.session_start_time = Some(Utc::now());
            state.submission = Some(Submission::local_shell(template_id, &token));
        }

        match self.api.create_submission(template_id, &token).await {
            Ok(created) => {
                let mut state = self.state.lock().await;
                // The session may have been reset while the call was in
                // flight; only adopt the id if this is still our attempt.
                let ours = state
                    .submission
                    .as_ref()
                    .is_some_and(|sub| sub.submission_token == token);
                if ours {
                    debug!("Submission created with id {}", created.id);
                    if let Some(sub) = state.submission.as_mut() {
                        sub.id = created.id;
                        sub.server_assigned = true;
                        sub.created_at = created.created_at.or(sub.created_at);
                    }
                }
            }
            Err(e) => {
                warn!("Submission create failed, continuing locally: {}", e);
            }
        }

        Ok(())
    }

    /// Rehydrate a previously snapshotted session.
    pub async fn restore_snapshot(&self, snapshot: SessionSnapshot) {
        let mut state = self.state.lock().await;
        *state = SessionState::empty();
        state.status = SessionStatus::Active;
        state.template_id = snapshot.template_id;
        state.submission = snapshot.submission;
        state.current_page = snapshot.current_page;
        state.total_pages = snapshot.total_pages;
        state.answers = snapshot.answers;
        state.visited_pages = snapshot.visited_pages.into_iter().collect();
        state.session_start_time = Some(snapshot.session_start_time);
        state.last_saved = snapshot.last_saved;
        state.autosave_enabled = snapshot.autosave_enabled;
        // Restored answers have not been confirmed against the server.
        state.is_dirty = true;
    }

    /// Serializable copy of the current attempt; `None` unless active.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let state = self.state.lock().await;
        if state.status != SessionStatus::Active {
            return None;
        }
        let submission_token = state
            .submission
            .as_ref()
            .map(|sub| sub.submission_token.clone())?;
        Some(SessionSnapshot {
            template_id: state.template_id.clone(),
            submission_token,
            submission: state.submission.clone(),
            current_page: state.current_page,
            total_pages: state.total_pages,
            answers: state.answers.clone(),
            visited_pages: state.visited_pages.iter().copied().collect(),
            session_start_time: state.session_start_time.unwrap_or_else(Utc::now),
            last_saved: state.last_saved,
            autosave_enabled: state.autosave_enabled,
            saved_at: Utc::now(),
        })
    }

    /// Move to a page and record the visit. Reachability policy is the
    /// caller's job via [`can_navigate_to_page`](Self::can_navigate_to_page).
    pub async fn set_current_page(&self, page: u32) {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Active {
            return;
        }
        state.current_page = page;
        state.visited_pages.insert(page);
    }

    /// Upsert an answer with a fresh timestamp and mark the session dirty.
    /// Validation is the caller's responsibility before navigation.
    pub async fn update_answer(&self, question_id: &str, value: Value) {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Active {
            return;
        }
        state.answers.insert(question_id.to_string(), Answer::new(value));
        state.is_dirty = true;
    }

    pub async fn remove_answer(&self, question_id: &str) {
        let mut state = self.state.lock().await;
        if state.status != SessionStatus::Active {
            return;
        }
        if state.answers.remove(question_id).is_some() {
            state.is_dirty = true;
        }
    }

    /// Flush dirty state to the submission record.
    ///
    /// Skips cleanly when there is nothing to do or a save is already in
    /// flight. When the submission id is still a local placeholder, the
    /// create call is retried first; a PATCH is never sent with a
    /// placeholder id. A network failure leaves the dirty flag set so the
    /// next tick retries.
    pub async fn save_progress(&self) -> Result<SaveOutcome> {
        let (mut submission_id, patch, generation, needs_create, template_id, token) = {
            let mut state = self.state.lock().await;
            if state.status != SessionStatus::Active {
                return Ok(SaveOutcome::Inactive);
            }
            if !state.is_dirty {
                return Ok(SaveOutcome::Clean);
            }
            if state.save_in_flight {
                debug!("Save already in flight, skipping");
                return Ok(SaveOutcome::InFlight);
            }
            let sub = match state.submission.as_ref() {
                Some(sub) => sub,
                None => return Ok(SaveOutcome::Inactive),
            };
            let needs_create = !sub.server_assigned;
            let captured = (
                sub.id.clone(),
                sub.template_id.clone(),
                sub.submission_token.clone(),
            );
            state.save_in_flight = true;
            (
                captured.0,
                state.patch(),
                state.save_generation,
                needs_create,
                captured.1,
                captured.2,
            )
        };

        if needs_create {
            match self.api.create_submission(&template_id, &token).await {
                Ok(created) => {
                    let mut state = self.state.lock().await;
                    if state.save_generation != generation
                        || state.status != SessionStatus::Active
                    {
                        state.save_in_flight = false;
                        return Ok(SaveOutcome::Deferred);
                    }
                    debug!("Deferred create succeeded with id {}", created.id);
                    submission_id = created.id.clone();
                    if let Some(sub) = state.submission.as_mut() {
                        sub.id = created.id;
                        sub.server_assigned = true;
                    }
                }
                Err(e) => {
                    let mut state = self.state.lock().await;
                    state.save_in_flight = false;
                    warn!("Submission create retry failed: {}", e);
                    return Ok(SaveOutcome::Deferred);
                }
            }
        }

        let result = self.api.update_submission(&submission_id, &patch).await;

        let mut state = self.state.lock().await;
        state.save_in_flight = false;
        match result {
            Ok(updated) => {
                if state.save_generation != generation || state.status != SessionStatus::Active {
                    // Completion (or a reset) won while we were in flight;
                    // discard this result rather than overwrite it.
                    debug!("Discarding superseded save result");
                    return Ok(SaveOutcome::Deferred);
                }
                state.is_dirty = false;
                state.last_saved = Some(Utc::now());
                if let Some(sub) = state.submission.as_mut() {
                    sub.completion_percentage = patch.completion_percentage;
                    sub.time_spent_seconds = patch.time_spent_seconds;
                    sub.updated_at = updated.updated_at.or(Some(Utc::now()));
                }
                debug!(
                    "Progress saved ({}%, {}s)",
                    patch.completion_percentage, patch.time_spent_seconds
                );
                Ok(SaveOutcome::Saved)
            }
            Err(e) => Err(e).context("Failed to save progress"),
        }
    }

    /// Finalize the submission. Idempotent from the caller's perspective:
    /// completing an already-completed session is a no-op. Completion takes
    /// priority over any in-flight save.
    pub async fn complete_submission(&self) -> Result<()> {
        let (submission_id, payload, template_id, needs_create, token) = {
            let mut state = self.state.lock().await;
            match state.status {
                SessionStatus::Completed => return Ok(()),
                SessionStatus::Uninitialized => {
                    anyhow::bail!("No active session to complete")
                }
                SessionStatus::Active => {}
            }
            let sub = match state.submission.as_ref() {
                Some(sub) => sub,
                None => anyhow::bail!("No submission to complete"),
            };
            let captured = (
                sub.id.clone(),
                sub.template_id.clone(),
                !sub.server_assigned,
                sub.submission_token.clone(),
            );
            // Invalidate any save currently in flight.
            state.save_generation += 1;
            (
                captured.0,
                CompletionPayload {
                    submission_data: answers_to_submission_data(&state.answers),
                    time_spent_seconds: state.time_spent_seconds(),
                },
                captured.1,
                captured.2,
                captured.3,
            )
        };

        let submission_id = if needs_create {
            let created = self
                .api
                .create_submission(&template_id, &token)
                .await
                .context("Cannot complete: submission record could not be created")?;
            let mut state = self.state.lock().await;
            if let Some(sub) = state.submission.as_mut() {
                sub.id = created.id.clone();
                sub.server_assigned = true;
            }
            created.id
        } else {
            submission_id
        };

        let completed = self
            .api
            .complete_submission(&submission_id, &payload)
            .await
            .context("Failed to complete submission")?;

        {
            let mut state = self.state.lock().await;
            state.status = SessionStatus::Completed;
            state.is_dirty = false;
            state.last_saved = Some(Utc::now());
            if let Some(sub) = state.submission.as_mut() {
                sub.is_complete = true;
                sub.completion_percentage = 100;
                sub.time_spent_seconds = payload.time_spent_seconds;
                sub.completed_at = completed.completed_at.or(Some(Utc::now()));
            }
        }
        info!("Submission {} completed", submission_id);

        // Analytics must never block or fail the completion path.
        let api = Arc::clone(&self.api);
        let event = AnalyticsEvent::submission_completed(&template_id, &submission_id);
        tokio::spawn(async move {
            api.track_event(&event).await;
        });

        Ok(())
    }

    /// Clear everything back to Uninitialized defaults.
    pub async fn reset_session(&self) {
        let mut state = self.state.lock().await;
        let generation = state.save_generation;
        *state = SessionState::empty();
        // Keep the counter moving so stale in-flight saves stay invalid.
        state.save_generation = generation + 1;
        debug!("Session reset");
    }

    // -- accessors ---------------------------------------------------------

    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.is_dirty
    }

    pub async fn current_page(&self) -> u32 {
        self.state.lock().await.current_page
    }

    pub async fn total_pages(&self) -> u32 {
        self.state.lock().await.total_pages
    }

    pub async fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.last_saved
    }

    pub async fn autosave_enabled(&self) -> bool {
        self.state.lock().await.autosave_enabled
    }

    pub async fn set_autosave_enabled(&self, enabled: bool) {
        self.state.lock().await.autosave_enabled = enabled;
    }

    pub async fn submission(&self) -> Option<Submission> {
        self.state.lock().await.submission.clone()
    }

    /// Copy of the answer map, for rendering and validation.
    pub async fn answers(&self) -> AnswerMap {
        self.state.lock().await.answers.clone()
    }

    pub async fn answer_value(&self, question_id: &str) -> Option<Value> {
        self.state
            .lock()
            .await
            .answers
            .get(question_id)
            .map(|a| a.value.clone())
    }

    /// See [`SessionState::completion_percentage`]: a page-visitation proxy.
    pub async fn completion_percentage(&self) -> u8 {
        self.state.lock().await.completion_percentage()
    }

    pub async fn time_spent_seconds(&self) -> u64 {
        self.state.lock().await.time_spent_seconds()
    }

    pub async fn can_navigate_back(&self) -> bool {
        self.state.lock().await.current_page > 1
    }

    pub async fn can_navigate_forward(&self) -> bool {
        let state = self.state.lock().await;
        state.current_page < state.total_pages
    }

    /// A page is reachable if it was already visited or is the immediate
    /// next page; skipping further ahead on first visit is not allowed.
    pub async fn can_navigate_to_page(&self, page: u32) -> bool {
        let state = self.state.lock().await;
        state.visited_pages.contains(&page) || page == state.current_page + 1
    }
}

/// Client-generated idempotency/resume key: millisecond timestamp plus a
/// random alphanumeric suffix. Uniqueness is best-effort; server-side dedup
/// is the platform's concern.
fn generate_submission_token() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_tokens_are_distinct() {
        let a = generate_submission_token();
        let b = generate_submission_token();
        assert_ne!(a, b);
        assert!(a.split('-').next().unwrap().parse::<i64>().is_ok());
    }

    #[test]
    fn test_completion_percentage_boundaries() {
        let mut state = SessionState::empty();
        state.total_pages = 5;
        state.visited_pages.insert(1);
        assert_eq!(state.completion_percentage(), 20);

        for page in 2..=5 {
            state.visited_pages.insert(page);
        }
        assert_eq!(state.completion_percentage(), 100);

        state.total_pages = 0;
        assert_eq!(state.completion_percentage(), 0);
    }

    #[test]
    fn test_completion_percentage_rounds() {
        let mut state = SessionState::empty();
        state.total_pages = 3;
        state.visited_pages.insert(1);
        // 1/3 => 33.33 => 33
        assert_eq!(state.completion_percentage(), 33);
        state.visited_pages.insert(2);
        // 2/3 => 66.67 => 67
        assert_eq!(state.completion_percentage(), 67);
    }
}
