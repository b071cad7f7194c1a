//! Autosave coordination: time-driven and event-driven flushing of dirty
//! session state.
//!
//! The coordinator owns a cancellable tokio task; the tick logic itself is
//! a plain async function so tests can drive it with no real timer.

use anyhow::Result;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::session::{QuestionnaireSession, SaveOutcome, SessionStatus};

pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AutosaveConfig {
    pub interval: Duration,
    pub enabled: bool,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_AUTOSAVE_INTERVAL,
            enabled: true,
        }
    }
}

impl AutosaveConfig {
    pub fn with_interval_secs(secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(secs.max(1)),
            enabled: true,
        }
    }
}

/// Periodic background saver for one session.
pub struct AutosaveCoordinator {
    session: Arc<QuestionnaireSession>,
    config: AutosaveConfig,
    task: Option<JoinHandle<()>>,
}

impl AutosaveCoordinator {
    pub fn new(session: Arc<QuestionnaireSession>, config: AutosaveConfig) -> Self {
        Self {
            session,
            config,
            task: None,
        }
    }

    /// Start the periodic timer. Restarting replaces the previous task.
    pub fn start(&mut self) {
        self.stop();
        if !self.config.enabled {
            debug!("Autosave disabled by configuration");
            return;
        }

        let session = Arc::clone(&self.session);
        let interval = self.config.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick of tokio's interval fires immediately; there is
            // nothing to save yet at that point.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                Self::tick(&session).await;
            }
        }));
        debug!("Autosave started (every {:?})", interval);
    }

    /// Cancel the timer task. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Autosave stopped");
        }
    }

    /// One autosave attempt. Saves only when the session is active, autosave
    /// is enabled and state is dirty; skips when a save is already in
    /// flight. Failures are logged and retried on the next tick, never
    /// propagated.
    pub async fn tick(session: &QuestionnaireSession) -> SaveOutcome {
        if session.status().await != SessionStatus::Active {
            return SaveOutcome::Inactive;
        }
        if !session.autosave_enabled().await {
            return SaveOutcome::Clean;
        }
        match session.save_progress().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Autosave failed, will retry on next tick: {}", e);
                SaveOutcome::Deferred
            }
        }
    }

    /// Explicit user-triggered save; surfaces failures to the caller so the
    /// UI can show feedback.
    pub async fn save_now(&self) -> Result<SaveOutcome> {
        self.session.save_progress().await
    }

    /// Best-effort flush for the host's teardown path (quit, unmount).
    /// Returns true when no unsaved work remains, so the caller knows
    /// whether to warn the user before leaving.
    pub async fn flush_on_teardown(&self) -> bool {
        if self.session.status().await != SessionStatus::Active {
            return true;
        }
        if !self.session.is_dirty().await {
            return true;
        }
        match self.session.save_progress().await {
            Ok(SaveOutcome::Saved) | Ok(SaveOutcome::Clean) => true,
            Ok(outcome) => {
                warn!("Teardown flush did not persist ({:?})", outcome);
                !self.session.is_dirty().await
            }
            Err(e) => {
                warn!("Teardown flush failed: {}", e);
                false
            }
        }
    }
}

impl Drop for AutosaveCoordinator {
    fn drop(&mut self) {
        // Timers must not leak past the hosting component.
        self.stop();
    }
}
