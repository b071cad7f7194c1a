use anyhow::Result;
use log::info;
use std::sync::Arc;

use crate::api::{PlatformApi, PlatformClient};
use crate::config::AppConfig;
use crate::engine::autosave::AutosaveConfig;
use crate::engine::session::QuestionnaireSession;
use crate::storage::SnapshotStore;
use crate::ui::prompts;

pub async fn run(token: Option<String>) -> Result<()> {
    let config = AppConfig::load()?;
    let store = SnapshotStore::new(config.session_dir()?)?;

    let snapshot = match token {
        Some(token) => store.load(&token)?,
        None => {
            let snapshots = store.list()?;
            if snapshots.is_empty() {
                anyhow::bail!("No resumable sessions found");
            }
            prompts::prompt_snapshot_selection(&snapshots)?.clone()
        }
    };

    let client = Arc::new(PlatformClient::new(&config.api)?);
    let template = client.fetch_template(&snapshot.template_id).await?;
    let pages = client.fetch_pages(&template.id).await?;

    info!(
        "Resuming session {} at page {}/{}",
        snapshot.submission_token, snapshot.current_page, snapshot.total_pages
    );

    let api: Arc<dyn PlatformApi> = client;
    let session = Arc::new(QuestionnaireSession::new(api));
    session.restore_snapshot(snapshot).await;

    let autosave = AutosaveConfig {
        interval: std::time::Duration::from_secs(config.autosave.interval_secs.max(1)),
        enabled: config.autosave.enabled,
    };

    crate::tui::run_questionnaire(session, template, pages, store, autosave).await
}
