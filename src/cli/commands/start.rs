use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;

use crate::api::{PlatformApi, PlatformClient};
use crate::config::AppConfig;
use crate::engine::autosave::AutosaveConfig;
use crate::engine::session::QuestionnaireSession;
use crate::storage::SnapshotStore;
use crate::ui::prompts;

pub async fn run(template_id: Option<String>) -> Result<()> {
    let config = AppConfig::load()?;
    let client = Arc::new(PlatformClient::new(&config.api)?);

    let template = match template_id {
        Some(id) => client.fetch_template(&id).await?,
        None => {
            let templates = client.fetch_templates().await?;
            if templates.is_empty() {
                anyhow::bail!("No active templates available");
            }
            prompts::prompt_template_selection(&templates)?.clone()
        }
    };

    let pages = client.fetch_pages(&template.id).await?;
    if pages.is_empty() {
        anyhow::bail!("Template '{}' has no pages", template.name);
    }

    let total_pages = pages.len() as u32;
    if template.total_pages != total_pages {
        warn!(
            "Template {} declares {} pages but the catalog returned {}",
            template.id, template.total_pages, total_pages
        );
    }

    let store = SnapshotStore::new(config.session_dir()?)?;
    let resumable = store
        .list()?
        .iter()
        .filter(|s| s.template_id == template.id)
        .count();
    if resumable > 0 {
        let proceed = prompts::prompt_confirmation(
            &format!(
                "You have {} in-progress session(s) for this questionnaire \
                 (resume with `intake-cli resume`). Start a new one anyway?",
                resumable
            ),
            false,
        )?;
        if !proceed {
            return Ok(());
        }
    }

    let api: Arc<dyn PlatformApi> = client;
    let session = Arc::new(QuestionnaireSession::new(api));
    session.initialize_session(&template.id, total_pages).await?;
    info!("Started session for template {}", template.id);
    let autosave = AutosaveConfig {
        interval: std::time::Duration::from_secs(config.autosave.interval_secs.max(1)),
        enabled: config.autosave.enabled,
    };

    crate::tui::run_questionnaire(session, template, pages, store, autosave).await
}
