use anyhow::Result;
use dialoguer::Select;

use crate::engine::model::Template;
use crate::engine::session::SessionSnapshot;

/// Interactive confirmation prompt using arrow-key navigable selection
pub fn prompt_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    let items = vec!["Yes", "No"];
    let default_index = if default_yes { 0 } else { 1 };

    let selection = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(default_index)
        .interact()?;

    Ok(selection == 0)
}

/// Pick a template from the active catalog list.
pub fn prompt_template_selection(templates: &[Template]) -> Result<&Template> {
    let items: Vec<String> = templates
        .iter()
        .map(|t| match &t.language {
            Some(lang) => format!("{} [{}] ({} pages)", t.name, lang, t.total_pages),
            None => format!("{} ({} pages)", t.name, t.total_pages),
        })
        .collect();

    let selection = Select::new()
        .with_prompt("Select questionnaire")
        .items(&items)
        .interact()?;

    Ok(&templates[selection])
}

/// Pick an in-progress session to resume.
pub fn prompt_snapshot_selection(snapshots: &[SessionSnapshot]) -> Result<&SessionSnapshot> {
    let items: Vec<String> = snapshots
        .iter()
        .map(|s| {
            format!(
                "{} (page {}/{}, saved {})",
                s.submission_token,
                s.current_page,
                s.total_pages,
                s.saved_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect();

    let selection = Select::new()
        .with_prompt("Resume which session?")
        .items(&items)
        .interact()?;

    Ok(&snapshots[selection])
}
