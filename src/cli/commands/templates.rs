use anyhow::Result;
use colored::Colorize;

use crate::api::{PlatformApi, PlatformClient};
use crate::config::AppConfig;

pub async fn run() -> Result<()> {
    let config = AppConfig::load()?;
    let client = PlatformClient::new(&config.api)?;

    let templates = client.fetch_templates().await?;
    if templates.is_empty() {
        println!("{}", "No active templates.".yellow());
        return Ok(());
    }

    for template in &templates {
        let lang = template.language.as_deref().unwrap_or("-");
        println!(
            "{}  {} [{}] ({} pages)",
            template.id.dimmed(),
            template.name.bold(),
            lang,
            template.total_pages
        );
        if let Some(description) = &template.description {
            println!("    {}", description);
        }
    }

    Ok(())
}
