use anyhow::Result;
use colored::Colorize;

use crate::cli::app::ConfigSubcommands;
use crate::config::AppConfig;

pub async fn run(command: ConfigSubcommands) -> Result<()> {
    match command {
        ConfigSubcommands::Show => show(),
        ConfigSubcommands::Path => {
            println!("{}", AppConfig::config_path()?.display());
            Ok(())
        }
        ConfigSubcommands::Set { name, value } => set(&name, &value),
    }
}

fn show() -> Result<()> {
    let config = AppConfig::load()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn set(name: &str, value: &str) -> Result<()> {
    let mut config = AppConfig::load()?;

    match name {
        "api.base_url" => config.api.base_url = value.to_string(),
        "api.request_timeout_secs" => config.api.request_timeout_secs = value.parse()?,
        "api.connect_timeout_secs" => config.api.connect_timeout_secs = value.parse()?,
        "autosave.enabled" => config.autosave.enabled = value.parse()?,
        "autosave.interval_secs" => config.autosave.interval_secs = value.parse()?,
        "session.dir" => config.session.dir = Some(value.into()),
        other => anyhow::bail!("Unknown setting '{}'", other),
    }

    config.save()?;
    println!("{} {} = {}", "Set".green(), name, value);
    Ok(())
}
