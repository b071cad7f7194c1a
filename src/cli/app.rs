use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "intake-cli")]
#[command(about = "A terminal client for the patient intake questionnaire platform")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new questionnaire session
    Start {
        /// Template id; prompts for a template when omitted
        template_id: Option<String>,
    },
    /// Resume an in-progress session
    Resume {
        /// Submission token of the session; prompts when omitted
        token: Option<String>,
    },
    /// List active questionnaire templates
    Templates,
    /// Application settings management
    Config(ConfigCommands),
}

#[derive(Args)]
pub struct ConfigCommands {
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Show current settings
    Show,
    /// Print the config file path
    Path,
    /// Set a setting (api.base_url, autosave.interval_secs, autosave.enabled)
    Set {
        /// Setting name
        name: String,
        /// Setting value
        value: String,
    },
}
