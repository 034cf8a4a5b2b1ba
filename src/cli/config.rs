//! `cursor-rules config` - inspect and edit the global configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::config::GlobalConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the current global configuration
    Show,
    /// Set the default username used for bare references
    SetUsername {
        /// GitHub username whose collection repo bare words resolve
        /// against
        username: String,
    },
    /// Clear the default username
    UnsetUsername,
}

impl ConfigCommand {
    /// Apply the selected configuration action.
    pub fn execute(self) -> Result<()> {
        match self.action {
            ConfigAction::Show => {
                let config = GlobalConfig::load()?;
                println!("config file: {}", GlobalConfig::path().display());
                match config.default_username {
                    Some(username) => println!("default_username = {username}"),
                    None => println!("default_username is not set"),
                }
            }
            ConfigAction::SetUsername { username } => {
                let mut config = GlobalConfig::load()?;
                config.default_username = Some(username.clone());
                config.save()?;
                println!("{} default_username = {username}", "set".green().bold());
            }
            ConfigAction::UnsetUsername => {
                let mut config = GlobalConfig::load()?;
                config.default_username = None;
                config.save()?;
                println!("{} default_username", "cleared".green().bold());
            }
        }
        Ok(())
    }
}
