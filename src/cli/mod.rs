//! Command-line interface for cursor-rules.
//!
//! Each subcommand lives in its own module and is a thin shell over the
//! core: it builds an operation [`Context`], calls one core entry point,
//! and formats the result. Global flags control verbosity and project
//! selection.

mod add;
mod config;
mod list;
mod lock_location;
mod outdated;
mod remove;
mod restore;
mod share;
mod templates;
mod upgrade;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Context, GlobalConfig};
use crate::constants::{LOCKFILE_NAME, RULES_DIR_RELATIVE};
use crate::core::CancellationToken;
use crate::forge::http::HttpForgeClient;
use crate::prompt::TerminalPrompter;
use crate::templates::BuiltinTemplates;

/// Top-level CLI for the cursor-rules package manager.
#[derive(Parser)]
#[command(
    name = "cursor-rules",
    about = "Manage Cursor editor rule files",
    version,
    long_about = "cursor-rules installs, tracks, upgrades, shares, and restores \
                  editor rule files (.mdc) from local paths, GitHub URLs, and \
                  user/rule shorthands."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug) output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Project directory (defaults to the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Install one or more rules by reference
    Add(add::AddCommand),
    /// Remove an installed rule
    Remove(remove::RemoveCommand),
    /// List installed rules
    List(list::ListCommand),
    /// Upgrade installed rules from their origins
    Upgrade(upgrade::UpgradeCommand),
    /// Show rules with newer content available
    Outdated(outdated::OutdatedCommand),
    /// Export installed rules as a share manifest
    Share(share::ShareCommand),
    /// Install rules from a share manifest
    Restore(restore::RestoreCommand),
    /// Move the lockfile between its two supported locations
    LockLocation(lock_location::LockLocationCommand),
    /// List the built-in template catalog
    Templates(templates::TemplatesCommand),
    /// Inspect or edit the global configuration
    Config(config::ConfigCommand),
}

impl Cli {
    /// Whether `--verbose` was passed (consulted before logging init).
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Whether `--quiet` was passed.
    #[must_use]
    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Build the operation context shared by every subcommand.
    fn build_context(&self) -> Result<Context> {
        let project_root = match &self.project_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let rules_dir = project_root.join(RULES_DIR_RELATIVE);

        // Honor an existing project-root lockfile: if it is the only one
        // present, keep using that location.
        let use_root_lockfile =
            project_root.join(LOCKFILE_NAME).exists() && !rules_dir.join(LOCKFILE_NAME).exists();

        let config = GlobalConfig::load()?;
        Ok(Context {
            rules_dir,
            base_dir: project_root,
            use_root_lockfile,
            default_username: config.default_username,
            forge: Arc::new(HttpForgeClient::new()?),
            templates: Arc::new(BuiltinTemplates::new()),
            prompter: Arc::new(TerminalPrompter),
            cancel: CancellationToken::new(),
        })
    }

    /// Execute the selected subcommand.
    pub async fn execute(self) -> Result<()> {
        let ctx = self.build_context()?;
        let quiet = self.quiet;
        match self.command {
            Commands::Add(cmd) => cmd.execute(&ctx, quiet).await,
            Commands::Remove(cmd) => cmd.execute(&ctx),
            Commands::List(cmd) => cmd.execute(&ctx),
            Commands::Upgrade(cmd) => cmd.execute(&ctx).await,
            Commands::Outdated(cmd) => cmd.execute(&ctx).await,
            Commands::Share(cmd) => cmd.execute(&ctx),
            Commands::Restore(cmd) => cmd.execute(&ctx).await,
            Commands::LockLocation(cmd) => cmd.execute(&ctx),
            Commands::Templates(cmd) => cmd.execute(&ctx),
            Commands::Config(cmd) => cmd.execute(),
        }
    }
}
