//! `cursor-rules upgrade` - refresh installed rules from their origins.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Context;
use crate::upgrade::{UpgradeEngine, UpgradeOutcome};

/// Arguments for the upgrade command.
#[derive(Args)]
pub struct UpgradeCommand {
    /// Keys to upgrade; upgrades everything when omitted
    #[arg(value_name = "KEY")]
    keys: Vec<String>,
}

impl UpgradeCommand {
    /// Run the upgrade engine and summarize the outcomes.
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        let engine = UpgradeEngine::new();
        let keys = if self.keys.is_empty() {
            None
        } else {
            Some(self.keys.as_slice())
        };
        let report = engine.upgrade_all(ctx, keys).await?;

        for (key, outcome) in &report.outcomes {
            match outcome {
                UpgradeOutcome::Upgraded { new_commit, .. } => {
                    let suffix = new_commit
                        .as_deref()
                        .map(|c| format!(" ({})", &c[..c.len().min(8)]))
                        .unwrap_or_default();
                    println!("{} {key}{suffix}", "upgraded".green().bold());
                }
                UpgradeOutcome::UpToDate { .. } => {
                    println!("{} {key} is up to date", "ok".green());
                }
                UpgradeOutcome::SkippedLocal { .. } => {
                    println!(
                        "{} {key} is a local rule; re-add the source file to refresh it",
                        "notice:".yellow()
                    );
                }
                UpgradeOutcome::Cancelled { .. } => {
                    println!("{} {key}: upgrade cancelled", "notice:".yellow());
                }
            }
        }
        for (key, error) in &report.failures {
            eprintln!("{} {key}: {error}", "error:".red().bold());
        }

        if report.aborted {
            println!("{}", "Upgrade aborted; remaining rules untouched.".yellow());
        }
        if !report.failures.is_empty() {
            anyhow::bail!("{} rule(s) failed to upgrade", report.failures.len());
        }
        Ok(())
    }
}
