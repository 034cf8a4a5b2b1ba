//! `cursor-rules restore` - install rules from a share manifest.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Context;
use crate::prompt::ConflictChoice;
use crate::resolver::Resolver;
use crate::share::restore;
use crate::utils::fs::ensure_dir;

/// Arguments for the restore command.
#[derive(Args)]
pub struct RestoreCommand {
    /// Path or URL of the share manifest
    #[arg(value_name = "PATH_OR_URL")]
    source: String,

    /// Conflict policy for keys that are already installed; prompts
    /// interactively when omitted
    #[arg(long, value_name = "POLICY", value_parser = ["skip", "overwrite", "rename"])]
    on_conflict: Option<String>,
}

impl RestoreCommand {
    /// Run the restore engine and report counters.
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        ensure_dir(&ctx.rules_dir)?;
        let policy = self
            .on_conflict
            .as_deref()
            .and_then(ConflictChoice::from_policy);

        let resolver = Resolver::new();
        let report = restore::restore(ctx, &resolver, &self.source, policy).await?;

        println!(
            "{} {} installed, {} skipped, {} failed ({} processed)",
            "restore:".green().bold(),
            report.installed,
            report.skipped,
            report.failed,
            report.processed()
        );
        if report.failed > 0 {
            anyhow::bail!("{} rule(s) failed to restore", report.failed);
        }
        Ok(())
    }
}
