//! `cursor-rules outdated` - report rules with newer content available,
//! without changing anything.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Context;
use crate::upgrade::UpgradeEngine;

/// Arguments for the outdated command.
#[derive(Args)]
pub struct OutdatedCommand {}

impl OutdatedCommand {
    /// Run the dry-run check and print what an upgrade would touch.
    pub async fn execute(self, ctx: &Context) -> Result<()> {
        let report = UpgradeEngine::new().check_outdated(ctx).await?;

        if report.outdated.is_empty() {
            println!("All rules are up to date.");
        } else {
            for rule in &report.outdated {
                let current = rule
                    .current
                    .as_deref()
                    .map(|c| c[..c.len().min(8)].to_string())
                    .unwrap_or_else(|| "-".to_string());
                match &rule.latest {
                    Some(latest) => println!(
                        "{} {}  {} -> {}",
                        "outdated".yellow().bold(),
                        rule.key,
                        current.dimmed(),
                        &latest[..latest.len().min(8)]
                    ),
                    None => println!(
                        "{} {}  (built-in content changed)",
                        "outdated".yellow().bold(),
                        rule.key
                    ),
                }
            }
            println!(
                "\nRun {} to apply.",
                "cursor-rules upgrade".bold()
            );
        }
        if report.failed > 0 {
            eprintln!(
                "{} {} rule(s) could not be checked",
                "warning:".yellow(),
                report.failed
            );
        }
        Ok(())
    }
}
