//! `cursor-rules share` - export installed rules as a portable manifest.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::Context;
use crate::share;

/// Arguments for the share command.
#[derive(Args)]
pub struct ShareCommand {
    /// Embed the bytes of local rules so they restore anywhere
    #[arg(long)]
    embed: bool,

    /// Output file (defaults to cursor-rules-share.json)
    #[arg(short, long, value_name = "FILE", default_value = "cursor-rules-share.json")]
    output: PathBuf,
}

impl ShareCommand {
    /// Export the manifest and print a human summary.
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let (manifest, summary) = share::export(ctx, self.embed)?;
        share::write_manifest(&self.output, &manifest)?;

        println!(
            "{} {} rule{} to {}",
            "shared".green().bold(),
            manifest.rules.len(),
            if manifest.rules.len() == 1 { "" } else { "s" },
            self.output.display()
        );
        for (label, count) in &summary.by_source {
            println!("  {label}: {count}");
        }
        if summary.embedded > 0 {
            println!("  {} with embedded content", summary.embedded);
        }
        if summary.unshareable > 0 {
            println!(
                "  {} {} not shareable (local rules; use --embed)",
                summary.unshareable,
                "warning:".yellow()
            );
        }
        Ok(())
    }
}
