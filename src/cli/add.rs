//! `cursor-rules add` - install rules by reference.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Context;
use crate::resolver::{InstallOutcome, Resolver};
use crate::utils::fs::ensure_dir;

/// Arguments for the add command.
#[derive(Args)]
pub struct AddCommand {
    /// References to install: local paths, globs, github.com blob URLs,
    /// user/rule shorthands (optionally `:sha` or `@tag`), or built-in
    /// template names
    #[arg(required = true, value_name = "REF")]
    references: Vec<String>,
}

impl AddCommand {
    /// Install every reference, reporting per-reference outcomes.
    pub async fn execute(self, ctx: &Context, quiet: bool) -> Result<()> {
        ensure_dir(&ctx.rules_dir)?;
        let resolver = Resolver::new();

        let progress = if !quiet && self.references.len() > 1 {
            let bar = ProgressBar::new(self.references.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                    .expect("static progress template"),
            );
            Some(bar)
        } else {
            None
        };

        let mut failures = 0usize;
        for reference in &self.references {
            if let Some(bar) = &progress {
                bar.set_message(reference.clone());
            }
            match resolver.install(ctx, reference).await {
                Ok(outcome) => {
                    if !quiet {
                        report_outcome(reference, &outcome);
                    }
                }
                Err(error) => {
                    failures += 1;
                    eprintln!("{} {reference}: {error:#}", "error:".red().bold());
                }
            }
            if let Some(bar) = &progress {
                bar.inc(1);
            }
        }
        if let Some(bar) = progress {
            bar.finish_and_clear();
        }

        if failures > 0 {
            anyhow::bail!("{failures} of {} references failed", self.references.len());
        }
        Ok(())
    }
}

fn report_outcome(reference: &str, outcome: &InstallOutcome) {
    match outcome {
        InstallOutcome::Installed(record) => {
            println!("{} {}", "installed".green().bold(), record.key);
        }
        InstallOutcome::AlreadyInstalled { key } => {
            println!("{} {key} is already installed", "ok".green());
        }
        InstallOutcome::Drifted { key } => {
            println!(
                "{} {key} is installed but upstream differs; run 'cursor-rules upgrade {key}'",
                "notice:".yellow().bold()
            );
        }
        InstallOutcome::GlobCompleted {
            added,
            skipped,
            errored,
        } => {
            println!(
                "{} {reference}: {added} installed, {skipped} skipped, {errored} failed",
                "glob".green().bold()
            );
        }
    }
}
