//! `cursor-rules list` - show installed rules, grouped by source type.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::collections::BTreeMap;

use crate::config::Context;
use crate::models::RuleRecord;

/// Arguments for the list command.
#[derive(Args)]
pub struct ListCommand {
    /// Skip reconciling the lockfile with files on disk first
    #[arg(long)]
    no_sync: bool,
}

impl ListCommand {
    /// Print the installed rules, syncing with disk first so manually
    /// added or deleted files show up correctly.
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let store = ctx.store();
        let mut lockfile = store.load()?;
        if !self.no_sync && store.sync_with_disk(&mut lockfile)? {
            store.save(&mut lockfile)?;
        }

        if lockfile.rules.is_empty() {
            println!("No rules installed. Add one with 'cursor-rules add <ref>'.");
            return Ok(());
        }

        let mut groups: BTreeMap<&'static str, Vec<&RuleRecord>> = BTreeMap::new();
        for record in &lockfile.rules {
            groups.entry(record.source_type.label()).or_default().push(record);
        }

        for (label, records) in groups {
            println!("{} ({})", label.bold(), records.len());
            for record in records {
                let mut line = format!("  {}", record.key.green());
                if let Some(git_ref) = &record.git_ref {
                    line.push_str(&format!("  [{git_ref}]"));
                }
                if let Some(commit) = &record.resolved_commit {
                    let short = &commit[..commit.len().min(8)];
                    line.push_str(&format!("  {}", short.dimmed()));
                }
                println!("{line}");
            }
        }
        println!(
            "\n{} rule{} installed",
            lockfile.rules.len(),
            if lockfile.rules.len() == 1 { "" } else { "s" }
        );
        Ok(())
    }
}
