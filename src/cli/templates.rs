//! `cursor-rules templates` - list the built-in template catalog.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::collections::BTreeMap;

use crate::config::Context;

/// Arguments for the templates command.
#[derive(Args)]
pub struct TemplatesCommand {}

impl TemplatesCommand {
    /// Print the catalog grouped by category.
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let mut by_category: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for meta in ctx.templates.list() {
            by_category
                .entry(meta.category)
                .or_default()
                .push((meta.key, meta.description));
        }

        if by_category.is_empty() {
            println!("No built-in templates available.");
            return Ok(());
        }

        for (category, mut templates) in by_category {
            println!("{}", category.bold());
            templates.sort();
            for (key, description) in templates {
                println!("  {}  {}", key.green(), description.dimmed());
            }
        }
        println!("\nInstall one with {}.", "cursor-rules add <name>".bold());
        Ok(())
    }
}
