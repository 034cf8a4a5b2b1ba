//! `cursor-rules lock-location` - move the lockfile between its two
//! supported locations.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Context;
use crate::lockfile::LockLocation;

/// Arguments for the lock-location command.
#[derive(Args)]
pub struct LockLocationCommand {
    /// Where the lockfile should live
    #[arg(value_name = "LOCATION", value_parser = ["rules-dir", "root"])]
    location: String,
}

impl LockLocationCommand {
    /// Relocate the lockfile. Refuses when both locations are occupied.
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let target = match self.location.as_str() {
            "root" => LockLocation::ProjectRoot,
            _ => LockLocation::RulesDir,
        };

        let mut store = ctx.store();
        store.set_location(target)?;
        println!(
            "{} lockfile now at {}",
            "moved".green().bold(),
            store.configured_path().display()
        );
        Ok(())
    }
}
