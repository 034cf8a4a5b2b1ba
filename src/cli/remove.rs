//! `cursor-rules remove` - uninstall a rule by key.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Context;
use crate::core::RulesError;
use crate::resolver::Resolver;

/// Arguments for the remove command.
#[derive(Args)]
pub struct RemoveCommand {
    /// Key of the installed rule (as shown by `cursor-rules list`)
    #[arg(value_name = "KEY")]
    key: String,
}

impl RemoveCommand {
    /// Remove the rule, suggesting close matches for unknown keys.
    pub fn execute(self, ctx: &Context) -> Result<()> {
        let resolver = Resolver::new();
        match resolver.remove(ctx, &self.key) {
            Ok(record) => {
                println!("{} {}", "removed".green().bold(), record.key);
                Ok(())
            }
            Err(error) => {
                if matches!(
                    error.downcast_ref::<RulesError>(),
                    Some(RulesError::RuleNotFound { .. })
                ) {
                    if let Some(suggestion) = closest_key(ctx, &self.key)? {
                        eprintln!(
                            "{} rule '{}' is not installed; did you mean '{}'?",
                            "error:".red().bold(),
                            self.key,
                            suggestion.bold()
                        );
                        std::process::exit(1);
                    }
                }
                Err(error)
            }
        }
    }
}

/// The closest installed key by normalized Levenshtein similarity.
fn closest_key(ctx: &Context, wanted: &str) -> Result<Option<String>> {
    let lockfile = ctx.store().load()?;
    let best = lockfile
        .keys()
        .into_iter()
        .map(|key| {
            let score = strsim::normalized_levenshtein(wanted, &key);
            (key, score)
        })
        .filter(|(_, score)| *score >= 0.6)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key);
    Ok(best)
}
