//! User-decision capability for upgrades and restores.
//!
//! The upgrade engine and the restore engine both need answers from the
//! user (overwrite a locally edited file? unpin a commit? how to resolve a
//! key collision?). Those decisions are expressed as [`Prompter`] calls so
//! tests and non-interactive callers can supply deterministic
//! implementations.

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write;

/// Resolution for a key collision during restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    /// Keep the existing rule, drop the incoming one.
    Skip,
    /// Remove the existing rule and install the incoming one.
    Overwrite,
    /// Install the incoming rule under `<key>-N`.
    Rename,
}

impl ConflictChoice {
    /// Parse a CLI policy name.
    #[must_use]
    pub fn from_policy(policy: &str) -> Option<Self> {
        match policy {
            "skip" => Some(Self::Skip),
            "overwrite" => Some(Self::Overwrite),
            "rename" => Some(Self::Rename),
            _ => None,
        }
    }
}

/// Terminal decisions the core needs from the user.
pub trait Prompter: Send + Sync {
    /// May a locally modified file be overwritten by an upgrade?
    fn confirm_overwrite(&self, path: &str) -> Result<bool>;

    /// May a commit-pinned rule be unpinned to track a branch?
    fn confirm_unpin(&self, key: &str) -> Result<bool>;

    /// How should a restore handle a key that is already installed?
    fn resolve_conflict(&self, key: &str) -> Result<ConflictChoice>;
}

/// Interactive prompter reading answers from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn ask_yes_no(question: &str) -> Result<bool> {
        print!("{question} [y/N] ");
        std::io::stdout().flush().context("Failed to flush stdout")?;
        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .context("Failed to read answer")?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

impl Prompter for TerminalPrompter {
    fn confirm_overwrite(&self, path: &str) -> Result<bool> {
        println!(
            "{} {} has local modifications",
            "warning:".yellow().bold(),
            path.bold()
        );
        Self::ask_yes_no("Overwrite with the upstream version?")
    }

    fn confirm_unpin(&self, key: &str) -> Result<bool> {
        println!("{} is pinned to a specific commit", key.bold());
        Self::ask_yes_no("Unpin and track the default branch instead?")
    }

    fn resolve_conflict(&self, key: &str) -> Result<ConflictChoice> {
        loop {
            print!(
                "{} {} is already installed: [s]kip, [o]verwrite, or [r]ename? ",
                "conflict:".yellow().bold(),
                key.bold()
            );
            std::io::stdout().flush().context("Failed to flush stdout")?;
            let mut answer = String::new();
            std::io::stdin()
                .read_line(&mut answer)
                .context("Failed to read answer")?;
            match answer.trim().to_lowercase().as_str() {
                "s" | "skip" => return Ok(ConflictChoice::Skip),
                "o" | "overwrite" => return Ok(ConflictChoice::Overwrite),
                "r" | "rename" => return Ok(ConflictChoice::Rename),
                _ => println!("Please answer s, o, or r."),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_names_parse() {
        assert_eq!(ConflictChoice::from_policy("skip"), Some(ConflictChoice::Skip));
        assert_eq!(
            ConflictChoice::from_policy("overwrite"),
            Some(ConflictChoice::Overwrite)
        );
        assert_eq!(
            ConflictChoice::from_policy("rename"),
            Some(ConflictChoice::Rename)
        );
        assert_eq!(ConflictChoice::from_policy("merge"), None);
    }
}
