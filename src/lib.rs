//! cursor-rules - a package manager for Cursor editor rule files.
//!
//! Rules are small markdown-with-frontmatter documents (`.mdc`) installed
//! into a per-project rules directory. This crate resolves rule
//! references of many shapes (local paths, globs, GitHub blob URLs,
//! `user/rule` shorthands, built-in templates), records provenance in a
//! lockfile, and supports reproducible upgrades, sharing, and restores.
//!
//! # Architecture
//!
//! - [`reference`] - pure classification of reference strings and
//!   canonical key derivation
//! - [`resolver`] - the ordered handler registry that fetches content and
//!   commits installs under the lockfile update policy
//! - [`lockfile`] - persistent installed-rule records, legacy migration,
//!   dual-location handling, and disk synchronization
//! - [`upgrade`] - policy-driven content refresh per source type
//! - [`share`] - portable manifest export and conflict-resolving restore
//! - [`forge`] - the GitHub-compatible content/metadata capability
//! - [`templates`], [`prompt`] - pluggable capabilities for built-in
//!   content and user decisions
//! - [`cli`] - the command-line front end
//!
//! # Example
//!
//! ```bash
//! # Install a rule from a user's collection repo
//! cursor-rules add alice/react-conventions
//!
//! # Install every local rule under ./rules
//! cursor-rules add './rules/*.mdc'
//!
//! # Chase upstream changes
//! cursor-rules upgrade
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod forge;
pub mod installer;
pub mod lockfile;
pub mod models;
pub mod prompt;
pub mod reference;
pub mod resolver;
pub mod share;
pub mod templates;
pub mod upgrade;
pub mod utils;

// Available to unit tests and, via the feature, integration tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
