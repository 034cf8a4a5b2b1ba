//! Error handling for cursor-rules.
//!
//! The error system has two layers:
//! 1. [`RulesError`] - strongly typed variants for every failure mode the
//!    core can produce, so callers can match on the exact condition.
//! 2. [`ErrorContext`] - a display wrapper that adds a user-facing
//!    suggestion and optional details for the CLI edge.
//!
//! Lower layers attach context with `anyhow::Context` as errors bubble up;
//! the CLI converts whatever arrives at the top into an [`ErrorContext`]
//! via [`user_friendly_error`] before printing and exiting non-zero.
//!
//! One variant is special: [`RulesError::TemplateFound`] is not an error at
//! all but an internal control signal. The default-username fallback handler
//! raises it when a bare reference turns out to name a built-in template,
//! and the resolver intercepts it by matching on the variant (never on
//! message text) and redirects to a built-in install.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for cursor-rules operations.
///
/// Each variant carries the minimal data needed for user diagnosis. Batch
/// operations (glob installs, restores) catch per-rule errors, count them,
/// and keep going; everything else propagates to the CLI edge.
#[derive(Error, Debug)]
pub enum RulesError {
    /// A remove or upgrade named a rule key that is not in the lockfile.
    #[error("Rule '{key}' is not installed")]
    RuleNotFound {
        /// The key that was requested
        key: String,
    },

    /// The reference string is malformed or semantically invalid for the
    /// handler that matched it (for example a local path that names a
    /// directory, or a forge tree URL).
    #[error("Invalid reference '{reference}': {reason}")]
    ReferenceType {
        /// The user-supplied reference
        reference: String,
        /// Why it was rejected
        reason: String,
    },

    /// Reading, writing, or stat-ing a local file failed.
    #[error("Cannot access local file: {path}")]
    LocalFileAccess {
        /// Path that could not be accessed
        path: String,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// A network or HTTP error while talking to the forge.
    #[error("Failed to fetch '{reference}' from the forge: {reason}")]
    ForgeAccess {
        /// The reference being processed when the failure happened
        reference: String,
        /// Status line or transport error description
        reason: String,
    },

    /// The forge rejected the request due to rate limiting.
    #[error("Rate limited by the forge while fetching '{reference}'")]
    ForgeRateLimit {
        /// The reference being processed
        reference: String,
        /// When the limit resets, if the forge said so (RFC 3339 or epoch)
        reset: Option<String>,
    },

    /// Internal control signal: the fallback handler found a built-in
    /// template for a bare reference. Never shown to users.
    #[error("reference resolves to built-in template {category}/{name}")]
    TemplateFound {
        /// Template category in the registry
        category: String,
        /// Template key within the category
        name: String,
    },

    /// A lockfile relocation was requested while both candidate locations
    /// are occupied.
    #[error(
        "Lockfiles exist at both the rules directory and the project root; \
         remove one before changing the lockfile location"
    )]
    ConflictingLockfiles,

    /// A share manifest declared a format version this build cannot read.
    #[error("Unsupported share manifest format version {version} (supported: 1)")]
    UnsupportedFormat {
        /// The version the manifest declared
        version: u32,
    },

    /// Generic I/O error from [`std::io::Error`].
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (lockfile or share manifest) parse or serialize failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all with a message, for conditions that need no matching.
    #[error("{message}")]
    Other {
        /// Description of the failure
        message: String,
    },
}

impl RulesError {
    /// True when this error is the internal template-redirect signal.
    ///
    /// The resolver uses this (or a direct variant match) to distinguish
    /// the control signal from genuine failures; nothing else should.
    #[must_use]
    pub fn is_template_signal(&self) -> bool {
        matches!(self, Self::TemplateFound { .. })
    }
}

/// A user-facing wrapper around an error with an actionable suggestion.
///
/// The CLI edge turns errors into this shape so the final output has a
/// consistent `error:` / `details:` / `suggestion:` layout.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: anyhow::Error,
    /// Actionable suggestion shown to the user
    pub suggestion: Option<String>,
    /// Extra background shown under the error line
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error with no suggestion or details.
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Attach an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach background details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with color, in the standard layout.
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.error);
        if let Some(details) = &self.details {
            eprintln!("  {} {details}", "details:".yellow());
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("  {} {suggestion}", "suggestion:".green());
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, "\ndetails: {details}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nsuggestion: {suggestion}")?;
        }
        Ok(())
    }
}

/// Convert an arbitrary error into a user-friendly [`ErrorContext`].
///
/// Known [`RulesError`] variants get targeted suggestions; anything else is
/// passed through untouched so the anyhow context chain still prints.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    match error.downcast_ref::<RulesError>() {
        Some(RulesError::RuleNotFound { .. }) => ErrorContext::new(error)
            .with_suggestion("Run 'cursor-rules list' to see installed rules"),
        Some(RulesError::ReferenceType { .. }) => ErrorContext::new(error).with_suggestion(
            "References may be local paths, globs, github.com blob URLs, \
             or user/rule shorthands",
        ),
        Some(RulesError::LocalFileAccess { .. }) => {
            ErrorContext::new(error).with_suggestion("Check that the file exists and is readable")
        }
        Some(RulesError::ForgeAccess { .. }) => ErrorContext::new(error)
            .with_suggestion("Check the reference spelling and your network connection"),
        Some(RulesError::ForgeRateLimit { reset, .. }) => {
            let details = reset
                .as_ref()
                .map(|r| format!("The rate limit resets at {r}"));
            let ctx = ErrorContext::new(error)
                .with_suggestion("Wait a few minutes before retrying");
            match details {
                Some(d) => ctx.with_details(d),
                None => ctx,
            }
        }
        Some(RulesError::ConflictingLockfiles) => ErrorContext::new(error).with_details(
            "cursor-rules.lock was found in both the rules directory and the project root",
        ),
        Some(RulesError::UnsupportedFormat { .. }) => ErrorContext::new(error)
            .with_suggestion("Upgrade cursor-rules to a version that understands this manifest"),
        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_signal_is_detectable_by_variant() {
        let err = RulesError::TemplateFound {
            category: "general".to_string(),
            name: "monorepo".to_string(),
        };
        assert!(err.is_template_signal());
        assert!(!RulesError::ConflictingLockfiles.is_template_signal());
    }

    #[test]
    fn rule_not_found_gets_list_suggestion() {
        let ctx = user_friendly_error(
            RulesError::RuleNotFound {
                key: "alice/foo".to_string(),
            }
            .into(),
        );
        assert!(ctx.suggestion.unwrap().contains("cursor-rules list"));
    }

    #[test]
    fn display_includes_details_and_suggestion() {
        let ctx = ErrorContext::new(RulesError::ConflictingLockfiles)
            .with_details("two lockfiles")
            .with_suggestion("remove one");
        let rendered = format!("{ctx}");
        assert!(rendered.contains("two lockfiles"));
        assert!(rendered.contains("remove one"));
    }
}
