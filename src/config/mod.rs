//! Configuration: the global user config file and the operation context
//! threaded through every core entry point.
//!
//! The lockfile-location choice and the default username are deliberately
//! NOT module-level state; they ride on [`Context`] so concurrent tests
//! and embedders stay isolated.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::CancellationToken;
use crate::forge::ForgeClient;
use crate::lockfile::{LockLocation, LockfileStore};
use crate::prompt::Prompter;
use crate::templates::TemplateRegistry;
use crate::utils::fs::safe_write;

/// Environment variable overriding the global config path (tests).
pub const CONFIG_PATH_ENV: &str = "CURSOR_RULES_CONFIG";

/// User-wide settings stored at `~/.cursor-rules/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Username tried as a prefix when a bare reference matches nothing
    /// locally (`monorepo` -> `<default_username>/monorepo`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_username: Option<String>,
}

impl GlobalConfig {
    /// Location of the global config file, honoring the env override.
    #[must_use]
    pub fn path() -> PathBuf {
        if let Ok(custom) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(custom);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cursor-rules")
            .join("config.toml")
    }

    /// Load the global config; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        let path = Self::path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config syntax in {}", path.display()))
    }

    /// Persist the global config.
    pub fn save(&self) -> Result<()> {
        let path = Self::path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        safe_write(&path, &content)
    }
}

/// Everything a core operation needs, passed explicitly.
#[derive(Clone)]
pub struct Context {
    /// The per-project rules directory.
    pub rules_dir: PathBuf,
    /// Directory user-supplied relative references resolve against.
    pub base_dir: PathBuf,
    /// Whether the lockfile lives at the project root instead of the
    /// rules directory.
    pub use_root_lockfile: bool,
    /// Username for the bare-word fallback, if configured.
    pub default_username: Option<String>,
    /// Forge capability.
    pub forge: Arc<dyn ForgeClient>,
    /// Template catalog capability.
    pub templates: Arc<dyn TemplateRegistry>,
    /// User-decision capability.
    pub prompter: Arc<dyn Prompter>,
    /// Cancellation token observed before fetches and mutations.
    pub cancel: CancellationToken,
}

impl Context {
    /// The lockfile location implied by the flag.
    #[must_use]
    pub fn lock_location(&self) -> LockLocation {
        if self.use_root_lockfile {
            LockLocation::ProjectRoot
        } else {
            LockLocation::RulesDir
        }
    }

    /// A lockfile store for this project.
    #[must_use]
    pub fn store(&self) -> LockfileStore {
        LockfileStore::new(&self.rules_dir, self.lock_location())
    }

    /// Absolute path of a rule artifact under the rules directory.
    #[must_use]
    pub fn artifact_path(&self, entry: &str) -> PathBuf {
        let path = Path::new(entry);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.rules_dir.join(path)
        }
    }
}
