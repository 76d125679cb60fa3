//! Configuration management for hxe CLI

use anyhow::{Context as _, Result};
use hxe::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::GameArgs;

/// Executable launched when none is configured
pub const DEFAULT_EXECUTABLE: &str = "haloce.exe";

#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the game executable
    pub game_path: Option<PathBuf>,
    /// Directory holding lastprof.txt and savegames/
    pub profile_root: Option<PathBuf>,
    /// Executable file name
    pub executable: Option<String>,
}

impl Config {
    /// Directory holding config.toml and the log file
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("hxe"))
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Take every path given on the command line
    pub fn remember(&mut self, args: &GameArgs) {
        if let Some(path) = &args.game_path {
            self.game_path = Some(path.clone());
        }
        if let Some(root) = &args.profile_root {
            self.profile_root = Some(root.clone());
        }
        if let Some(exe) = &args.executable {
            self.executable = Some(exe.clone());
        }
    }

    /// Kernel context from command-line overrides, then this config, then defaults.
    pub fn context(&self, args: &GameArgs) -> Result<Context> {
        let game_path = match args.game_path.as_ref().or(self.game_path.as_ref()) {
            Some(path) => path.clone(),
            None => std::env::current_dir().context("Could not determine current directory")?,
        };

        let executable = args
            .executable
            .as_deref()
            .or(self.executable.as_deref())
            .unwrap_or(DEFAULT_EXECUTABLE);

        let profile_root = args
            .profile_root
            .clone()
            .or_else(|| self.profile_root.clone())
            .or_else(default_profile_root)
            .context("No profile root configured; pass --profile-root")?;

        Ok(Context::new(game_path.join(executable), profile_root))
    }
}

/// `Documents/My Games/Halo CE`
fn default_profile_root() -> Option<PathBuf> {
    dirs::document_dir().map(|d| d.join("My Games").join("Halo CE"))
}
