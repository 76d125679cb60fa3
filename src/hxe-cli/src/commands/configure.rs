//! Configuration command handlers
//!
//! Handles the `configure` subcommand: the kernel configuration record
//! beside the executable, and the CLI's own config.toml.

use anyhow::{Context as _, Result};
use hxe::{Configuration, Context, LoadOutcome, Mode};

use crate::cli::GameArgs;
use crate::config::Config;

/// Handle the configure command
///
/// # Arguments
/// * `mode` - Installation mode to store
/// * `set` - `key=value` option assignments
/// * `remember` - Persist the path arguments to config.toml
/// * `show` - If true, show current configuration
pub fn handle(
    ctx: &Context,
    args: &GameArgs,
    show: bool,
    mode: Option<Mode>,
    set: &[String],
    remember: bool,
) -> Result<()> {
    let (mut config, outcome) = Configuration::load_with_outcome(&ctx.config_path)
        .with_context(|| format!("Failed to load {}", ctx.config_path.display()))?;
    if let LoadOutcome::Reset { found } = outcome {
        println!("Configuration version {} was reset to defaults", found);
    }

    let changed = apply_changes(&mut config, mode, set)?;
    if changed {
        config
            .save(&ctx.config_path)
            .with_context(|| format!("Failed to save {}", ctx.config_path.display()))?;
        println!("Configuration saved to {}", ctx.config_path.display());
    }

    if remember {
        let mut cli_config = Config::load()?;
        cli_config.remember(args);
        cli_config.save()?;
        if let Ok(path) = Config::config_path() {
            println!("Paths saved to: {}", path.display());
        }
    }

    if show || (!changed && !remember) {
        show_config(ctx, &config)?;
    }

    Ok(())
}

/// Apply `--mode` and every `--set`. Returns true if anything was given.
fn apply_changes(config: &mut Configuration, mode: Option<Mode>, set: &[String]) -> Result<bool> {
    if let Some(mode) = mode {
        config.mode = mode;
    }

    for assignment in set {
        let (key, value) = assignment
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{}'", assignment))?;
        config.set_option(key.trim(), value.trim())?;
    }

    Ok(mode.is_some() || !set.is_empty())
}

/// Display current configuration
fn show_config(ctx: &Context, config: &Configuration) -> Result<()> {
    println!("Executable:   {}", ctx.executable.display());
    println!("Profile root: {}", ctx.profile_root.display());
    println!("Kernel file:  {}", ctx.config_path.display());
    if let Ok(path) = Config::config_path() {
        println!("Config file:  {}", path.display());
    }
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(config).context("Failed to format configuration")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_changes() {
        let mut config = Configuration::default();
        let set = vec!["video.gamma = 180".to_string(), "main.start=false".to_string()];

        assert!(apply_changes(&mut config, Some(Mode::Spv3), &set).unwrap());
        assert_eq!(config.mode, Mode::Spv3);
        assert_eq!(config.video.gamma, 180);
        assert!(!config.main.start);
    }

    #[test]
    fn test_apply_changes_rejects_bad_input() {
        let mut config = Configuration::default();
        assert!(apply_changes(&mut config, None, &["video.gamma".to_string()]).is_err());
        assert!(apply_changes(&mut config, None, &["nope=1".to_string()]).is_err());
        assert!(!apply_changes(&mut config, None, &[]).unwrap());
    }

    #[test]
    fn test_configuration_formats_as_json() {
        let value = serde_json::to_value(Configuration::default()).unwrap();
        assert_eq!(value["mode"], "Hce");
        assert_eq!(value["main"]["reset"], true);
        assert_eq!(value["shaders"], 0);
    }
}
