//! Progress command handlers

use anyhow::{Context as _, Result};
use hxe::progress::{self, ProgressRecord};
use hxe::{Configuration, Context, Resolution, Variant};

use super::profile;

/// Show the campaign position of a profile
pub fn show(ctx: &Context, name: Option<&str>, resolution: Option<Resolution>) -> Result<()> {
    let config = Configuration::load(&ctx.config_path)
        .with_context(|| format!("Failed to load {}", ctx.config_path.display()))?;
    let variant = Variant::from(config.mode);

    let record = profile::open(ctx, name, resolution)?;
    let path = record.directory().join(progress::FILE_NAME);
    let progress = ProgressRecord::open_at(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let token = progress.mission_token()?;
    let mission = progress.mission(variant)?;
    let difficulty = progress.difficulty()?;

    println!("Profile:    {}", record.name);
    println!(
        "Mission:    {} (token '{}', value {})",
        mission,
        if token.is_empty() { "-" } else { token.as_str() },
        mission.value()
    );
    println!(
        "Difficulty: {} (byte {:#04x})",
        difficulty,
        progress.difficulty_byte()?
    );
    Ok(())
}
