//! Initiation file command handlers

use anyhow::{Context as _, Result};
use hxe::kernel::{directives, resolve_progress};
use hxe::{Configuration, Context, Initiation, Resolution, Variant};

use super::profile;

fn plan(ctx: &Context, resolution: Option<Resolution>) -> Result<Vec<String>> {
    let config = Configuration::load(&ctx.config_path)
        .with_context(|| format!("Failed to load {}", ctx.config_path.display()))?;
    let record = profile::open(ctx, None, resolution)?;
    let (mission, difficulty) = resolve_progress(&config, &record, Variant::from(config.mode));
    Ok(directives(&config, mission, difficulty))
}

/// Print the directives a launch would write
pub fn print(ctx: &Context, resolution: Option<Resolution>) -> Result<()> {
    for line in plan(ctx, resolution)? {
        println!("{}", line);
    }
    Ok(())
}

/// Write the initiation file
pub fn write(ctx: &Context, resolution: Option<Resolution>) -> Result<()> {
    let lines = plan(ctx, resolution)?;
    Initiation::write(&ctx.initiation_path, &lines)
        .with_context(|| format!("Failed to write {}", ctx.initiation_path.display()))?;
    println!("Wrote {} directive(s) to {}", lines.len(), ctx.initiation_path.display());
    Ok(())
}
