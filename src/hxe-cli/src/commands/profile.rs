//! Profile command handlers

use anyhow::{bail, Context as _, Result};
use hxe::profile::{self, lastprof, LastProfile, BLAM};
use hxe::{Context, FixedResolution, ProfileRecord, Resolution};

/// Open profile `name`, or the active one when `name` is None
pub fn open(
    ctx: &Context,
    name: Option<&str>,
    resolution: Option<Resolution>,
) -> Result<ProfileRecord> {
    match name {
        Some(name) => {
            let path = profile::profile_dir(&ctx.profile_root, name).join(BLAM);
            ProfileRecord::open_at(&path)
                .with_context(|| format!("Failed to open profile '{}'", name))
        }
        None => profile::detect_profile(&ctx.profile_root, &FixedResolution(resolution))
            .context("Failed to detect profile"),
    }
}

/// Detect the active profile
pub fn detect(ctx: &Context, resolution: Option<Resolution>) -> Result<()> {
    let record = open(ctx, None, resolution)?;
    println!("{}", record.name);
    println!("  {}", record.directory().display());
    Ok(())
}

/// List profiles, marking the active one
pub fn list(ctx: &Context) -> Result<()> {
    let names = profile::list_profiles(&ctx.profile_root)?;
    if names.is_empty() {
        println!("No profiles under {}", ctx.profile_root.display());
        return Ok(());
    }

    let active = LastProfile::open_at(ctx.profile_root.join(lastprof::FILE_NAME))
        .ok()
        .map(|p| p.name().to_string());
    for name in names {
        let mark = if active.as_deref() == Some(name.as_str()) { "*" } else { " " };
        println!("{} {}", mark, name);
    }
    Ok(())
}

/// Show profile settings
pub fn show(
    ctx: &Context,
    name: Option<&str>,
    json: bool,
    resolution: Option<Resolution>,
) -> Result<()> {
    let record = open(ctx, name, resolution)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("Profile:     {}", record.name);
    println!("Path:        {}", record.path().display());
    println!(
        "Video:       {} @ {} Hz, gamma {}",
        record.video.resolution, record.video.refresh_rate, record.video.gamma
    );
    println!(
        "Audio:       master {}, effects {}, music {}",
        record.audio.master, record.audio.effects, record.audio.music
    );
    println!(
        "Network:     server port {}, client port {}",
        record.network.server_port, record.network.client_port
    );
    println!("Bindings:    {} bound", record.bindings.bound().count());
    Ok(())
}

/// Create a new profile
pub fn scaffold(
    ctx: &Context,
    name: &str,
    resolution: Option<Resolution>,
    activate: bool,
) -> Result<()> {
    if profile::profile_dir(&ctx.profile_root, name).join(BLAM).exists() {
        bail!("Profile '{}' already exists", name);
    }

    let record = profile::scaffold(&ctx.profile_root, name, resolution)
        .with_context(|| format!("Failed to create profile '{}'", name))?;
    println!("Created {}", record.directory().display());

    if activate {
        LastProfile::write(ctx.profile_root.join(lastprof::FILE_NAME), record.directory())?;
        println!("'{}' is now the active profile", name);
    }
    Ok(())
}
