//! Executable patch command handlers

use anyhow::{bail, Context as _, Result};
use hxe::backup;
use hxe::patcher::{self, GroupState};
use hxe::{Configuration, Context, PatchCatalog, PatchError, PatchOutcome};
use std::path::Path;

/// Turn a patch error into a message that tells the user what to do
fn explain(err: PatchError, exe: &Path) -> anyhow::Error {
    match err {
        PatchError::SharingViolation { path } => {
            anyhow::anyhow!("{} is in use by another process; close it and retry", path.display())
        }
        other => anyhow::Error::new(other).context(format!("Failed to patch {}", exe.display())),
    }
}

fn backup_first(exe: &Path) -> Result<()> {
    if backup::smart_backup(exe).context("Failed to back up executable")? {
        let (backup_path, _) = backup::backup_paths(exe);
        println!("Backup created: {}", backup_path.display());
    }
    Ok(())
}

/// Set the large-address-aware flag
pub fn laa(ctx: &Context) -> Result<()> {
    let exe = ctx.executable.as_path();
    backup_first(exe)?;

    match patcher::apply_laa(exe).map_err(|e| explain(e, exe))? {
        PatchOutcome::Applied => println!("Applied LAA patch to {}", exe.display()),
        PatchOutcome::AlreadyPatched => println!("{} is already patched", exe.display()),
    }

    backup::update_after_patch(exe).context("Failed to update backup metadata")?;
    Ok(())
}

fn selected_catalog(ctx: &Context, mask: Option<u32>) -> Result<PatchCatalog> {
    let mask = match mask {
        Some(mask) => mask,
        None => {
            Configuration::load(&ctx.config_path)
                .with_context(|| format!("Failed to load {}", ctx.config_path.display()))?
                .patches
        }
    };
    Ok(PatchCatalog::embedded()?.select(mask))
}

/// Apply the patch catalog
pub fn catalog(ctx: &Context, mask: Option<u32>) -> Result<()> {
    let exe = ctx.executable.as_path();
    let catalog = selected_catalog(ctx, mask)?;
    if catalog.for_executable(exe).next().is_none() {
        bail!("No catalog patches target {}", exe.display());
    }

    backup_first(exe)?;
    let report = patcher::apply_patch_catalog(&catalog, exe).map_err(|e| explain(e, exe))?;
    backup::update_after_patch(exe).context("Failed to update backup metadata")?;

    println!(
        "{} group(s): {} byte(s) written, {} unchanged",
        report.groups, report.written, report.unchanged
    );
    if report.skipped > 0 {
        println!(
            "{} group(s) skipped: executable bytes not recognised (see `hxe patch list`)",
            report.skipped
        );
    }
    Ok(())
}

/// List catalog groups and their state in the executable
pub fn list(ctx: &Context, json: bool) -> Result<()> {
    let exe = ctx.executable.as_path();
    let catalog = selected_catalog(ctx, None)?;
    let states = patcher::inspect_catalog(&catalog, exe).map_err(|e| explain(e, exe))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    if states.is_empty() {
        println!("No catalog patches target {}", exe.display());
        return Ok(());
    }

    for status in &states {
        let mark = if status.enabled { "x" } else { " " };
        let note = if status.state == GroupState::Unknown {
            " (bytes not recognised)"
        } else {
            ""
        };
        println!(
            "[{}] {:>2}  {:<32} {}{}",
            mark, status.index, status.name, status.state, note
        );
    }
    Ok(())
}

/// Restore the executable from its backup
pub fn restore(ctx: &Context) -> Result<()> {
    let exe = ctx.executable.as_path();
    backup::restore_backup(exe).with_context(|| format!("Failed to restore {}", exe.display()))?;
    println!("Restored {}", exe.display());
    Ok(())
}
