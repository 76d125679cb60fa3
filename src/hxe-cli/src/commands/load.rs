//! Launch command handler

use anyhow::{bail, Context as _, Result};
use hxe::{
    Context, FixedResolution, Kernel, KernelError, LoadOutcome, PatchError, Resolution,
    SystemProcesses,
};

/// Run the launch sequence
pub fn handle(ctx: &Context, resolution: Option<Resolution>, no_start: bool) -> Result<()> {
    if !ctx.executable.is_file() {
        bail!(
            "Game executable not found at {} (set it with --game-path/--exe)",
            ctx.executable.display()
        );
    }

    let mut kernel = Kernel::new().context("Failed to load the patch catalog")?;
    if no_start {
        kernel = kernel.without_launch();
    }

    let run = match kernel.invoke(ctx, &SystemProcesses, &FixedResolution(resolution)) {
        Ok(run) => run,
        Err(KernelError::Patch(PatchError::SharingViolation { path })) => {
            bail!("{} is in use by another process; close it and retry", path.display())
        }
        Err(e) => return Err(e).context("Launch failed"),
    };

    if let LoadOutcome::Reset { found } = run.config_outcome {
        println!(
            "Warning: configuration version {} was not understood and has been reset",
            found
        );
    }

    println!("Profile:    {}", run.profile);
    println!("Mission:    {}", run.mission);
    println!("Difficulty: {}", run.difficulty);
    if let Some(laa) = run.laa {
        println!("LAA:        {:?}", laa);
    }
    if let Some(report) = run.catalog {
        println!(
            "Patches:    {} group(s), {} byte(s) written, {} skipped",
            report.groups, report.written, report.skipped
        );
    }
    match run.pid {
        Some(pid) => println!("Started {} (pid {})", ctx.executable.display(), pid),
        None => println!("Game not started"),
    }

    Ok(())
}
