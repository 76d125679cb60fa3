//! Launch sequence.
//!
//! One invocation loads the configuration, resolves the profile and the
//! campaign position, writes the initiation file, patches the executable and
//! starts it. Steps that can fall back to defaults log the failure and carry
//! on; structural errors in the records stop the launch.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::backup::{self, BackupError};
use crate::campaign::{Difficulty, Mission, Variant};
use crate::config::{ConfigError, Configuration, LoadOutcome};
use crate::host::{Resolution, ScreenResolution};
use crate::initiation::{self, encode_directives, Initiation};
use crate::patcher::{self, CatalogReport, PatchCatalog, PatchError, PatchOutcome};
use crate::process::ProcessControl;
use crate::profile::{detect_profile, ProfileError, ProfileRecord};
use crate::progress::{self, load_progress};

/// Kernel configuration file name, beside the executable
pub const CONFIG_FILE: &str = "kernel.bin";

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    #[error("Failed to start {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Paths one invocation works against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Game executable
    pub executable: PathBuf,
    /// Kernel configuration record
    pub config_path: PathBuf,
    /// Directory holding `lastprof.txt` and `savegames/`
    pub profile_root: PathBuf,
    /// Initiation file the game reads at startup
    pub initiation_path: PathBuf,
}

impl Context {
    /// Standard layout: configuration and initiation file beside the executable.
    pub fn new(executable: impl Into<PathBuf>, profile_root: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        let dir = executable
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Context {
            config_path: dir.join(CONFIG_FILE),
            initiation_path: dir.join(initiation::FILE_NAME),
            profile_root: profile_root.into(),
            executable,
        }
    }

    /// Executable file name, as matched against running processes
    pub fn image_name(&self) -> String {
        self.executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// What an invocation did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    #[serde(skip)]
    pub config_outcome: LoadOutcome,
    pub profile: String,
    pub mission: Mission,
    pub difficulty: Difficulty,
    /// Directives written to the initiation file, empty when it was kept
    pub directives: Vec<String>,
    pub laa: Option<PatchOutcome>,
    pub catalog: Option<CatalogReport>,
    pub backup_created: bool,
    pub pid: Option<u32>,
}

/// Launch sequence driver
#[derive(Debug, Clone)]
pub struct Kernel {
    catalog: PatchCatalog,
    launch: bool,
}

impl Kernel {
    /// Kernel using the bundled patch catalog
    pub fn new() -> Result<Self, KernelError> {
        Ok(Self::with_catalog(PatchCatalog::embedded()?))
    }

    pub fn with_catalog(catalog: PatchCatalog) -> Self {
        Kernel {
            catalog,
            launch: true,
        }
    }

    /// Never start the executable, whatever the configuration says.
    pub fn without_launch(mut self) -> Self {
        self.launch = false;
        self
    }

    pub fn catalog(&self) -> &PatchCatalog {
        &self.catalog
    }

    /// Run the launch sequence.
    pub fn invoke(
        &self,
        ctx: &Context,
        processes: &dyn ProcessControl,
        screen: &dyn ScreenResolution,
    ) -> Result<Invocation, KernelError> {
        let (config, outcome) = Configuration::load_with_outcome(&ctx.config_path)
            .inspect_err(|e| fatal("load_configuration", &ctx.config_path, e))?;
        if let LoadOutcome::Reset { found } = outcome {
            warn!(found, "Configuration was reset; previous settings discarded");
        }
        let variant = Variant::from(config.mode);
        info!(mode = ?config.mode, path = %ctx.executable.display(), "Kernel invoked");

        let resolution = screen.current();
        let mut profile = detect_profile(&ctx.profile_root, screen)
            .inspect_err(|e| fatal("detect_profile", &ctx.profile_root, e))?;
        profile
            .apply(&config, resolution)
            .and_then(|()| profile.save())
            .inspect_err(|e| fatal("save_profile", profile.path(), e))?;

        let (mission, difficulty) = resolve_progress(&config, &profile, variant);

        let directives = write_initiation(ctx, &config, mission, difficulty);

        let mut invocation = Invocation {
            config_outcome: outcome,
            profile: profile.name.clone(),
            mission,
            difficulty,
            directives,
            laa: None,
            catalog: None,
            backup_created: false,
            pid: None,
        };

        if config.main.patch {
            self.patch(ctx, &config, processes, &mut invocation);
        }

        if config.main.start && self.launch {
            let args = launch_args(&config, &profile, resolution);
            let pid = processes
                .spawn(&ctx.executable, &args)
                .inspect_err(|e| fatal("launch", &ctx.executable, e))
                .map_err(|source| KernelError::Launch {
                    path: ctx.executable.clone(),
                    source,
                })?;
            info!(pid, ?args, "Game started");
            invocation.pid = Some(pid);
        }

        Ok(invocation)
    }

    fn patch(
        &self,
        ctx: &Context,
        config: &Configuration,
        processes: &dyn ProcessControl,
        invocation: &mut Invocation,
    ) {
        let exe = ctx.executable.as_path();
        let killed = processes.kill(&ctx.image_name());
        if killed > 0 {
            info!(killed, "Cleared running game before patching");
        }

        match backup::smart_backup(exe) {
            Ok(created) => invocation.backup_created = created,
            Err(e) => {
                error!(path = %exe.display(), error = %e, "Backup failed, skipping patches");
                return;
            }
        }

        match patcher::apply_laa(exe) {
            Ok(outcome) => invocation.laa = Some(outcome),
            Err(e) => error!(
                operation = "laa",
                offset = patcher::LAA_OFFSET,
                error = %e,
                "Patch failed"
            ),
        }

        let catalog = self.catalog.select(config.patches);
        match patcher::apply_patch_catalog(&catalog, exe) {
            Ok(report) => invocation.catalog = Some(report),
            Err(e) => error!(operation = "catalog", error = %e, "Patch failed"),
        }

        if let Err(e) = backup::update_after_patch(exe) {
            warn!(error = %e, "Failed to record patched executable hash");
        }
    }
}

fn fatal(operation: &str, path: &Path, err: &dyn std::fmt::Display) {
    error!(operation, path = %path.display(), error = %err, "Kernel aborted");
}

/// Campaign position to resume from, falling back to the first mission.
pub fn resolve_progress(
    config: &Configuration,
    profile: &ProfileRecord,
    variant: Variant,
) -> (Mission, Difficulty) {
    let fallback = (variant.first_mission().mission, Difficulty::default());
    if !config.main.resume {
        return fallback;
    }

    let path = profile.directory().join(progress::FILE_NAME);
    match load_progress(&path, variant) {
        Ok(position) => position,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Progress unreadable, starting from the beginning"
            );
            fallback
        }
    }
}

/// Directives for a launch with `config`, HUD overrides included.
pub fn directives(config: &Configuration, mission: Mission, difficulty: Difficulty) -> Vec<String> {
    let mut lines = encode_directives(mission, difficulty, config.shaders, &config.tweaks);
    if config.main.blind {
        lines.extend(initiation::BLIND_DIRECTIVES.iter().map(|s| s.to_string()));
    }
    lines
}

fn write_initiation(
    ctx: &Context,
    config: &Configuration,
    mission: Mission,
    difficulty: Difficulty,
) -> Vec<String> {
    if !config.main.reset && ctx.initiation_path.exists() {
        info!(path = %ctx.initiation_path.display(), "Keeping existing initiation file");
        return Vec::new();
    }

    let lines = directives(config, mission, difficulty);
    if let Err(e) = Initiation::write(&ctx.initiation_path, &lines) {
        error!(
            path = %ctx.initiation_path.display(),
            error = %e,
            "Failed to write initiation file"
        );
    }
    lines
}

fn launch_args(
    config: &Configuration,
    profile: &ProfileRecord,
    screen: Option<Resolution>,
) -> Vec<String> {
    let mut args = Vec::new();
    if config.video.resolution {
        let resolution = screen.unwrap_or(profile.video.resolution);
        args.push("-vidmode".to_string());
        args.push(format!(
            "{},{},{}",
            resolution.width, resolution.height, profile.video.refresh_rate
        ));
    }
    if config.video.bless {
        args.push("-window".to_string());
    }
    args
}
