//! # hxe
//!
//! Launcher kernel for Halo: Custom Edition and SPV3.
//!
//! This library provides functionality to:
//! - Load and save the kernel configuration record
//! - Detect, scaffold and update player profiles (`blam.sav`)
//! - Read campaign progress (`savegame.bin`) and turn it into initiation directives
//! - Patch the game executable in place (large-address-aware flag, patch catalog)
//!
//! ## Example
//!
//! ```no_run
//! use hxe::{Context, FixedResolution, Kernel, SystemProcesses};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = Context::new("C:/Games/Halo/haloce.exe", "C:/Users/me/Documents/My Games/Halo CE");
//! let kernel = Kernel::new()?;
//! let run = kernel.invoke(&ctx, &SystemProcesses, &FixedResolution(None))?;
//! println!("Resuming {} on {}", run.mission, run.difficulty);
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod campaign;
pub mod config;
pub mod host;
pub mod initiation;
pub mod kernel;
pub mod layout;
pub mod patcher;
pub mod process;
pub mod profile;
pub mod progress;

// Re-export commonly used items
#[doc(inline)]
pub use backup::{smart_backup, BackupError};
#[doc(inline)]
pub use campaign::{raw_token, symbolic_difficulty, symbolic_mission, Difficulty, Mission, Variant};
#[doc(inline)]
pub use config::{ConfigError, Configuration, LoadOutcome, Mode, Shaders};
#[doc(inline)]
pub use host::{FixedResolution, Resolution, ScreenResolution};
#[doc(inline)]
pub use initiation::{encode_directives, Initiation};
#[doc(inline)]
pub use kernel::{Context, Invocation, Kernel, KernelError};
#[doc(inline)]
pub use layout::{Blob, LayoutError};
#[doc(inline)]
pub use patcher::{
    apply_patch_catalog, apply_single_flag, DataSet, PatchCatalog, PatchError, PatchGroup,
    PatchOutcome,
};
#[doc(inline)]
pub use process::{ProcessControl, SystemProcesses};
#[doc(inline)]
pub use profile::{detect_profile, ProfileError, ProfileRecord};
#[doc(inline)]
pub use progress::{load_progress, ProgressError};
