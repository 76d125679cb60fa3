//! Core CLI definitions

use clap::{ArgAction, Args, Parser, Subcommand};
use hxe::{Mode, Resolution};
use std::path::PathBuf;

use super::game::{InitCommand, PatchCommand, ProfileCommand, ProgressCommand};

#[derive(Parser)]
#[command(name = "hxe")]
#[command(about = "Launcher kernel for Halo: Custom Edition and SPV3", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub game: GameArgs,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the paths stored in config.toml
#[derive(Args, Debug, Clone, Default)]
pub struct GameArgs {
    /// Directory holding the game executable
    #[arg(long, global = true, env = "HXE_GAME_PATH")]
    pub game_path: Option<PathBuf>,

    /// Directory holding lastprof.txt and savegames/
    #[arg(long, global = true, env = "HXE_PROFILE_ROOT")]
    pub profile_root: Option<PathBuf>,

    /// Executable file name
    #[arg(long = "exe", global = true)]
    pub executable: Option<String>,

    /// Screen resolution to assume, e.g. 1920x1080
    #[arg(long, global = true)]
    pub resolution: Option<Resolution>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full launch sequence
    #[command(visible_alias = "l")]
    Load {
        /// Prepare everything but do not start the game
        #[arg(long)]
        no_start: bool,
    },

    /// Show or edit the kernel configuration
    #[command(visible_alias = "c")]
    Configure {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Installation mode (hce, spv3, hxe)
        #[arg(long)]
        mode: Option<Mode>,

        /// Set an option, e.g. --set video.gamma=180 (repeatable)
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Store the current --game-path, --profile-root and --exe in config.toml
        #[arg(long)]
        remember: bool,
    },

    /// Executable patching
    #[command(visible_alias = "p")]
    Patch {
        #[command(subcommand)]
        command: PatchCommand,
    },

    /// Player profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Campaign progress
    Progress {
        #[command(subcommand)]
        command: ProgressCommand,
    },

    /// Initiation file
    Init {
        #[command(subcommand)]
        command: InitCommand,
    },
}
