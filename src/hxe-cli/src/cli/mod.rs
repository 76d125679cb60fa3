//! CLI argument definitions for hxe
//!
//! This module contains all clap-derived structs and enums for CLI parsing.

pub mod core;
mod game;

pub use core::{Cli, Commands, GameArgs};
pub use game::{InitCommand, PatchCommand, ProfileCommand, ProgressCommand};
