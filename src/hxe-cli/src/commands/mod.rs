//! Command handlers for hxe CLI
//!
//! Each subcommand has its own module with handler functions.

pub mod configure;
pub mod init;
pub mod load;
pub mod patch;
pub mod profile;
pub mod progress;
