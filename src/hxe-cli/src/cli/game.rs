//! Game file subcommands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum PatchCommand {
    /// Set the large-address-aware flag
    Laa,

    /// Apply the patch catalog
    Catalog {
        /// Group bitmask (uses the kernel configuration if not provided)
        #[arg(long)]
        mask: Option<u32>,
    },

    /// List catalog groups for the executable and their state
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore the executable from its backup
    Restore,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Detect the active profile, creating one if necessary
    Detect,

    /// List profiles
    List,

    /// Show a profile (the active one if no name is given)
    Show {
        name: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new profile
    Scaffold {
        /// Profile name, 1-11 characters
        name: String,

        /// Make it the active profile
        #[arg(long)]
        activate: bool,
    },
}

#[derive(Subcommand)]
pub enum ProgressCommand {
    /// Show the campaign position of a profile
    Show {
        /// Profile name (the active one if not provided)
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum InitCommand {
    /// Print the directives a launch would write
    Print,

    /// Write the initiation file without launching
    Write,
}
