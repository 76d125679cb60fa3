mod cli;
mod commands;
mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = Config::config_dir().ok().map(|d| d.join(logging::LOG_FILE));
    logging::init_logging(cli.verbose, log_file.as_deref())
        .context("Failed to initialize logging")?;

    run(cli).inspect_err(|e| tracing::error!(error = %format!("{e:#}"), "Command failed"))
}

fn run(cli: Cli) -> Result<()> {
    let settings = Config::load()?;
    let ctx = settings.context(&cli.game)?;
    let resolution = cli.game.resolution;
    tracing::debug!(
        executable = %ctx.executable.display(),
        profile_root = %ctx.profile_root.display(),
        "Context resolved"
    );

    match cli.command {
        Commands::Load { no_start } => {
            commands::load::handle(&ctx, resolution, no_start)?;
        }

        Commands::Configure {
            show,
            mode,
            set,
            remember,
        } => {
            commands::configure::handle(&ctx, &cli.game, show, mode, &set, remember)?;
        }

        Commands::Patch { command } => match command {
            PatchCommand::Laa => commands::patch::laa(&ctx)?,
            PatchCommand::Catalog { mask } => commands::patch::catalog(&ctx, mask)?,
            PatchCommand::List { json } => commands::patch::list(&ctx, json)?,
            PatchCommand::Restore => commands::patch::restore(&ctx)?,
        },

        Commands::Profile { command } => match command {
            ProfileCommand::Detect => commands::profile::detect(&ctx, resolution)?,
            ProfileCommand::List => commands::profile::list(&ctx)?,
            ProfileCommand::Show { name, json } => {
                commands::profile::show(&ctx, name.as_deref(), json, resolution)?;
            }
            ProfileCommand::Scaffold { name, activate } => {
                commands::profile::scaffold(&ctx, &name, resolution, activate)?;
            }
        },

        Commands::Progress { command } => match command {
            ProgressCommand::Show { name } => {
                commands::progress::show(&ctx, name.as_deref(), resolution)?;
            }
        },

        Commands::Init { command } => match command {
            InitCommand::Print => commands::init::print(&ctx, resolution)?,
            InitCommand::Write => commands::init::write(&ctx, resolution)?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_configure() {
        let cli = Cli::try_parse_from([
            "hxe",
            "configure",
            "--mode",
            "spv3",
            "--set",
            "video.gamma=180",
            "--set",
            "main.start=0",
            "--game-path",
            "/games/halo",
        ])
        .unwrap();

        assert_eq!(cli.game.game_path.as_deref(), Some(std::path::Path::new("/games/halo")));
        match cli.command {
            Commands::Configure { mode, set, .. } => {
                assert_eq!(mode, Some(hxe::Mode::Spv3));
                assert_eq!(set.len(), 2);
            }
            _ => panic!("expected configure"),
        }
    }

    #[test]
    fn test_parse_resolution() {
        let cli = Cli::try_parse_from(["hxe", "load", "--resolution", "1920x1080", "--no-start"])
            .unwrap();
        assert_eq!(cli.game.resolution, Some(hxe::Resolution::new(1920, 1080)));
        assert!(matches!(cli.command, Commands::Load { no_start: true }));
    }
}
