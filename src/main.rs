mod cli;
mod commands;
mod config;
mod engine;
mod error;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, StateCommand};
use std::io;
use std::path::PathBuf;

use config::{ProviderSettings, expand_path};

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    /// Fallbacks for values missing from `[provider]`
    pub provider: ProviderSettings,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: expand_path(&cli.config),
        state_path: expand_path(&cli.state),
        provider: cli.provider.settings(),
    };

    match cli.command {
        Command::Validate => commands::declarative::validate(&ctx),
        Command::Plan(args) => commands::declarative::plan(&ctx, args.target.as_deref()),
        Command::Apply(args) => commands::declarative::apply(
            &ctx,
            args.target.as_deref(),
            args.dry_run,
            args.yes,
        ),
        Command::Destroy(args) => {
            commands::declarative::destroy(&ctx, args.target.as_deref(), args.yes)
        }
        Command::Import { address, id } => commands::import::run(&ctx, &address, &id),
        Command::Refresh => commands::declarative::refresh(&ctx),
        Command::State(cmd) => match cmd {
            StateCommand::List => commands::state::list(&ctx),
            StateCommand::Show { address } => commands::state::show(&ctx, &address),
            StateCommand::Rm { address } => commands::state::rm(&ctx, &address),
        },
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "dashform", &mut io::stdout());
            Ok(())
        }
    }
}
