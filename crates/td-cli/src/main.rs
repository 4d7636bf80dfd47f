//! Tilde CLI - schema migrations for DuckDB

use clap::Parser;
use log::LevelFilter;

mod cli;
mod commands;
mod migrations;

use cli::{Cli, Commands, DbCommands};
use commands::common::ExitCode;
use commands::{dump, load, new, status, unlock, up};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match &cli.command {
        Commands::Db(db) => match &db.command {
            DbCommands::Up(args) => up::execute(args, &cli.global).await,
            DbCommands::New(args) => new::execute(args, &cli.global).await,
            DbCommands::Dump(args) => dump::execute(args, &cli.global).await,
            DbCommands::Load(args) => load::execute(args, &cli.global).await,
            DbCommands::Status(args) => status::execute(args, &cli.global).await,
            DbCommands::Unlock => unlock::execute(&cli.global).await,
        },
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(ExitCode(code)) => std::process::ExitCode::from(u8::try_from(*code).unwrap_or(1)),
            None => {
                eprintln!("Error: {err:#}");
                std::process::ExitCode::FAILURE
            }
        },
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = colog::default_builder();
    builder.filter_level(level);
    builder.init();
}
