//! `qbase-loader` command-line tool.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use qbase_loader::logging::{LogConfig, init_logging};

mod cli;
mod commands;

use crate::cli::{Cli, Command};
use crate::commands::{run_profile, run_records, run_schema, run_types, run_upload};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_verbosity(cli.verbose, cli.quiet);
    log_config.with_ansi = io::stderr().is_terminal();
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Types => {
            run_types();
            Ok(true)
        }
        Command::Profile(command) => run_profile(command).map(|()| true),
        Command::Schema(command) => run_schema(command).await.map(|()| true),
        Command::Upload(args) => run_upload(args).await,
        Command::Records(command) => run_records(command).await.map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
