//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;
pub mod reporter;

use std::process::ExitCode;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;

use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    crate::logging::init(cli.verbose, cli.no_color, cli.log_file.as_deref())?;

    // Create context for commands
    let ctx = commands::Context {
        config_path: cli.config,
        token: cli.token,
        output_format: cli.output.unwrap_or(OutputFormat::Pretty),
    };

    // Dispatch to appropriate command
    let done = match cli.command {
        Commands::Provision(args) => commands::provision::execute(&ctx, args).await,
        Commands::Role => commands::role::execute(&ctx).await,
        Commands::Issue(args) => commands::issue::execute(&ctx, args).await,
        Commands::Verify(args) => return commands::verify::execute(&ctx, &args),
        Commands::DeviceId(args) => commands::device_id::execute(&ctx, &args),
        Commands::Config(args) => commands::config::execute(&ctx, args),
    };
    done.map(|()| ExitCode::SUCCESS)
}
