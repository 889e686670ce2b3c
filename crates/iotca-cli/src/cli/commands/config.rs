//! `iotca config` - CLI configuration management.

use anyhow::{Context as _, Result};
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::{Config, TEMPLATE};
use crate::output::OutputFormat;

pub fn execute(ctx: &Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(ctx),
        ConfigCommands::Path => show_path(ctx),
        ConfigCommands::Init { force } => init_config(ctx, force),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?.masked();

    match ctx.output_format {
        OutputFormat::Json | OutputFormat::Yaml => {
            ctx.output_format.print_structured(&config)?;
        }
        OutputFormat::Pretty => {
            let path = Config::resolve_path(ctx.config_path.as_deref())?;
            println!("{} {}", "Current Configuration:".bold(), path.display().to_string().dimmed());
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn show_path(ctx: &Context) -> Result<()> {
    let path = Config::resolve_path(ctx.config_path.as_deref())?;
    println!("{}", path.display());
    Ok(())
}

fn init_config(ctx: &Context, force: bool) -> Result<()> {
    let path = Config::resolve_path(ctx.config_path.as_deref())?;
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists\n\nUse --force to overwrite it.",
            path.display()
        );
    }

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    std::fs::write(&path, TEMPLATE).with_context(|| format!("cannot write {}", path.display()))?;

    println!("{} {}", "Wrote".green().bold(), path.display());
    Ok(())
}
