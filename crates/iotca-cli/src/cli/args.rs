//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Provision an IoT certificate authority and verify device certificates
///
/// Builds a root -> intermediate -> role -> leaf hierarchy on a PKI secrets
/// engine, and checks that device certificates chain to a trusted root.
#[derive(Parser, Debug)]
#[command(name = "iotca")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Engine bearer token (or set IOTCA_TOKEN env var)
    #[arg(long, env = "IOTCA_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Debug-level logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create root, intermediate and role, then optionally issue a leaf
    Provision(ProvisionArgs),

    /// Create or update the configured role on the intermediate
    Role,

    /// Issue a leaf certificate under the configured role
    Issue(IssueArgs),

    /// Check that a certificate chains to a trusted root
    Verify(VerifyArgs),

    /// Derive a device identifier from a descriptor file
    DeviceId(DeviceIdArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Issuance descriptor (JSON) for a leaf to issue after the role
    #[arg(short, long, value_name = "FILE")]
    pub payload: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Issuance descriptor (JSON): common_name, alt_names, ip_sans, ttl
    #[arg(short, long, value_name = "FILE")]
    pub payload: PathBuf,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// PEM certificate to verify
    #[arg(short = 'c', long = "cert", value_name = "FILE")]
    pub cert: PathBuf,

    /// PEM bundle of trusted certificates
    #[arg(short = 'v', long = "bundle", value_name = "FILE")]
    pub bundle: PathBuf,
}

#[derive(Args, Debug)]
pub struct DeviceIdArgs {
    /// Device descriptor (JSON with MAC_address, Manufacturer_name, Device_name)
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current configuration (token masked)
    Show,

    /// Show the configuration file path
    Path,

    /// Write a commented configuration template
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
