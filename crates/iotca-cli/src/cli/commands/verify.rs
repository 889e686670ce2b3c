//! `iotca verify` - Check a certificate against a trust bundle.
//!
//! Exit status is the verdict: 0 valid, 1 invalid.

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use iotca::{verify_files, VerificationResult};

use super::Context;
use crate::cli::args::VerifyArgs;

pub fn execute(ctx: &Context, args: &VerifyArgs) -> Result<ExitCode> {
    let result = verify_files(&args.cert, &args.bundle);

    if !ctx.output_format.print_structured(&result)? {
        match &result {
            VerificationResult::Valid { chain } => {
                println!("{}", "Valid certificate".green().bold());
                for (depth, subject) in chain.iter().enumerate() {
                    println!("  {} {}", format!("{depth}:").dimmed(), subject);
                }
            }
            VerificationResult::Invalid { reason } => {
                println!("{} {}", "Invalid certificate:".red().bold(), reason);
            }
        }
    }

    Ok(if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
