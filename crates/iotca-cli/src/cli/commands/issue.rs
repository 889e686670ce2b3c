//! `iotca issue` - Issue one leaf certificate under the configured role.

use anyhow::Result;
use colored::Colorize;
use iotca::provision::{IssuanceClient, Role};
use iotca::ArtifactStore;

use super::provision::CertificateSummary;
use super::{stage_failure, Context};
use crate::cli::args::IssueArgs;

pub async fn execute(ctx: &Context, args: IssueArgs) -> Result<()> {
    let settings = ctx.load_config()?.issue(ctx.token.as_deref())?;
    let client = settings.engine.client()?;
    let artifacts = ArtifactStore::new(&settings.output_dir);
    let reporter = ctx.reporter();

    let role = Role::attached(&settings.role_name, &settings.engine.intermediate_mount);
    let cert = IssuanceClient::new(&client, &settings.endpoint, &artifacts, &reporter)
        .issue(&role, &args.payload)
        .await
        .map_err(|e| stage_failure("issuance failed", e))?;

    let summary = CertificateSummary::from(&cert);
    if !ctx.output_format.print_structured(&summary)? {
        println!(
            "{} {} under role {}",
            "Issued".green().bold(),
            summary.common_name.cyan(),
            summary.role
        );
        if let Some(serial) = &summary.serial_number {
            println!("  {} {}", "Serial:".bold(), serial);
        }
        if let Some(expires) = summary.expires_at {
            println!("  {} {}", "Expires:".bold(), expires.to_rfc3339());
        }
        println!("  {} {}", "Certificate:".bold(), summary.certificate_file);
        println!("  {} {}", "Key:".bold(), summary.key_file);
    }
    Ok(())
}
