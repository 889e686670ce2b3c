//! `iotca role` - Define the configured role on an existing intermediate.

use anyhow::Result;
use colored::Colorize;
use iotca::provision::{Authority, RoleManager};

use super::provision::RoleSummary;
use super::{stage_failure, Context};

pub async fn execute(ctx: &Context) -> Result<()> {
    let settings = ctx.load_config()?.role(ctx.token.as_deref())?;
    let client = settings.engine.client()?;
    let reporter = ctx.reporter();

    let authority = Authority::attached(
        &settings.engine.intermediate_mount,
        &settings.authority_common_name,
    );
    let role = RoleManager::new(&client, &reporter)
        .define_role(&authority, &settings.role)
        .await
        .map_err(|e| stage_failure("role definition failed", e))?;

    let summary = RoleSummary::from(&role);
    if !ctx.output_format.print_structured(&summary)? {
        println!(
            "{} role {} on {}",
            "Defined".green().bold(),
            summary.name.cyan(),
            summary.mount
        );
        let domains = if summary.allowed_domains.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            summary.allowed_domains.join(", ")
        };
        println!("  {} {}", "Allowed domains:".bold(), domains);
    }
    Ok(())
}
