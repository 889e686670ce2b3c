//! `iotca provision` - Build the full CA hierarchy.

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use iotca::provision::{Authority, Certificate, ProvisionReport, Role};
use iotca::{ArtifactStore, Orchestrator};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::{stage_failure, Context};
use crate::cli::args::ProvisionArgs;

#[derive(Serialize)]
pub(crate) struct AuthoritySummary {
    pub common_name: String,
    pub mount: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub certificate_file: String,
}

impl AuthoritySummary {
    fn new(authority: &Authority, file: &std::path::Path) -> Self {
        Self {
            common_name: authority.common_name().to_string(),
            mount: authority.mount().to_string(),
            expires_at: authority.expires_at(),
            certificate_file: file.display().to_string(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct RoleSummary {
    pub name: String,
    pub mount: String,
    pub allowed_domains: Vec<String>,
}

impl From<&Role> for RoleSummary {
    fn from(role: &Role) -> Self {
        Self {
            name: role.name().to_string(),
            mount: role.mount().to_string(),
            allowed_domains: role
                .policy()
                .map(|p| p.allowed_domains.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct CertificateSummary {
    pub common_name: String,
    pub role: String,
    pub serial_number: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub certificate_file: String,
    pub key_file: String,
}

impl From<&Certificate> for CertificateSummary {
    fn from(cert: &Certificate) -> Self {
        Self {
            common_name: cert.common_name().to_string(),
            role: cert.role().to_string(),
            serial_number: cert.serial_number().map(str::to_string),
            expires_at: cert.expires_at(),
            certificate_file: cert.paths().certificate.display().to_string(),
            key_file: cert.paths().private_key.display().to_string(),
        }
    }
}

#[derive(Serialize)]
struct ProvisionSummary {
    root: AuthoritySummary,
    intermediate: AuthoritySummary,
    role: RoleSummary,
    certificate: Option<CertificateSummary>,
    warnings: Vec<String>,
}

#[derive(Tabled)]
pub(crate) struct ArtifactRow {
    #[tabled(rename = "Artifact")]
    pub kind: String,
    #[tabled(rename = "Subject")]
    pub subject: String,
    #[tabled(rename = "File")]
    pub file: String,
}

pub async fn execute(ctx: &Context, args: ProvisionArgs) -> Result<()> {
    let settings = ctx.load_config()?.provision(ctx.token.as_deref(), args.payload)?;
    let client = settings.engine.client()?;
    let artifacts = ArtifactStore::new(&settings.output_dir);
    let reporter = ctx.reporter();

    let report = match Orchestrator::new(&client, &artifacts, &reporter)
        .run(&settings.plan)
        .await
    {
        Ok(report) => report,
        Err(e) => return Err(stage_failure("provisioning aborted at stage", e)),
    };

    let summary = summarize(&report, &artifacts);
    if !ctx.output_format.print_structured(&summary)? {
        print_pretty(&summary);
    }
    Ok(())
}

fn summarize(report: &ProvisionReport, artifacts: &ArtifactStore) -> ProvisionSummary {
    ProvisionSummary {
        root: AuthoritySummary::new(&report.root, &artifacts.root_cert_path()),
        intermediate: AuthoritySummary::new(
            &report.intermediate,
            &artifacts.intermediate_cert_path(),
        ),
        role: RoleSummary::from(&report.role),
        certificate: report.certificate.as_ref().map(CertificateSummary::from),
        warnings: report.warnings().into_iter().map(str::to_string).collect(),
    }
}

fn print_pretty(summary: &ProvisionSummary) {
    println!();
    println!("{}", "CA hierarchy provisioned".green().bold());
    println!();

    let mut rows = vec![
        ArtifactRow {
            kind: "root".into(),
            subject: summary.root.common_name.clone(),
            file: summary.root.certificate_file.clone(),
        },
        ArtifactRow {
            kind: "intermediate".into(),
            subject: summary.intermediate.common_name.clone(),
            file: summary.intermediate.certificate_file.clone(),
        },
    ];
    if let Some(cert) = &summary.certificate {
        rows.push(ArtifactRow {
            kind: "leaf".into(),
            subject: cert.common_name.clone(),
            file: cert.certificate_file.clone(),
        });
        rows.push(ArtifactRow {
            kind: "leaf key".into(),
            subject: cert.common_name.clone(),
            file: cert.key_file.clone(),
        });
    }
    println!("{}", Table::new(rows).with(Style::rounded()));

    println!();
    println!(
        "  {} {} on {}",
        "Role:".bold(),
        summary.role.name.cyan(),
        summary.role.mount
    );
    if let Some(expires) = summary.root.expires_at {
        println!("  {} {}", "Root expires:".bold(), expires.format("%Y-%m-%d"));
    }
    for w in &summary.warnings {
        println!("  {} {}", "Warning:".yellow().bold(), w);
    }
}
