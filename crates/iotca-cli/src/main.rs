//! iotca - IoT certificate authority provisioning and verification

use std::process::ExitCode;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    iotca_cli::run().await
}
