//! `iotca device-id` - Derive a stable identifier from a device descriptor.

use anyhow::{Context as _, Result};
use iotca::device::DeviceDescriptor;
use serde::Serialize;

use super::Context;
use crate::cli::args::DeviceIdArgs;

#[derive(Serialize)]
struct DeviceId<'a> {
    device_id: String,
    sha256: String,
    mac_address: &'a str,
    manufacturer_name: &'a str,
    device_name: &'a str,
}

pub fn execute(ctx: &Context, args: &DeviceIdArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read device descriptor {}", args.file.display()))?;
    let device = DeviceDescriptor::from_json(&raw)
        .with_context(|| format!("invalid device descriptor {}", args.file.display()))?;

    let out = DeviceId {
        device_id: device.device_id(),
        sha256: device.digest_hex(),
        mac_address: &device.mac_address,
        manufacturer_name: &device.manufacturer_name,
        device_name: &device.device_name,
    };
    if !ctx.output_format.print_structured(&out)? {
        println!("{}", out.device_id);
    }
    Ok(())
}
