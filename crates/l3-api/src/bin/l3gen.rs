//! L3 schema generator
//!
//! Prints the extension descriptor, the resource attribute map and the JSON
//! Schemas of the request bodies as a multi-document YAML stream.
//!
//! Usage: `l3gen [API_VERSION]` (defaults to 2.0). Quota defaults are read
//! from `QUOTA_ROUTER` / `QUOTA_FLOATINGIP`.

use std::env;

use anyhow::Context;
use l3_api::extension::API_VERSION;
use l3_api::{FloatingIpSpec, FloatingIpUpdate, L3Config, L3Extension, RouterInterfaceInfo, RouterSpec, RouterUpdate};
use schemars::schema_for;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_document<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(value).context("failed to render YAML")?;
    print!("---\n{}", yaml);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // stdout carries the YAML stream
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let version = env::args().nth(1).unwrap_or_else(|| API_VERSION.to_string());
    let config = L3Config::from_env().context("invalid quota configuration")?;
    let extension = L3Extension::new(config);

    info!("Generating L3 schema for API version {}", version);

    print_document(&extension.descriptor())?;
    print_document(&extension.extended_resources(&version))?;
    print_document(&schema_for!(RouterSpec))?;
    print_document(&schema_for!(RouterUpdate))?;
    print_document(&schema_for!(FloatingIpSpec))?;
    print_document(&schema_for!(FloatingIpUpdate))?;
    print_document(&schema_for!(RouterInterfaceInfo))?;

    Ok(())
}
