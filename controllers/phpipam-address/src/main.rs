//! phpIPAM Address Provider
//!
//! Manages single IP address allocations in phpIPAM for an orchestration
//! engine. Each invocation runs one operation on one resource:
//!
//! ```text
//! phpipam-address <create|read|update|delete> < state.json > state.json
//! ```
//!
//! The state document is read from stdin and the resulting state is written
//! to stdout. Logs go to stderr, filtered by `RUST_LOG`.

mod error;
mod provider;
mod reconciler;
mod resource;
mod schema;
mod test_utils;

use crate::resource::{ResourceData, StateDocument};
use anyhow::{bail, Context};
use std::io::Read;
use std::str::FromStr;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Operation requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl FromStr for Operation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "read" => Ok(Operation::Read),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => bail!("unknown operation {:?}; expected create, read, update or delete", other),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let operation: Operation = std::env::args()
        .nth(1)
        .context("usage: phpipam-address <create|read|update|delete>")?
        .parse()?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read state document from stdin")?;
    let document: StateDocument = serde_json::from_str(&input).context("invalid state document")?;

    info!("Running {:?} for {} {}", operation, schema::RESOURCE_TYPE, document.state.hostname);

    let reconciler = provider::configure(document.provider).await?;
    let mut data = ResourceData::new(document.state, document.prior);

    let result = match operation {
        Operation::Create => resource::create(&reconciler, &mut data).await,
        Operation::Read => resource::read(&reconciler, &mut data).await,
        Operation::Update => resource::update(&reconciler, &mut data).await,
        Operation::Delete => resource::delete(&reconciler, &mut data).await,
    };

    // Written even on failure; a partial replacement leaves the new ID in state.
    let output = serde_json::to_string_pretty(data.state()).context("failed to encode state")?;
    println!("{}", output);

    if let Err(e) = result {
        error!("{:?} failed: {}", operation, e);
        debug!("Root cause: {:?}", e.root());
        return Err(e.into());
    }
    Ok(())
}
