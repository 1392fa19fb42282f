pub mod dns;
pub mod format;
pub mod push;
pub mod rules;

use anyhow::{Context, Result};
use hop_bunny::{ApiClient, PullZone};

/// Resolve a pull zone by name and announce it.
async fn find_zone(api: &ApiClient, name: &str) -> Result<PullZone> {
    let zone = api
        .find_pull_zone(name)
        .await
        .with_context(|| format!("error finding pull zone '{name}'"))?;
    println!("Found pull zone '{}' with ID: {}", zone.name, zone.id);
    Ok(zone)
}
