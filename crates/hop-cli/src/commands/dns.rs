use anyhow::{Context, Result};

use hop::dns::validate_hostnames;
use hop_bunny::ApiClient;

use super::format;
use super::find_zone;

/// Verify every hostname of the pull zone has an A or CNAME record.
/// Returns false when any record is missing.
pub async fn check(api: &ApiClient, zone_name: &str) -> Result<bool> {
    let zone = find_zone(api, zone_name).await?;
    let details = api
        .pull_zone_details(zone.id)
        .await
        .context("failed to load pull zone details")?;
    let zones = api.dns_zones().await.context("failed to list DNS zones")?;

    log::debug!(
        "checking {} hostnames against {} DNS zones",
        details.hostnames.len(),
        zones.len()
    );

    let checks = validate_hostnames(&zones, &details.hostnames);
    for check in &checks {
        println!("{}", format::hostname_line(check));
    }

    let missing = checks.iter().filter(|c| c.is_missing()).count();
    if missing > 0 {
        eprintln!("\n{missing} hostname(s) without a DNS record");
    }

    Ok(missing == 0)
}
