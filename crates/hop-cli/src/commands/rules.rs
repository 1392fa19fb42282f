use anyhow::{Context, Result};

use hop::EdgeRule;
use hop::check::check_all;
use hop_bunny::{ApiClient, HealthChecker};

use super::format;
use super::find_zone;

/// Add a 302 redirect to the pull zone.
pub async fn add(
    api: &ApiClient,
    zone_name: &str,
    from: &str,
    to: &str,
    description: Option<&str>,
) -> Result<()> {
    let zone = find_zone(api, zone_name).await?;

    let description = match description {
        Some(desc) if !desc.is_empty() => desc.to_owned(),
        _ => format!("302 redirect from {from} to {to}"),
    };
    let rule = EdgeRule::redirect_302(from, to, &description);

    api.add_edge_rule(zone.id, &rule)
        .await
        .context("failed to add edge rule")?;

    println!("Successfully added 302 redirect from {from} to {to}");
    Ok(())
}

pub async fn list(api: &ApiClient, zone_name: &str) -> Result<()> {
    let zone = find_zone(api, zone_name).await?;
    let rules = api
        .edge_rules(zone.id)
        .await
        .context("failed to list edge rules")?;

    let redirects: Vec<&EdgeRule> = rules.iter().filter(|r| r.is_302_redirect()).collect();
    format::print_redirects(&redirects);
    Ok(())
}

/// Analyze every edge rule of the zone, probing absolute destinations over
/// HTTP unless `skip_health` is set. Returns false when an error or critical
/// issue was found.
pub async fn check(api: &ApiClient, zone_name: &str, skip_health: bool) -> Result<bool> {
    let zone = find_zone(api, zone_name).await?;
    let details = api
        .pull_zone_details(zone.id)
        .await
        .context("failed to load pull zone details")?;

    println!(
        "\nRunning redirect analysis on {} edge rules...",
        details.edge_rules.len()
    );

    let mut issues = check_all(&details.edge_rules, &details.hostnames);

    if !skip_health {
        println!("Running HTTP health checks... (use --skip-health to skip)");
        let checker = HealthChecker::new().context("failed to build health check client")?;
        issues.extend(checker.url_health_issues(&details.edge_rules).await);
    }

    log::debug!("{} issues found", issues.len());
    format::print_check_results(&issues);

    Ok(!issues.iter().any(|i| i.severity.is_failure()))
}
