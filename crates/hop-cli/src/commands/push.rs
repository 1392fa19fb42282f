use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use hop::{PushConfig, push_directory_with};
use hop_bunny::{ApiClient, BunnyStorage};

use super::find_zone;
use super::format;

/// Upload `local_dir` to the storage zone behind the pull zone.
/// Returns false when any file failed.
pub async fn run(
    api: &ApiClient,
    zone_name: &str,
    local_dir: &Path,
    config: PushConfig,
    timeout: Duration,
) -> Result<bool> {
    if !local_dir.is_dir() {
        anyhow::bail!("local directory '{}' does not exist", local_dir.display());
    }

    let zone = find_zone(api, zone_name).await?;
    let storage_zone = api
        .storage_zone_for(zone.id)
        .await
        .context("error finding storage zone")?;
    println!("Found storage zone: {}", storage_zone.name);
    println!(
        "Uploading files from '{}' to storage zone '{}'...",
        local_dir.display(),
        storage_zone.name
    );

    let storage = Arc::new(BunnyStorage::new(storage_zone));
    let cancel = CancellationToken::new();
    let watchdog = spawn_watchdog(cancel.clone(), timeout);

    let report = push_directory_with(storage, local_dir, &config, cancel, |outcome| {
        println!("{}", format::outcome_line(outcome));
    })
    .await;
    watchdog.abort();

    format::print_push_report(&report);
    Ok(!report.has_failures())
}

/// Cancel the push when the deadline passes or the user hits Ctrl-C.
fn spawn_watchdog(cancel: CancellationToken, timeout: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                eprintln!("push timed out after {}s, cancelling remaining uploads", timeout.as_secs());
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("interrupted, cancelling remaining uploads");
            }
        }
        cancel.cancel();
    })
}
