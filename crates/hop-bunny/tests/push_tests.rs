use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hop::checksum::bytes_checksum;
use hop::{OutcomeStatus, PushConfig, StorageZone, push_directory};
use hop_bunny::BunnyStorage;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn storage_for(server: &MockServer) -> Arc<BunnyStorage> {
    Arc::new(
        BunnyStorage::new(StorageZone {
            id: 1,
            name: "site-zone".into(),
            password: "secret".into(),
        })
        .with_base_url(server.uri()),
    )
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn object(name: &str, content: &[u8]) -> String {
    format!(
        r#"{{"ObjectName": "{name}", "IsDirectory": false, "Length": {}, "LastChanged": "2025-08-29T11:10:09.594", "Checksum": "{}"}}"#,
        content.len(),
        bytes_checksum(content)
    )
}

fn directory(name: &str) -> String {
    format!(r#"{{"ObjectName": "{name}", "IsDirectory": true, "Length": 0, "LastChanged": null, "Checksum": null}}"#)
}

async fn mount_listing(server: &MockServer, dir: &str, items: &[String]) {
    Mock::given(method("GET"))
        .and(path(dir))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(format!("[{}]", items.join(",")), "application/json"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn unchanged_files_are_skipped_and_changed_ones_uploaded() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.txt", "hello");
    write(dir.path(), "b.txt", "HELLO");
    write(dir.path(), "assets/c.txt", "brand new");

    mount_listing(
        &server,
        "/site-zone/www/",
        &[object("a.txt", b"hello"), object("b.txt", b"hello"), directory("assets")],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/site-zone/www/assets/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/site-zone/www/b.txt"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/site-zone/www/assets/c.txt"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/site-zone/www/a.txt"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let report = push_directory(
        storage_for(&server),
        dir.path(),
        &PushConfig::new("www"),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.uploaded(), 2);
    assert_eq!(report.skipped(), 1);
    assert!(!report.has_failures());
    assert!(report.warnings.is_empty());
    assert_eq!(report.to_string(), "2 files uploaded, 1 file skipped, 0 files failed");
}

#[tokio::test]
async fn rejected_upload_is_a_failed_outcome() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "big.bin", "too large");

    mount_listing(&server, "/site-zone/", &[]).await;
    Mock::given(method("PUT"))
        .and(path("/site-zone/big.bin"))
        .respond_with(ResponseTemplate::new(400).set_body_string("File too large"))
        .mount(&server)
        .await;

    let report = push_directory(
        storage_for(&server),
        dir.path(),
        &PushConfig::default(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(report.failed(), 1);
    assert_eq!(
        report.outcomes[0].status,
        OutcomeStatus::Failed {
            error: "HTTP 400: File too large".into()
        }
    );
}

#[tokio::test]
async fn failed_listing_becomes_a_warning() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "index.html", "<html/>");

    Mock::given(method("GET"))
        .and(path("/site-zone/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/site-zone/index.html"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let report = push_directory(
        storage_for(&server),
        dir.path(),
        &PushConfig::default(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(report.uploaded(), 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(
        report.warnings[0].to_string(),
        "could not list remote files in /: HTTP 500: boom"
    );
}

#[tokio::test]
async fn cancellation_aborts_slow_uploads() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    for i in 0..5 {
        write(dir.path(), &format!("f{i}.txt"), "x");
    }

    mount_listing(&server, "/site-zone/", &[]).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(20)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let report = push_directory(storage_for(&server), dir.path(), &PushConfig::default(), cancel).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.outcomes.len(), 5);
    assert!(report.outcomes.iter().all(|o| o.error() == Some("cancelled")));
}
