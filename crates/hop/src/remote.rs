use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::path::{join_remote, normalize_remote, strip_remote_root};
use crate::storage::{RemoteEntry, StorageBackend, StorageError};

/// One item of the streamed remote inventory.
#[derive(Debug)]
pub enum RemoteEvent {
    /// A file below the root. `path` is relative to the root.
    Entry(RemoteEntry),
    /// A directory could not be listed. Its subtree is missing from the
    /// stream; siblings are still walked.
    ListingFailed { path: String, error: StorageError },
}

/// Walk the remote tree under `root` and send every file on `events`.
///
/// Stops early when the receiver is dropped or `cancel` fires.
pub async fn walk_remote(
    storage: &dyn StorageBackend,
    root: &str,
    events: &mpsc::Sender<RemoteEvent>,
    cancel: &CancellationToken,
) {
    let root = normalize_remote(root);
    let mut pending = vec![root.clone()];

    while let Some(dir) = pending.pop() {
        let listing = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("remote walk cancelled");
                return;
            }
            listing = storage.list(&dir) => listing,
        };

        let entries = match listing {
            Ok(entries) => entries,
            Err(error) => {
                let path = strip_remote_root(&root, &dir);
                log::warn!("could not list remote directory /{dir}: {error}");
                if events
                    .send(RemoteEvent::ListingFailed { path, error })
                    .await
                    .is_err()
                {
                    return;
                }
                continue;
            }
        };

        log::debug!("listed /{dir}: {} entries", entries.len());

        for mut entry in entries {
            let full_path = join_remote(&dir, &entry.name);
            if entry.is_directory {
                pending.push(full_path);
                continue;
            }

            entry.path = strip_remote_root(&root, &full_path);
            if events.send(RemoteEvent::Entry(entry)).await.is_err() {
                return;
            }
        }
    }
}

/// Start walking the remote tree on a background task.
///
/// The returned receiver yields events as directories are listed and
/// closes once the walk finishes.
pub fn stream_remote_inventory(
    storage: Arc<dyn StorageBackend>,
    root: &str,
    capacity: usize,
    cancel: CancellationToken,
) -> mpsc::Receiver<RemoteEvent> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let root = root.to_owned();

    tokio::spawn(async move {
        walk_remote(storage.as_ref(), &root, &tx, &cancel).await;
    });

    rx
}

/// List the whole remote tree under `root` into a map keyed by relative path.
///
/// Unlike the streaming walk, any listing failure aborts the operation.
pub async fn collect_remote_inventory(
    storage: &dyn StorageBackend,
    root: &str,
) -> Result<BTreeMap<String, RemoteEntry>, StorageError> {
    let root = normalize_remote(root);
    let mut files = BTreeMap::new();
    let mut pending = vec![root.clone()];

    while let Some(dir) = pending.pop() {
        for mut entry in storage.list(&dir).await? {
            let full_path = join_remote(&dir, &entry.name);
            if entry.is_directory {
                pending.push(full_path);
            } else {
                entry.path = strip_remote_root(&root, &full_path);
                files.insert(entry.path.clone(), entry);
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryStorage;

    fn storage() -> Arc<InMemoryStorage> {
        let storage = InMemoryStorage::new("zone");
        storage.insert("site/index.html", b"<html/>");
        storage.insert("site/css/main.css", b"body{}");
        storage.insert("site/css/vendor/reset.css", b"*{}");
        storage.insert("other/readme.md", b"# hi");
        Arc::new(storage)
    }

    async fn drain(mut rx: mpsc::Receiver<RemoteEvent>) -> (Vec<String>, Vec<String>) {
        let mut files = Vec::new();
        let mut failures = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                RemoteEvent::Entry(entry) => files.push(entry.path),
                RemoteEvent::ListingFailed { path, .. } => failures.push(path),
            }
        }
        files.sort();
        (files, failures)
    }

    #[tokio::test]
    async fn collect_returns_paths_relative_to_root() {
        let storage = storage();
        let files = collect_remote_inventory(storage.as_ref(), "/site/").await.unwrap();
        let keys: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["css/main.css", "css/vendor/reset.css", "index.html"]);
        assert_eq!(files["index.html"].size, 7);
    }

    #[tokio::test]
    async fn collect_from_zone_root_includes_everything() {
        let storage = storage();
        let files = collect_remote_inventory(storage.as_ref(), "").await.unwrap();
        assert_eq!(files.len(), 4);
        assert!(files.contains_key("other/readme.md"));
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let storage = storage();
        let files = collect_remote_inventory(storage.as_ref(), "nowhere").await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn collect_propagates_listing_errors() {
        let storage = storage();
        storage.fail_listing("site/css");
        let err = collect_remote_inventory(storage.as_ref(), "site").await.unwrap_err();
        assert!(matches!(err, StorageError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn stream_yields_every_file() {
        let rx = stream_remote_inventory(storage(), "site", 2, CancellationToken::new());
        let (files, failures) = drain(rx).await;
        assert_eq!(files, vec!["css/main.css", "css/vendor/reset.css", "index.html"]);
        assert!(failures.is_empty());
    }

    #[tokio::test]
    async fn stream_reports_failed_subtree_and_continues() {
        let storage = storage();
        storage.fail_listing("site/css");
        let rx = stream_remote_inventory(storage, "site", 4, CancellationToken::new());
        let (files, failures) = drain(rx).await;
        assert_eq!(files, vec!["index.html"]);
        assert_eq!(failures, vec!["css"]);
    }

    #[tokio::test]
    async fn cancelled_stream_closes_without_listing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let storage = storage();
        let rx = stream_remote_inventory(storage.clone(), "site", 4, cancel);
        let (files, _) = drain(rx).await;
        assert!(files.is_empty());
        assert_eq!(storage.list_calls(), 0);
    }
}
