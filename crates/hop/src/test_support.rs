use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::checksum::bytes_checksum;
use crate::path::{join_remote, normalize_remote};
use crate::{RemoteEntry, StorageBackend, StorageError};

/// In-memory storage zone for testing. Objects are keyed by their full
/// forward-slash path; directories are derived from the keys.
pub struct InMemoryStorage {
    zone: String,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_listings: Mutex<BTreeSet<String>>,
    failing_uploads: Mutex<BTreeSet<String>>,
    uploads: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
    report_checksums: AtomicBool,
    hang_uploads: AtomicBool,
}

impl InMemoryStorage {
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            objects: Mutex::new(BTreeMap::new()),
            failing_listings: Mutex::new(BTreeSet::new()),
            failing_uploads: Mutex::new(BTreeSet::new()),
            uploads: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            report_checksums: AtomicBool::new(true),
            hang_uploads: AtomicBool::new(false),
        }
    }

    /// Seed an object without recording it as an upload.
    pub fn insert(&self, path: &str, content: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(normalize_remote(path), content.to_vec());
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&normalize_remote(path))
            .cloned()
    }

    /// Listing `path` answers with HTTP 500.
    pub fn fail_listing(&self, path: &str) {
        self.failing_listings
            .lock()
            .unwrap()
            .insert(normalize_remote(path));
    }

    /// Uploading to `path` answers with HTTP 500.
    pub fn fail_upload(&self, path: &str) {
        self.failing_uploads
            .lock()
            .unwrap()
            .insert(normalize_remote(path));
    }

    /// Listings report an empty checksum, like objects stored before the
    /// zone started computing them.
    pub fn without_checksums(self) -> Self {
        self.report_checksums.store(false, Ordering::SeqCst);
        self
    }

    /// Uploads never complete. Used to exercise cancellation.
    pub fn hang_uploads(&self) {
        self.hang_uploads.store(true, Ordering::SeqCst);
    }

    /// Paths passed to `upload`, in call order, including failed ones.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn clear_uploads(&self) {
        self.uploads.lock().unwrap().clear();
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StorageBackend for InMemoryStorage {
    fn zone_name(&self) -> &str {
        &self.zone
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let dir = normalize_remote(path);

        if self.failing_listings.lock().unwrap().contains(&dir) {
            return Err(StorageError::Status {
                status: 500,
                body: "listing failed".to_owned(),
            });
        }

        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };
        let report_checksums = self.report_checksums.load(Ordering::SeqCst);

        let objects = self.objects.lock().unwrap();
        let mut directories = BTreeSet::new();
        let mut entries = Vec::new();

        for (key, content) in objects.iter() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child_dir, _)) => {
                    directories.insert(child_dir.to_owned());
                }
                None => {
                    let checksum = if report_checksums {
                        bytes_checksum(content)
                    } else {
                        String::new()
                    };
                    entries.push(RemoteEntry::file(key.clone(), content.len() as u64, checksum));
                }
            }
        }

        entries.extend(directories.into_iter().map(|name| RemoteEntry {
            path: join_remote(&dir, &name),
            name,
            is_directory: true,
            size: 0,
            last_modified: None,
            checksum: String::new(),
        }));

        Ok(entries)
    }

    async fn upload(&self, path: &str, content: Vec<u8>) -> Result<(), StorageError> {
        let path = normalize_remote(path);
        self.uploads.lock().unwrap().push(path.clone());

        if self.hang_uploads.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if self.failing_uploads.lock().unwrap().contains(&path) {
            return Err(StorageError::Status {
                status: 500,
                body: "upload failed".to_owned(),
            });
        }

        self.objects.lock().unwrap().insert(path, content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_splits_files_and_directories() {
        let storage = InMemoryStorage::new("zone");
        storage.insert("a.txt", b"a");
        storage.insert("sub/b.txt", b"bb");
        storage.insert("sub/deeper/c.txt", b"ccc");

        let root = storage.list("").await.unwrap();
        assert_eq!(root.len(), 2);
        assert!(root.iter().any(|e| e.name == "a.txt" && !e.is_directory));
        assert!(root.iter().any(|e| e.name == "sub" && e.is_directory));

        let sub = storage.list("/sub/").await.unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(storage.list_calls(), 2);
    }

    #[tokio::test]
    async fn listing_reports_checksums_unless_disabled() {
        let storage = InMemoryStorage::new("zone");
        storage.insert("a.txt", b"a");
        assert_eq!(storage.list("").await.unwrap()[0].checksum, bytes_checksum(b"a"));

        let storage = InMemoryStorage::new("zone").without_checksums();
        storage.insert("a.txt", b"a");
        assert_eq!(storage.list("").await.unwrap()[0].checksum, "");
    }

    #[tokio::test]
    async fn upload_stores_and_logs() {
        let storage = InMemoryStorage::new("zone");
        storage.upload("x/y.txt", b"data".to_vec()).await.unwrap();
        assert_eq!(storage.get("x/y.txt").unwrap(), b"data");
        assert_eq!(storage.uploads(), vec!["x/y.txt"]);
    }

    #[tokio::test]
    async fn configured_failures_return_status_errors() {
        let storage = InMemoryStorage::new("zone");
        storage.fail_upload("bad.txt");
        storage.fail_listing("broken");

        assert!(storage.upload("bad.txt", vec![]).await.is_err());
        assert!(storage.list("broken").await.is_err());
        assert!(storage.get("bad.txt").is_none());
    }
}
