use std::sync::Arc;

use chrono::NaiveDateTime;

/// A storage zone as returned by the control plane.
///
/// `password` is the zone's storage access key, which is what authenticates
/// listing and upload calls against the storage endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageZone {
    pub id: i64,
    pub name: String,
    pub password: String,
}

/// One child of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub last_modified: Option<NaiveDateTime>,
    /// Uppercase hex SHA-256 of the object, empty when the store did not report one.
    pub checksum: String,
    /// Forward-slash path of the entry. Backends fill in the full path within
    /// the zone; the remote inventory rewrites it relative to the sync root.
    pub path: String,
}

impl RemoteEntry {
    pub fn file(path: impl Into<String>, size: u64, checksum: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or_default().to_owned();
        Self {
            name,
            is_directory: false,
            size,
            last_modified: None,
            checksum: checksum.into(),
            path,
        }
    }
}

/// Errors that can occur when talking to a storage zone.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cancelled")]
    Cancelled,
}

/// Object storage bound to a single storage zone.
///
/// Implementations perform exactly one network call per method and never
/// retry; re-running a push is the retry mechanism.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the storage zone this backend writes to.
    fn zone_name(&self) -> &str;

    /// List the immediate children of `path` (forward slashes, no leading slash,
    /// empty for the zone root). A path that does not exist lists as empty.
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, StorageError>;

    /// Store `content` at `path`, replacing any existing object.
    async fn upload(&self, path: &str, content: Vec<u8>) -> Result<(), StorageError>;
}

#[async_trait::async_trait]
impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn zone_name(&self) -> &str {
        (**self).zone_name()
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, StorageError> {
        (**self).list(path).await
    }

    async fn upload(&self, path: &str, content: Vec<u8>) -> Result<(), StorageError> {
        (**self).upload(path, content).await
    }
}
