use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::checksum::file_checksum;
use crate::path::local_relative_path;
use crate::warning::SyncWarning;

/// A regular file discovered under the local sync root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub size: u64,
    /// Uppercase hex SHA-256, empty when the content could not be read.
    pub checksum: String,
    /// Path relative to the sync root, always with `/` separators.
    pub relative_path: String,
}

/// A file that was found but cannot take part in the push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LocalInventory {
    pub files: BTreeMap<String, LocalFile>,
    pub unreadable: Vec<UnreadableFile>,
    pub warnings: Vec<SyncWarning>,
}

impl LocalInventory {
    pub fn len(&self) -> usize {
        self.files.len() + self.unreadable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("cannot walk {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("local walk was interrupted: {0}")]
    Join(String),
}

/// Walk `root` and fingerprint every regular file below it.
///
/// Only a failure on the root itself is fatal. Unreadable entries deeper in
/// the tree become warnings, and a file whose checksum cannot be computed is
/// kept with an empty checksum so it is compared by size alone.
pub fn scan_local_directory(root: &Path) -> Result<LocalInventory, InventoryError> {
    scan_with(root, file_checksum)
}

pub(crate) fn scan_with<F>(root: &Path, checksum: F) -> Result<LocalInventory, InventoryError>
where
    F: Fn(&Path) -> io::Result<String>,
{
    let mut inventory = LocalInventory::default();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(InventoryError::Root {
                    path: root.to_path_buf(),
                    source: err,
                });
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                log::warn!("skipping {path}: {err}");
                inventory.warnings.push(SyncWarning::Walk {
                    path,
                    message: err.to_string(),
                });
                continue;
            }
        };

        if entry.depth() == 0 {
            if !entry.file_type().is_dir() {
                return Err(InventoryError::NotADirectory {
                    path: root.to_path_buf(),
                });
            }
            continue;
        }

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path().to_path_buf();

        let Some(relative_path) = local_relative_path(root, &path) else {
            inventory.unreadable.push(UnreadableFile {
                reason: "path cannot be expressed as a remote path".to_owned(),
                path,
            });
            continue;
        };

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                inventory.unreadable.push(UnreadableFile {
                    reason: err.to_string(),
                    path,
                });
                continue;
            }
        };

        let checksum = match checksum(&path) {
            Ok(sum) => sum,
            Err(err) => {
                log::warn!("checksum failed for {relative_path}: {err}");
                inventory.warnings.push(SyncWarning::Checksum {
                    path: relative_path.clone(),
                    message: err.to_string(),
                });
                String::new()
            }
        };

        log::debug!("local {relative_path} ({size} bytes)");
        inventory.files.insert(
            relative_path.clone(),
            LocalFile {
                path,
                size,
                checksum,
                relative_path,
            },
        );
    }

    Ok(inventory)
}

/// Async wrapper that runs the walk on the blocking pool.
pub async fn build_local_inventory(root: &Path) -> Result<LocalInventory, InventoryError> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || scan_local_directory(&root))
        .await
        .map_err(|e| InventoryError::Join(e.to_string()))?
}
