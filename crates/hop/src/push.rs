use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::local::{LocalFile, LocalInventory, UnreadableFile, build_local_inventory};
use crate::path::{join_remote, normalize_remote};
use crate::remote::{RemoteEvent, stream_remote_inventory};
use crate::skip::should_skip_upload;
use crate::storage::{StorageBackend, StorageError};
use crate::warning::SyncWarning;

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_LISTING_QUEUE: usize = 100;
pub const DEFAULT_UPLOAD_QUEUE: usize = 10;
const OUTCOME_QUEUE: usize = 100;

/// Settings for a single push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    /// Remote directory the local root maps onto. Empty for the zone root.
    pub remote_root: String,
    pub workers: usize,
    pub listing_queue: usize,
    pub upload_queue: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            remote_root: String::new(),
            workers: DEFAULT_WORKERS,
            listing_queue: DEFAULT_LISTING_QUEUE,
            upload_queue: DEFAULT_UPLOAD_QUEUE,
        }
    }
}

impl PushConfig {
    pub fn new(remote_root: impl Into<String>) -> Self {
        Self {
            remote_root: remote_root.into(),
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// A local file queued for upload to `remote_path`.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub file: LocalFile,
    pub remote_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Uploaded,
    Skipped { reason: &'static str },
    Failed { error: String },
}

/// What happened to one local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub path: PathBuf,
    pub relative_path: String,
    pub status: OutcomeStatus,
}

impl UploadOutcome {
    fn for_file(file: &LocalFile, status: OutcomeStatus) -> Self {
        Self {
            path: file.path.clone(),
            relative_path: file.relative_path.clone(),
            status,
        }
    }

    fn uploaded(file: &LocalFile) -> Self {
        Self::for_file(file, OutcomeStatus::Uploaded)
    }

    fn skipped(file: &LocalFile, reason: &'static str) -> Self {
        Self::for_file(file, OutcomeStatus::Skipped { reason })
    }

    fn failed(file: &LocalFile, error: impl Into<String>) -> Self {
        Self::for_file(
            file,
            OutcomeStatus::Failed {
                error: error.into(),
            },
        )
    }

    fn unreadable(file: UnreadableFile) -> Self {
        Self {
            relative_path: file.path.display().to_string(),
            path: file.path,
            status: OutcomeStatus::Failed { error: file.reason },
        }
    }

    /// True for uploaded and skipped files.
    pub fn is_success(&self) -> bool {
        !matches!(self.status, OutcomeStatus::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Skip reason, empty unless the file was skipped.
    pub fn reason(&self) -> &str {
        match self.status {
            OutcomeStatus::Skipped { reason } => reason,
            _ => "",
        }
    }
}

/// Result of a push: one outcome per local file, plus recoverable warnings.
#[derive(Debug, Default)]
pub struct PushReport {
    pub outcomes: Vec<UploadOutcome>,
    pub warnings: Vec<SyncWarning>,
}

impl PushReport {
    pub fn uploaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Uploaded)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

fn noun(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

impl fmt::Display for PushReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (uploaded, skipped, failed) = (self.uploaded(), self.skipped(), self.failed());
        write!(
            f,
            "{uploaded} {} uploaded, {skipped} {} skipped, {failed} {} failed",
            noun(uploaded),
            noun(skipped),
            noun(failed)
        )
    }
}

/// Push `local_root` to the storage zone behind `storage`.
///
/// Never fails as a whole: every problem ends up in the report, either as a
/// failed outcome or as a warning.
pub async fn push_directory(
    storage: Arc<dyn StorageBackend>,
    local_root: &Path,
    config: &PushConfig,
    cancel: CancellationToken,
) -> PushReport {
    push_directory_with(storage, local_root, config, cancel, |_| {}).await
}

/// Like [`push_directory`], calling `observer` with each outcome as soon as
/// it is collected.
pub async fn push_directory_with<F>(
    storage: Arc<dyn StorageBackend>,
    local_root: &Path,
    config: &PushConfig,
    cancel: CancellationToken,
    mut observer: F,
) -> PushReport
where
    F: FnMut(&UploadOutcome),
{
    let inventory = match build_local_inventory(local_root).await {
        Ok(inventory) => inventory,
        Err(err) => {
            log::warn!("local walk failed: {err}");
            let outcome = UploadOutcome {
                path: local_root.to_path_buf(),
                relative_path: local_root.display().to_string(),
                status: OutcomeStatus::Failed {
                    error: err.to_string(),
                },
            };
            observer(&outcome);
            return PushReport {
                outcomes: vec![outcome],
                warnings: Vec::new(),
            };
        }
    };

    push_inventory(storage, inventory, config, cancel, observer).await
}

/// Run the listing, classification and upload stages over an already built
/// local inventory.
pub(crate) async fn push_inventory<F>(
    storage: Arc<dyn StorageBackend>,
    inventory: LocalInventory,
    config: &PushConfig,
    cancel: CancellationToken,
    mut observer: F,
) -> PushReport
where
    F: FnMut(&UploadOutcome),
{
    let LocalInventory {
        files,
        unreadable,
        mut warnings,
    } = inventory;
    let expected = files.len() + unreadable.len();
    let remote_root = normalize_remote(&config.remote_root);

    log::info!(
        "pushing {expected} local files to {}/{remote_root}",
        storage.zone_name()
    );

    let events = stream_remote_inventory(
        storage.clone(),
        &remote_root,
        config.listing_queue,
        cancel.clone(),
    );
    let (upload_tx, upload_rx) = mpsc::channel(config.upload_queue.max(1));
    let (outcome_tx, mut outcome_rx) = mpsc::channel(OUTCOME_QUEUE);
    let upload_rx = Arc::new(Mutex::new(upload_rx));

    let workers: Vec<JoinHandle<()>> = (0..config.workers.max(1))
        .map(|id| {
            tokio::spawn(run_worker(
                id,
                storage.clone(),
                upload_rx.clone(),
                outcome_tx.clone(),
                cancel.clone(),
            ))
        })
        .collect();

    let classifier = Classifier {
        files: files
            .into_values()
            .map(|file| (file.relative_path.clone(), FileState::new(file)))
            .collect(),
        remote_root,
        uploads: upload_tx,
        outcomes: outcome_tx,
        cancel,
    };
    let classifier = tokio::spawn(classifier.run(unreadable, events));

    let mut outcomes = Vec::with_capacity(expected);
    while let Some(outcome) = outcome_rx.recv().await {
        observer(&outcome);
        outcomes.push(outcome);
    }

    match classifier.await {
        Ok(listing_warnings) => warnings.extend(listing_warnings),
        Err(err) => log::error!("classification task failed: {err}"),
    }
    for worker in workers {
        if let Err(err) = worker.await {
            log::error!("upload worker failed: {err}");
        }
    }

    if outcomes.len() != expected {
        log::warn!(
            "expected {expected} outcomes, collected {}",
            outcomes.len()
        );
    }

    PushReport { outcomes, warnings }
}

/// Per-file bookkeeping while the remote listing streams in.
#[derive(Debug)]
struct FileState {
    file: LocalFile,
    checked: bool,
}

impl FileState {
    fn new(file: LocalFile) -> Self {
        Self {
            file,
            checked: false,
        }
    }
}

/// Owns the local state map and turns remote entries into skipped outcomes
/// or upload tasks. Dropping it closes the upload queue and releases its
/// outcome sender.
struct Classifier {
    files: BTreeMap<String, FileState>,
    remote_root: String,
    uploads: mpsc::Sender<UploadTask>,
    outcomes: mpsc::Sender<UploadOutcome>,
    cancel: CancellationToken,
}

impl Classifier {
    async fn run(
        mut self,
        unreadable: Vec<UnreadableFile>,
        mut events: mpsc::Receiver<RemoteEvent>,
    ) -> Vec<SyncWarning> {
        let mut warnings = Vec::new();

        for file in unreadable {
            log::warn!("cannot push {}: {}", file.path.display(), file.reason);
            if self.outcomes.send(UploadOutcome::unreadable(file)).await.is_err() {
                return warnings;
            }
        }

        let mut remote_only = 0usize;
        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                event = events.recv() => event,
            };

            match event {
                None => break,
                Some(RemoteEvent::ListingFailed { path, error }) => {
                    warnings.push(SyncWarning::Listing {
                        path,
                        message: error.to_string(),
                    });
                }
                Some(RemoteEvent::Entry(entry)) => {
                    let Some(state) = self.files.get_mut(&entry.path) else {
                        log::debug!("remote only: {}", entry.path);
                        remote_only += 1;
                        continue;
                    };
                    if state.checked {
                        continue;
                    }
                    state.checked = true;

                    let decision = should_skip_upload(&state.file, &entry);
                    let file = state.file.clone();

                    let delivered = if decision.skip {
                        log::debug!("skip {}: {}", file.relative_path, decision.reason);
                        self.outcomes
                            .send(UploadOutcome::skipped(&file, decision.reason))
                            .await
                            .is_ok()
                    } else {
                        self.dispatch(file).await
                    };
                    if !delivered {
                        return warnings;
                    }
                }
            }
        }
        drop(events);

        if remote_only > 0 {
            log::debug!("{remote_only} remote files have no local counterpart");
        }

        let unchecked: Vec<LocalFile> = self
            .files
            .values()
            .filter(|state| !state.checked)
            .map(|state| state.file.clone())
            .collect();
        log::debug!("{} local files not found remotely", unchecked.len());

        for file in unchecked {
            if !self.dispatch(file).await {
                break;
            }
        }

        warnings
    }

    /// Queue `file` for upload, or record it as failed when the run has been
    /// cancelled. Returns false once the collector is gone.
    async fn dispatch(&self, file: LocalFile) -> bool {
        let error = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => StorageError::Cancelled.to_string(),
            permit = self.uploads.reserve() => match permit {
                Ok(permit) => {
                    permit.send(UploadTask {
                        remote_path: join_remote(&self.remote_root, &file.relative_path),
                        file,
                    });
                    return true;
                }
                Err(_) => "upload workers stopped".to_owned(),
            },
        };

        self.outcomes
            .send(UploadOutcome::failed(&file, error))
            .await
            .is_ok()
    }
}

async fn run_worker(
    id: usize,
    storage: Arc<dyn StorageBackend>,
    queue: Arc<Mutex<mpsc::Receiver<UploadTask>>>,
    outcomes: mpsc::Sender<UploadOutcome>,
    cancel: CancellationToken,
) {
    loop {
        let task = queue.lock().await.recv().await;
        let Some(task) = task else {
            break;
        };

        let outcome = if cancel.is_cancelled() {
            UploadOutcome::failed(&task.file, StorageError::Cancelled.to_string())
        } else {
            upload_one(storage.as_ref(), task, &cancel).await
        };

        if outcomes.send(outcome).await.is_err() {
            break;
        }
    }
    log::debug!("upload worker {id} finished");
}

async fn upload_one(
    storage: &dyn StorageBackend,
    task: UploadTask,
    cancel: &CancellationToken,
) -> UploadOutcome {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StorageError::Cancelled),
        result = transfer(storage, &task) => result,
    };

    match result {
        Ok(()) => {
            log::debug!("uploaded {}", task.remote_path);
            UploadOutcome::uploaded(&task.file)
        }
        Err(err) => {
            log::warn!("failed to upload {}: {err}", task.file.relative_path);
            UploadOutcome::failed(&task.file, err.to_string())
        }
    }
}

async fn transfer(storage: &dyn StorageBackend, task: &UploadTask) -> Result<(), StorageError> {
    let content = tokio::fs::read(&task.file.path).await?;
    storage.upload(&task.remote_path, content).await
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use super::*;
    use crate::skip::{CHECKSUM_MATCH, SIZE_MATCH_NO_CHECKSUM};
    use crate::test_support::InMemoryStorage;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    async fn push(storage: &Arc<InMemoryStorage>, root: &Path, remote_root: &str) -> PushReport {
        push_directory(
            storage.clone(),
            root,
            &PushConfig::new(remote_root),
            CancellationToken::new(),
        )
        .await
    }

    fn outcome<'a>(report: &'a PushReport, rel: &str) -> &'a UploadOutcome {
        report
            .outcomes
            .iter()
            .find(|o| o.relative_path == rel)
            .unwrap_or_else(|| panic!("no outcome for {rel}"))
    }

    #[tokio::test]
    async fn new_files_are_all_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "a");
        write(dir.path(), "b.txt", "bb");
        write(dir.path(), "sub/c.txt", "ccc");
        let storage = Arc::new(InMemoryStorage::new("zone"));

        let report = push(&storage, dir.path(), "site").await;

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.uploaded(), 3);
        assert_eq!(report.skipped(), 0);
        assert!(!report.has_failures());
        assert_eq!(storage.get("site/sub/c.txt").unwrap(), b"ccc");
    }

    #[tokio::test]
    async fn second_push_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "<html/>");
        write(dir.path(), "css/site.css", "body{}");
        let storage = Arc::new(InMemoryStorage::new("zone"));

        let first = push(&storage, dir.path(), "").await;
        assert_eq!(first.uploaded(), 2);
        storage.clear_uploads();

        let second = push(&storage, dir.path(), "").await;
        assert_eq!(second.uploaded(), 0);
        assert_eq!(second.skipped(), 2);
        assert!(storage.uploads().is_empty());
        assert!(second.outcomes.iter().all(|o| o.reason() == CHECKSUM_MATCH));
    }

    #[tokio::test]
    async fn empty_directory_produces_no_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(InMemoryStorage::new("zone"));

        let report = push(&storage, dir.path(), "").await;

        assert!(report.outcomes.is_empty());
        assert_eq!(report.to_string(), "0 files uploaded, 0 files skipped, 0 files failed");
    }

    #[tokio::test]
    async fn mixed_tree_is_classified_per_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "hello");
        write(dir.path(), "b.txt", "HELLO");
        write(dir.path(), "c.txt", "brand new");
        let storage = Arc::new(InMemoryStorage::new("zone"));
        storage.insert("a.txt", b"hello");
        storage.insert("b.txt", b"hello");

        let report = push(&storage, dir.path(), "").await;

        assert_eq!(outcome(&report, "a.txt").reason(), CHECKSUM_MATCH);
        assert_eq!(outcome(&report, "b.txt").status, OutcomeStatus::Uploaded);
        assert_eq!(outcome(&report, "c.txt").status, OutcomeStatus::Uploaded);
        assert_eq!(report.to_string(), "2 files uploaded, 1 file skipped, 0 files failed");

        let mut uploads = storage.uploads();
        uploads.sort();
        assert_eq!(uploads, vec!["b.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn remote_without_checksums_falls_back_to_size() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "same.txt", "12345");
        write(dir.path(), "grown.txt", "123456");
        let storage = Arc::new(InMemoryStorage::new("zone").without_checksums());
        storage.insert("same.txt", b"abcde");
        storage.insert("grown.txt", b"abcde");

        let report = push(&storage, dir.path(), "").await;

        assert_eq!(outcome(&report, "same.txt").reason(), SIZE_MATCH_NO_CHECKSUM);
        assert_eq!(outcome(&report, "grown.txt").status, OutcomeStatus::Uploaded);
    }

    #[tokio::test]
    async fn unreadable_content_is_compared_by_size() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "locked.bin", "secret");
        write(dir.path(), "fresh.bin", "fresh");
        let storage = Arc::new(InMemoryStorage::new("zone"));
        storage.insert("locked.bin", b"public");

        let inventory = crate::local::scan_with(dir.path(), |_| {
            Err(std::io::Error::other("read error"))
        })
        .unwrap();
        let report = push_inventory(
            storage.clone(),
            inventory,
            &PushConfig::default(),
            CancellationToken::new(),
            |_| {},
        )
        .await;

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(outcome(&report, "locked.bin").reason(), SIZE_MATCH_NO_CHECKSUM);
        assert_eq!(outcome(&report, "fresh.bin").status, OutcomeStatus::Uploaded);
        assert_eq!(storage.get("locked.bin").unwrap(), b"public");

        let mut checksum_warnings: Vec<&str> = report
            .warnings
            .iter()
            .filter(|w| matches!(w, SyncWarning::Checksum { .. }))
            .map(|w| w.path())
            .collect();
        checksum_warnings.sort();
        assert_eq!(checksum_warnings, vec!["fresh.bin", "locked.bin"]);
    }

    #[tokio::test]
    async fn remote_only_files_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "a");
        let storage = Arc::new(InMemoryStorage::new("zone"));
        storage.insert("legacy/old.txt", b"old");

        let report = push(&storage, dir.path(), "").await;

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(storage.get("legacy/old.txt").unwrap(), b"old");
    }

    #[tokio::test]
    async fn failed_upload_is_reported_and_others_continue() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ok.txt", "ok");
        write(dir.path(), "bad.txt", "bad");
        let storage = Arc::new(InMemoryStorage::new("zone"));
        storage.fail_upload("site/bad.txt");

        let report = push(&storage, dir.path(), "site").await;

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.relative_path, "bad.txt");
        assert_eq!(failure.error(), Some("HTTP 500: upload failed"));
        assert_eq!(outcome(&report, "ok.txt").status, OutcomeStatus::Uploaded);
    }

    #[tokio::test]
    async fn listing_failure_uploads_subtree_and_warns() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "top.txt", "top");
        write(dir.path(), "assets/app.js", "js");
        let storage = Arc::new(InMemoryStorage::new("zone"));
        storage.insert("top.txt", b"top");
        storage.insert("assets/app.js", b"js");
        storage.fail_listing("assets");

        let report = push(&storage, dir.path(), "").await;

        assert_eq!(outcome(&report, "top.txt").reason(), CHECKSUM_MATCH);
        assert_eq!(outcome(&report, "assets/app.js").status, OutcomeStatus::Uploaded);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path(), "assets");
    }

    #[tokio::test]
    async fn missing_root_yields_single_failure() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("missing");
        let storage = Arc::new(InMemoryStorage::new("zone"));

        let report = push(&storage, &root, "").await;

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.outcomes[0].path, root);
        assert_eq!(storage.list_calls(), 0);
    }

    #[tokio::test]
    async fn cancellation_fails_every_pending_file() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..30 {
            write(dir.path(), &format!("file{i:02}.txt"), "content");
        }
        let storage = Arc::new(InMemoryStorage::new("zone"));
        storage.hang_uploads();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let report = push_directory(
            storage.clone(),
            dir.path(),
            &PushConfig::new("").with_workers(2),
            cancel,
        )
        .await;

        assert_eq!(report.outcomes.len(), 30);
        assert_eq!(report.failed(), 30);
        assert!(report.failures().all(|o| o.error() == Some("cancelled")));
        assert!(storage.uploads().len() <= 2);
    }

    #[tokio::test]
    async fn observer_sees_every_outcome() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "a");
        write(dir.path(), "b.txt", "b");
        let storage = Arc::new(InMemoryStorage::new("zone"));

        let mut seen = Vec::new();
        let report = push_directory_with(
            storage,
            dir.path(),
            &PushConfig::default(),
            CancellationToken::new(),
            |outcome| seen.push(outcome.relative_path.clone()),
        )
        .await;

        seen.sort();
        assert_eq!(seen, vec!["a.txt", "b.txt"]);
        assert_eq!(report.outcomes.len(), 2);
    }

    #[test]
    fn summary_uses_singular_for_one() {
        let file = LocalFile {
            path: PathBuf::from("/x/a.txt"),
            size: 1,
            checksum: String::new(),
            relative_path: "a.txt".into(),
        };
        let report = PushReport {
            outcomes: vec![
                UploadOutcome::uploaded(&file),
                UploadOutcome::failed(&file, "boom"),
                UploadOutcome::failed(&file, "boom"),
            ],
            warnings: Vec::new(),
        };
        assert_eq!(report.to_string(), "1 file uploaded, 0 files skipped, 2 files failed");
    }
}
