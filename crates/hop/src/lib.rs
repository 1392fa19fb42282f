pub mod checksum;
pub mod check;
pub mod dns;
pub mod edge_rule;
pub mod local;
pub mod path;
pub mod push;
pub mod remote;
pub mod skip;
pub mod storage;
pub mod warning;

pub use check::{CheckIssue, IssueKind, Severity};
pub use dns::{DnsRecord, DnsZone, HostnameCheck, HostnameStatus, MatchedRecord};
pub use edge_rule::{EdgeRule, Hostname, Trigger};
pub use local::{InventoryError, LocalFile, LocalInventory, UnreadableFile};
pub use push::{
    OutcomeStatus, PushConfig, PushReport, UploadOutcome, UploadTask, push_directory,
    push_directory_with,
};
pub use remote::{RemoteEvent, collect_remote_inventory, stream_remote_inventory};
pub use skip::{SkipDecision, should_skip_upload};
pub use storage::{RemoteEntry, StorageBackend, StorageError, StorageZone};
pub use warning::SyncWarning;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
