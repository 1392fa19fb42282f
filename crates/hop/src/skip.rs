use crate::local::LocalFile;
use crate::storage::RemoteEntry;

pub const CHECKSUM_MATCH: &str = "checksum match";
pub const SIZE_MATCH_NO_CHECKSUM: &str = "size match (no checksum)";

/// Whether a local file can be left alone, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipDecision {
    pub skip: bool,
    /// Empty when `skip` is false.
    pub reason: &'static str,
}

impl SkipDecision {
    const UPLOAD: Self = Self {
        skip: false,
        reason: "",
    };

    fn skip(reason: &'static str) -> Self {
        Self { skip: true, reason }
    }
}

/// Decide whether `local` already matches `remote`.
///
/// A size mismatch always uploads. When both sides carry a checksum the
/// checksums decide. When either side lacks one, equal sizes are trusted.
pub fn should_skip_upload(local: &LocalFile, remote: &RemoteEntry) -> SkipDecision {
    if local.size != remote.size {
        return SkipDecision::UPLOAD;
    }

    if !local.checksum.is_empty() && !remote.checksum.is_empty() {
        if local.checksum == remote.checksum {
            return SkipDecision::skip(CHECKSUM_MATCH);
        }
        return SkipDecision::UPLOAD;
    }

    SkipDecision::skip(SIZE_MATCH_NO_CHECKSUM)
}
