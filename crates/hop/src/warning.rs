use std::fmt;

/// A recoverable problem met during a push.
///
/// These never abort a run. They are collected into the report so the
/// caller decides how to present them (the CLI prints them to stderr).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncWarning {
    /// The checksum of a local file could not be computed; the file is
    /// compared by size only.
    Checksum { path: String, message: String },
    /// An entry below the local root could not be read during the walk.
    Walk { path: String, message: String },
    /// A remote directory could not be listed; its subtree was not compared.
    Listing { path: String, message: String },
}

impl SyncWarning {
    pub fn path(&self) -> &str {
        match self {
            Self::Checksum { path, .. } | Self::Walk { path, .. } | Self::Listing { path, .. } => {
                path
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Checksum { message, .. }
            | Self::Walk { message, .. }
            | Self::Listing { message, .. } => message,
        }
    }
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checksum { path, message } => {
                write!(f, "could not calculate checksum for {path}: {message}")
            }
            Self::Walk { path, message } => write!(f, "could not read {path}: {message}"),
            Self::Listing { path, message } => {
                let path = if path.is_empty() { "/" } else { path.as_str() };
                write!(f, "could not list remote files in {path}: {message}")
            }
        }
    }
}
