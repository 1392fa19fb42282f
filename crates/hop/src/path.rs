use std::path::{Component, Path};

/// Replace Windows separators with forward slashes.
pub fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Canonical form of a remote path: forward slashes, no leading or trailing
/// slash, no empty segments. The zone root is the empty string.
pub fn normalize_remote(path: &str) -> String {
    to_forward_slashes(path)
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a remote directory and a child name or relative path.
pub fn join_remote(dir: &str, child: &str) -> String {
    let dir = normalize_remote(dir);
    let child = normalize_remote(child);

    match (dir.is_empty(), child.is_empty()) {
        (true, _) => child,
        (false, true) => dir,
        (false, false) => format!("{dir}/{child}"),
    }
}

/// Express a full remote path relative to the sync root.
/// Returns the path unchanged when it does not live under `root`.
pub fn strip_remote_root(root: &str, full_path: &str) -> String {
    let root = normalize_remote(root);
    let full_path = normalize_remote(full_path);

    if root.is_empty() {
        return full_path;
    }

    match full_path.strip_prefix(&root) {
        Some(rest) if rest.starts_with('/') => rest[1..].to_owned(),
        Some("") => String::new(),
        _ => full_path,
    }
}

/// Forward-slash path of `path` relative to `root`.
///
/// Returns `None` when `path` is not under `root` or a component is not
/// valid UTF-8 (remote paths must be strings).
pub fn local_relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();

    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if segments.is_empty() {
        return None;
    }

    Some(segments.join("/"))
}
