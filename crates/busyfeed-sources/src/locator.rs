//! Source discovery over a Radicale-style collections tree.
//!
//! Local calendars are `*.ics` files. Subscribed calendars are described by
//! `*.Radicale.props` sidecars whose JSON object carries the remote URL under
//! `CS:source`. Radicale's own cache directories are never entered.

use std::fs::{self, FileType};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::descriptor::SourceDescriptor;
use crate::error::{SourceError, SourceResult};

/// Path fragment marking a cache subtree.
pub const CACHE_MARKER: &str = ".Radicale.cache";

/// Suffix of local calendar files.
pub const CALENDAR_SUFFIX: &str = ".ics";

/// Suffix of collection property sidecars.
pub const SIDECAR_SUFFIX: &str = ".Radicale.props";

/// Sidecar key holding a subscription URL.
pub const SOURCE_KEY: &str = "CS:source";

/// Walks `root` and returns every calendar source found beneath it.
///
/// Entries are visited in file-name order. Unreadable directories, files and
/// sidecars are logged and skipped; this function never fails.
pub fn locate_sources(root: &Path) -> Vec<SourceDescriptor> {
    let mut found = Vec::new();

    if !root.is_dir() {
        warn!(root = %root.display(), "Collections root is not a readable directory");
        return found;
    }

    walk(root, &mut found);
    debug!(root = %root.display(), count = found.len(), "Located calendar sources");
    found
}

fn walk(dir: &Path, found: &mut Vec<SourceDescriptor>) {
    if is_cache_path(dir) {
        trace!(path = %dir.display(), "Skipping cache directory");
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Failed to read directory");
            return;
        }
    };

    let mut children: Vec<(PathBuf, FileType)> = entries
        .filter_map(|entry| match entry.and_then(|e| Ok((e.path(), e.file_type()?))) {
            Ok(child) => Some(child),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to read directory entry");
                None
            }
        })
        .collect();
    children.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, file_type) in children {
        if file_type.is_dir() {
            walk(&path, found);
            continue;
        }

        // Symlinked files are followed, symlinked directories are not.
        let is_file = file_type.is_file() || (file_type.is_symlink() && path.is_file());
        if !is_file {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if name.ends_with(CALENDAR_SUFFIX) {
            found.push(SourceDescriptor::Local(path));
        } else if name.ends_with(SIDECAR_SUFFIX) {
            match read_sidecar(&path) {
                Ok(Some(descriptor)) => found.push(descriptor),
                Ok(None) => trace!(path = %path.display(), "Sidecar has no subscription"),
                Err(e) => warn!(source = %path.display(), error = %e, "Skipping sidecar"),
            }
        }
    }
}

fn is_cache_path(path: &Path) -> bool {
    path.to_string_lossy().contains(CACHE_MARKER)
}

/// Reads a sidecar and returns its subscription, if it declares one.
pub fn read_sidecar(path: &Path) -> SourceResult<Option<SourceDescriptor>> {
    let origin = path.display().to_string();

    let content = fs::read_to_string(path).map_err(|e| {
        SourceError::discovery("failed to read sidecar")
            .with_origin(&origin)
            .with_cause(e)
    })?;

    let props: Value = serde_json::from_str(&content).map_err(|e| {
        SourceError::discovery("sidecar is not valid JSON")
            .with_origin(&origin)
            .with_cause(e)
    })?;

    let Some(object) = props.as_object() else {
        return Err(SourceError::discovery("sidecar is not a JSON object").with_origin(&origin));
    };

    match object.get(SOURCE_KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(url)) if url.trim().is_empty() => Ok(None),
        Some(Value::String(url)) => SourceDescriptor::remote(url)
            .map(Some)
            .map_err(|e| e.with_origin(&origin)),
        Some(_) => Err(
            SourceError::discovery(format!("{} is not a string", SOURCE_KEY)).with_origin(&origin),
        ),
    }
}
