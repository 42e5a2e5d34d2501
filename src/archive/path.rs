//! Mapping archive entry names to destination paths.
//!
//! Entry names come from untrusted archives. Everything that reaches the
//! filesystem goes through [`sanitize`] first, so a resolved path can never
//! land outside the destination root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// An entry name that would resolve outside the destination root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsafe entry path '{name}': {reason}")]
pub struct UnsafePath {
    pub name: String,
    pub reason: &'static str,
}

/// The top-level folder of the archive's first entry.
///
/// Returns the folder with a trailing `/`, or an empty string when the first
/// entry sits at the top level.
pub fn base_prefix(first_entry_name: &str) -> String {
    match first_entry_name.split_once('/') {
        Some((root, _)) if !root.is_empty() => format!("{root}/"),
        _ => String::new(),
    }
}

/// The root folder shared by every name in `file_names`.
///
/// Taken from the first name with [`base_prefix`], and empty unless all
/// other names start with it too.
pub fn common_root<'a>(mut file_names: impl Iterator<Item = &'a str>) -> String {
    let Some(first) = file_names.next() else {
        return String::new();
    };
    let base = base_prefix(first);
    if base.is_empty() || !file_names.all(|name| name.starts_with(&base)) {
        return String::new();
    }
    base
}

/// Strip `base` from `raw_name` when it is a prefix of it.
pub fn relative_path<'a>(base: &str, raw_name: &'a str) -> &'a str {
    if base.is_empty() {
        return raw_name;
    }
    raw_name.strip_prefix(base).unwrap_or(raw_name)
}

/// Everything before the last `/` of a relative entry path.
pub fn containing_directory(relative: &str) -> &str {
    match relative.rfind('/') {
        Some(idx) => &relative[..idx],
        None => "",
    }
}

/// Lexically normalize an entry name into a relative path.
///
/// Both `/` and `\` separate components. `.` and empty components are
/// dropped and `..` pops the previous component. Absolute names, drive
/// prefixes and `..` that would climb above the root are rejected.
pub fn sanitize(name: &str) -> Result<PathBuf, UnsafePath> {
    let reject = |reason| UnsafePath {
        name: name.to_string(),
        reason,
    };

    if name.starts_with('/') || name.starts_with('\\') {
        return Err(reject("absolute path"));
    }
    if name.contains('\0') {
        return Err(reject("contains a NUL byte"));
    }

    let mut parts: Vec<&str> = Vec::new();
    for component in name.split(['/', '\\']) {
        match component {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(reject("escapes the destination root"));
                }
            }
            part if part.contains(':') => return Err(reject("drive or stream prefix")),
            part => parts.push(part),
        }
    }

    if parts.is_empty() {
        return Err(reject("empty path"));
    }
    Ok(parts.iter().collect())
}

/// Join a sanitized relative path onto the destination root.
pub fn combine(destination_root: &Path, relative: &Path) -> PathBuf {
    destination_root.join(relative)
}

/// Creates containing directories lazily during an extraction.
///
/// Only the most recently created directory is remembered: entries are
/// usually grouped by folder, so consecutive files in the same folder skip
/// the filesystem call.
#[derive(Debug, Default)]
pub struct DirectoryTracker {
    last_created: Option<PathBuf>,
}

impl DirectoryTracker {
    /// A tracker that has created nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `dir` exists. An existing directory is not an error.
    pub fn ensure(&mut self, dir: &Path) -> io::Result<()> {
        if self.last_created.as_deref() == Some(dir) {
            return Ok(());
        }
        fs::create_dir_all(dir)?;
        self.last_created = Some(dir.to_path_buf());
        Ok(())
    }

    /// The directory the previous [`ensure`](Self::ensure) call created.
    pub fn last_created(&self) -> Option<&Path> {
        self.last_created.as_deref()
    }
}
