//! Derives the candidate object-file list for one run, from either a
//! directory walk or a compilation database. Per spec this is trivial glue:
//! we only need the list of paths, never the compiler invocations.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{IndexError, Result};

/// Walk `root` and return every regular file whose extension is `.o`.
/// Symlinked directories are not followed, matching how build trees are
/// usually laid out (no cycles expected, and a cycle here would hang the
/// scan rather than just double-count a file).
pub fn scan_directory(root: &Path) -> Result<Vec<PathBuf>> {
    info!(root = %root.display(), "scanning build directory");
    let mut paths = Vec::new();
    let mut skipped = 0usize;

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("o") {
            paths.push(path.to_path_buf());
        } else {
            skipped += 1;
        }
    }

    debug!(found = paths.len(), skipped, "directory scan complete");
    Ok(paths)
}

/// Pull the list of object-file paths out of a `compile_commands.json`-style
/// file. Each entry is expected to carry an `output` field naming the
/// object file the compilation produced; entries without one, or without an
/// `.o` extension, are skipped rather than treated as a hard error.
pub fn read_compile_db(path: &Path) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(path).map_err(|e| IndexError::Io { path: path.to_path_buf(), source: e })?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| IndexError::BadCompileDb { path: path.to_path_buf(), message: e.to_string() })?;
    let entries = value
        .as_array()
        .ok_or_else(|| IndexError::BadCompileDb { path: path.to_path_buf(), message: "expected a JSON array".to_string() })?;

    let mut paths = Vec::new();
    for entry in entries {
        let candidate = entry
            .get("output")
            .and_then(|v| v.as_str())
            .or_else(|| entry.get("file").and_then(|v| v.as_str()));
        match candidate {
            Some(p) if p.ends_with(".o") => paths.push(PathBuf::from(p)),
            Some(p) => debug!(entry = p, "compile db entry is not an object file, skipping"),
            None => warn!("compile db entry missing output/file field, skipping"),
        }
    }
    Ok(paths)
}
