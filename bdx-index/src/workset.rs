//! Computes the added/changed/removed/unchanged split between one run's
//! candidate object files and the manifest left by the previous run.

use std::collections::HashSet;
use std::path::Path;

use bdx_store::Manifest;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: String,
    pub mtime_ns: u64,
}

#[derive(Debug, Default)]
pub struct WorkSet {
    pub added: Vec<Candidate>,
    pub changed: Vec<Candidate>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}

/// Read each candidate path's current mtime. A path that vanished between
/// discovery and this read (a build mid-flight) is dropped silently; it'll
/// show up as `removed` on the next run instead of failing this one.
pub fn read_candidates(paths: &[std::path::PathBuf]) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let Ok(meta) = std::fs::metadata(path) else { continue };
        let Ok(modified) = meta.modified() else { continue };
        let Ok(since_epoch) = modified.duration_since(std::time::UNIX_EPOCH) else { continue };
        out.push(Candidate { path: path_key(path), mtime_ns: since_epoch.as_nanos() as u64 });
    }
    out
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub fn compute(candidates: Vec<Candidate>, manifest: &Manifest) -> WorkSet {
    let mut set = WorkSet::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());

    for candidate in candidates {
        seen.insert(candidate.path.clone());
        match manifest.entries.get(&candidate.path) {
            None => set.added.push(candidate),
            Some(entry) if entry.mtime_ns != candidate.mtime_ns => set.changed.push(candidate),
            Some(_) => set.unchanged += 1,
        }
    }

    for path in manifest.entries.keys() {
        if !seen.contains(path) {
            set.removed.push(path.clone());
        }
    }

    info!(
        added = set.added.len(),
        changed = set.changed.len(),
        removed = set.removed.len(),
        unchanged = set.unchanged,
        "work set computed"
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdx_store::FileEntry;

    fn manifest_with(entries: &[(&str, u64)]) -> Manifest {
        let mut m = Manifest::default();
        for (path, mtime) in entries {
            m.entries.insert((*path).to_string(), FileEntry { shard_id: "s1".into(), mtime_ns: *mtime });
        }
        m
    }

    #[test]
    fn new_path_is_added() {
        let manifest = manifest_with(&[]);
        let set = compute(vec![Candidate { path: "/a.o".into(), mtime_ns: 1 }], &manifest);
        assert_eq!(set.added.len(), 1);
        assert!(set.changed.is_empty());
        assert!(set.removed.is_empty());
    }

    #[test]
    fn differing_mtime_is_changed() {
        let manifest = manifest_with(&[("/a.o", 1)]);
        let set = compute(vec![Candidate { path: "/a.o".into(), mtime_ns: 2 }], &manifest);
        assert_eq!(set.changed.len(), 1);
        assert!(set.added.is_empty());
    }

    #[test]
    fn matching_mtime_is_unchanged() {
        let manifest = manifest_with(&[("/a.o", 1)]);
        let set = compute(vec![Candidate { path: "/a.o".into(), mtime_ns: 1 }], &manifest);
        assert_eq!(set.unchanged, 1);
        assert!(set.added.is_empty() && set.changed.is_empty());
    }

    #[test]
    fn manifest_path_missing_from_candidates_is_removed() {
        let manifest = manifest_with(&[("/a.o", 1), ("/b.o", 1)]);
        let set = compute(vec![Candidate { path: "/a.o".into(), mtime_ns: 1 }], &manifest);
        assert_eq!(set.removed, vec!["/b.o".to_string()]);
    }
}
