//! Top-level store handle: open, lock, begin/commit/cancel a write, and GC
//! orphaned shard directories left behind by an interrupted writer.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::error::{Result, StoreError};
use crate::manifest::{self, FileEntry, Manifest};
use crate::shard::{self, LocalId, Shard, ShardWriter};

const LOCK_FILE: &str = ".lock";

/// A store directory opened for reading. Readers never take the lock file
/// and always see a fully-committed manifest.
pub struct Store {
    root: PathBuf,
    manifest: Manifest,
}

impl Store {
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn open(root: &Path) -> Result<Store> {
        manifest::check_or_init_schema_version(root)?;
        let manifest = Manifest::load(root)?;
        info!(files = manifest.entries.len(), "opened store");
        Ok(Store {
            root: root.to_path_buf(),
            manifest,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every shard referenced by the manifest, newest-commit-last.
    /// Ids sort by their leading commit-sequence number (see
    /// `shard::new_shard_id`), so this is a true commit-order sort, not an
    /// accident of uuid string ordering; `bdx-search` merges across these,
    /// letting the later shard in this list win ties per spec.
    pub fn load_shards(&self) -> Result<Vec<Shard>> {
        let mut ids: Vec<&str> = self.manifest.referenced_shards().into_iter().collect();
        ids.sort_unstable();
        ids.into_iter()
            .map(|id| Shard::open(&shard::shard_dir(&self.root, id), id.to_string()))
            .collect()
    }

    /// Acquire the single-writer lock and prepare a new shard for this run.
    /// Also garbage-collects shard directories left over from a prior
    /// writer that crashed or was killed before committing.
    #[instrument(skip(self))]
    pub fn begin_write(&self) -> Result<WriteTxn> {
        let lock = LockGuard::acquire(&self.root)?;
        gc_orphan_shards(&self.root, &self.manifest)?;
        let shard_seq = self.manifest.next_shard_seq;
        let shard_id = shard::new_shard_id(shard_seq);
        Ok(WriteTxn {
            root: self.root.clone(),
            base_manifest: self.manifest.clone(),
            shard_id,
            shard_seq,
            writer: ShardWriter::new(),
            touched_paths: Vec::new(),
            _lock: lock,
        })
    }
}

/// A flag a coordinator can poll between units of work to learn it has been
/// asked to stop. Cloning shares the same underlying flag, so a signal
/// handler (or any other thread) can call [`CancelToken::cancel`] while the
/// indexer checks [`CancelToken::is_cancelled`] between files/batches.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(std::sync::Arc<std::sync::atomic::AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// An open write transaction: one new shard, plus manifest edits, that only
/// take effect on [`WriteTxn::commit`].
pub struct WriteTxn {
    root: PathBuf,
    base_manifest: Manifest,
    shard_id: String,
    shard_seq: u64,
    writer: ShardWriter,
    touched_paths: Vec<(String, u64)>,
    _lock: LockGuard,
}

impl WriteTxn {
    /// Record a file's freshly-parsed symbols under this run's shard.
    pub fn add_file(&mut self, path: &str, mtime_ns: u64, records: Vec<bdx_schema::SymbolRecord>) {
        for r in records {
            self.writer.push(r);
        }
        self.touched_paths.push((path.to_string(), mtime_ns));
    }

    /// Mark a file as removed: its manifest entry disappears and none of
    /// its old records are reachable from the new manifest.
    pub fn remove_file(&mut self, path: &str) {
        self.touched_paths.retain(|(p, _)| p != path);
        self.base_manifest.entries.remove(path);
    }

    pub fn shard_record_count(&self) -> usize {
        self.writer.len()
    }

    /// Flush buffered records to `records.jsonl` now if they exceed
    /// `budget` bytes, bounding how much of a run's output is held in
    /// memory at once. `budget == 0` disables mid-run flushing.
    pub fn flush_write_buffer(&mut self, budget: usize) -> Result<()> {
        let dir = shard::shard_dir(&self.root, &self.shard_id);
        self.writer.flush_if_over_budget(&dir, budget)
    }

    /// Finalize the shard (if non-empty), rewrite and atomically rename the
    /// manifest, then GC any shard the new manifest no longer references.
    #[instrument(skip(self))]
    pub fn commit(mut self) -> Result<String> {
        let mut manifest = self.base_manifest;

        let shard_created = !self.writer.is_empty();
        if shard_created {
            let dir = shard::shard_dir(&self.root, &self.shard_id);
            std::mem::take(&mut self.writer).finalize(&dir)?;
            manifest.next_shard_seq = self.shard_seq + 1;
        }

        for (path, mtime_ns) in &self.touched_paths {
            manifest.entries.insert(
                path.clone(),
                FileEntry {
                    shard_id: self.shard_id.clone(),
                    mtime_ns: *mtime_ns,
                },
            );
        }

        manifest.save(&self.root)?;
        info!(shard = %self.shard_id, files = self.touched_paths.len(), "committed write");

        gc_orphan_shards(&self.root, &manifest)?;
        Ok(self.shard_id)
    }

    /// Discard this run: delete the uncommitted shard directory (if any
    /// was started) and release the lock. The manifest is untouched.
    pub fn cancel(self) -> Result<()> {
        let dir = shard::shard_dir(&self.root, &self.shard_id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        warn!(shard = %self.shard_id, "write cancelled, no commit");
        Ok(())
    }
}

/// Delete every `shard-*` directory not referenced by `manifest`. Safe to
/// call at any time: a directory only exists unreferenced if an earlier
/// writer created it and was interrupted before its commit.
fn gc_orphan_shards(store_dir: &Path, manifest: &Manifest) -> Result<()> {
    let referenced = manifest.referenced_shards();
    for dir in shard::list_shard_dirs(store_dir)? {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(id) = name.strip_prefix("shard-") else {
            continue;
        };
        if !referenced.contains(id) {
            warn!(shard = id, "removing orphaned shard directory");
            fs::remove_dir_all(&dir)?;
        }
    }
    Ok(())
}

/// Exclusive-create lock file; held for the lifetime of a [`WriteTxn`] and
/// removed on drop. `fs::OpenOptions::create_new` is atomic on every
/// platform we target, so two concurrent writers can never both succeed.
struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(store_dir: &Path) -> Result<LockGuard> {
        fs::create_dir_all(store_dir)?;
        let path = store_dir.join(LOCK_FILE);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut f) => {
                use std::io::Write;
                let _ = write!(f, "{}", std::process::id());
                Ok(LockGuard { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::LockContention(path))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Doc ids present in every shard but not matched by a sub-plan; used by
/// the searcher to implement `NOT` without `bdx-store` knowing about the
/// query language.
pub fn complement(all: impl Iterator<Item = LocalId>, matched: &[LocalId]) -> Vec<LocalId> {
    let matched: std::collections::BTreeSet<LocalId> = matched.iter().copied().collect();
    all.filter(|id| !matched.contains(id)).collect()
}

/// Merge manifest entries into a per-shard map of (path, mtime) for
/// computing a work-set without re-reading shard contents (used by
/// `bdx-index`).
pub fn paths_by_shard(manifest: &Manifest) -> BTreeMap<&str, Vec<(&str, u64)>> {
    let mut out: BTreeMap<&str, Vec<(&str, u64)>> = BTreeMap::new();
    for (path, entry) in &manifest.entries {
        out.entry(entry.shard_id.as_str())
            .or_default()
            .push((path.as_str(), entry.mtime_ns));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdx_schema::{SymbolRecord, SymbolType};

    fn rec(name: &str) -> SymbolRecord {
        SymbolRecord {
            path: "/build/a.o".into(),
            name: name.into(),
            section: ".text".into(),
            r#type: SymbolType::Func,
            address: 0,
            size: 4,
            mtime_ns: 7,
            source: String::new(),
            relocations: vec![],
        }
    }

    #[test]
    fn open_on_fresh_dir_has_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert!(store.manifest().entries.is_empty());
    }

    #[test]
    fn commit_makes_records_visible_to_a_new_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut txn = store.begin_write().unwrap();
        txn.add_file("/build/a.o", 7, vec![rec("foo")]);
        let shard_id = txn.commit().unwrap();

        let reopened = Store::open(dir.path()).unwrap();
        assert_eq!(reopened.manifest().entries.len(), 1);
        let shards = reopened.load_shards().unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].shard_id, shard_id);
        assert_eq!(shards[0].doc_count(), 1);
    }

    #[test]
    fn second_writer_is_rejected_while_first_holds_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let _txn = store.begin_write().unwrap();
        let err = store.begin_write().unwrap_err();
        assert!(matches!(err, StoreError::LockContention(_)));
    }

    #[test]
    fn cancel_leaves_manifest_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut txn = store.begin_write().unwrap();
        txn.add_file("/build/a.o", 7, vec![rec("foo")]);
        txn.cancel().unwrap();

        let reopened = Store::open(dir.path()).unwrap();
        assert!(reopened.manifest().entries.is_empty());
        assert!(shard::list_shard_dirs(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn removing_a_file_drops_its_manifest_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut txn = store.begin_write().unwrap();
        txn.add_file("/build/a.o", 7, vec![rec("foo")]);
        txn.commit().unwrap();

        let store = Store::open(dir.path()).unwrap();
        let mut txn = store.begin_write().unwrap();
        txn.remove_file("/build/a.o");
        txn.commit().unwrap();

        let reopened = Store::open(dir.path()).unwrap();
        assert!(reopened.manifest().entries.is_empty());
    }
}
