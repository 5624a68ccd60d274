//! `manifest` + `schema.version`: the store's only consistent-read surface.
//!
//! The manifest maps every indexed file path to the shard that currently
//! holds its records and the mtime it was indexed at. Readers load the
//! manifest once and never see a partially-written one: writers always
//! write to a `.tmp` file in the same directory and rename it into place.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Bump when the on-disk shard/manifest format changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub shard_id: String,
    pub mtime_ns: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub entries: BTreeMap<String, FileEntry>,
    /// Monotonic counter handed out to the next shard a writer creates.
    /// Embedded as a zero-padded prefix in the shard id itself (see
    /// `shard::new_shard_id`) so sorting shard ids by string also sorts
    /// them by commit order, not by the random uuid suffix. Only advances
    /// when a writer actually commits a non-empty shard, so a no-op run
    /// leaves the manifest byte-identical (spec's idempotence invariant).
    #[serde(default)]
    pub next_shard_seq: u64,
}

impl Manifest {
    pub fn load(store_dir: &Path) -> Result<Manifest> {
        let path = manifest_path(store_dir);
        if !path.exists() {
            return Ok(Manifest::default());
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Atomically replace the on-disk manifest: write `manifest.tmp`, then
    /// rename over `manifest`. Readers never observe a half-written file.
    pub fn save(&self, store_dir: &Path) -> Result<()> {
        let tmp = manifest_path(store_dir).with_extension("tmp");
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, text)?;
        fs::rename(&tmp, manifest_path(store_dir))?;
        Ok(())
    }

    /// Shard ids currently referenced by at least one file entry.
    pub fn referenced_shards(&self) -> std::collections::BTreeSet<&str> {
        self.entries.values().map(|e| e.shard_id.as_str()).collect()
    }
}

pub fn manifest_path(store_dir: &Path) -> std::path::PathBuf {
    store_dir.join("manifest")
}

fn schema_version_path(store_dir: &Path) -> std::path::PathBuf {
    store_dir.join("schema.version")
}

/// Read `schema.version`, creating it (set to [`SCHEMA_VERSION`]) if the
/// store directory is brand new. Errors if an existing store was built by
/// an incompatible schema version.
pub fn check_or_init_schema_version(store_dir: &Path) -> Result<()> {
    let path = schema_version_path(store_dir);
    if !path.exists() {
        fs::create_dir_all(store_dir)?;
        fs::write(&path, SCHEMA_VERSION.to_string())?;
        return Ok(());
    }
    let text = fs::read_to_string(&path)?;
    let found: u32 = text
        .trim()
        .parse()
        .map_err(|_| StoreError::IndexError(format!("unreadable schema.version: {text:?}")))?;
    if found != SCHEMA_VERSION {
        return Err(StoreError::SchemaVersionMismatch {
            found,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut m = Manifest::default();
        m.entries.insert(
            "/build/a.o".into(),
            FileEntry {
                shard_id: "shard-1".into(),
                mtime_ns: 42,
            },
        );
        let dir = tempfile::tempdir().unwrap();
        m.save(dir.path()).unwrap();
        let loaded = Manifest::load(dir.path()).unwrap();
        assert_eq!(loaded, m);
    }

    #[test]
    fn missing_manifest_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let m = Manifest::load(dir.path()).unwrap();
        assert!(m.entries.is_empty());
    }

    #[test]
    fn schema_version_is_created_for_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        check_or_init_schema_version(dir.path()).unwrap();
        check_or_init_schema_version(dir.path()).unwrap(); // idempotent
    }

    #[test]
    fn schema_version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(schema_version_path(dir.path()), "999").unwrap();
        let err = check_or_init_schema_version(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::SchemaVersionMismatch { found: 999, .. }));
    }
}
