//! An immutable shard: one `records.jsonl` file plus postings rebuilt in
//! memory on load. A shard never changes after it is committed; replacing a
//! file's records means writing a new shard and repointing the manifest.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bdx_schema::tokenize::{tokenize_identifier, tokenize_path};
use bdx_schema::SymbolRecord;

use crate::error::Result;

/// Local, shard-relative document id (index into [`Shard::records`]).
pub type LocalId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokSlot {
    Name,
    Path,
    Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WholeSlot {
    Name,
    Path,
    Source,
    Section,
    Type,
    Relocations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RangeSlot {
    Address,
    Size,
    Mtime,
}

/// Crude estimate of a record's serialized weight, used only to decide when
/// the write buffer has grown past its configured budget. Doesn't need to be
/// exact, just proportional to what `serde_json` will actually write.
fn estimated_record_bytes(r: &SymbolRecord) -> usize {
    64 + r.path.len()
        + r.name.len()
        + r.section.len()
        + r.source.len()
        + r.relocations.iter().map(|s| s.len() + 1).sum::<usize>()
}

/// Accumulates records for one in-progress shard. Records buffer in memory
/// until either the run's write-buffer budget is exceeded
/// ([`ShardWriter::flush_if_over_budget`]) or the shard is finalized at
/// commit, at which point the buffer is appended to `records.jsonl` and
/// cleared; `records.jsonl` itself may therefore be written across several
/// appends rather than in one pass.
#[derive(Debug, Default)]
pub struct ShardWriter {
    buffered: Vec<SymbolRecord>,
    buffered_bytes: usize,
    total_records: usize,
}

impl ShardWriter {
    pub fn new() -> Self {
        ShardWriter::default()
    }

    pub fn push(&mut self, record: SymbolRecord) {
        self.buffered_bytes += estimated_record_bytes(&record);
        self.buffered.push(record);
        self.total_records += 1;
    }

    /// Whether this shard has seen any record at all, across every flush.
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }

    pub fn len(&self) -> usize {
        self.total_records
    }

    /// If the buffered-but-unwritten records exceed `budget` bytes, append
    /// them to `shard_dir/records.jsonl` now and clear the buffer. This is
    /// the indexer's backpressure point: it bounds how many parsed records a
    /// run holds in memory at once instead of collecting the whole run's
    /// output before writing anything. `budget == 0` disables flushing
    /// (everything is written once at `finalize`).
    pub fn flush_if_over_budget(&mut self, shard_dir: &Path, budget: usize) -> Result<()> {
        if budget == 0 || self.buffered_bytes < budget || self.buffered.is_empty() {
            return Ok(());
        }
        self.append_to(shard_dir)
    }

    fn append_to(&mut self, shard_dir: &Path) -> Result<()> {
        fs::create_dir_all(shard_dir)?;
        let f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(shard_dir.join("records.jsonl"))?;
        let mut w = BufWriter::new(f);
        for record in &self.buffered {
            serde_json::to_writer(&mut w, record)?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
        self.buffered.clear();
        self.buffered_bytes = 0;
        Ok(())
    }

    /// Append whatever remains buffered into `shard_dir/records.jsonl`.
    /// A no-op if every record was already flushed mid-run.
    pub fn finalize(mut self, shard_dir: &Path) -> Result<()> {
        if self.buffered.is_empty() {
            return Ok(());
        }
        self.append_to(shard_dir)
    }
}

/// A loaded, queryable shard: records plus in-memory posting lists.
pub struct Shard {
    pub shard_id: String,
    pub records: Vec<SymbolRecord>,
    tokens: BTreeMap<(TokSlot, String), Vec<LocalId>>,
    whole: BTreeMap<(WholeSlot, String), Vec<LocalId>>,
    ranges: BTreeMap<RangeSlot, Vec<(u64, LocalId)>>,
}

impl Shard {
    pub fn open(shard_dir: &Path, shard_id: String) -> Result<Shard> {
        let f = File::open(shard_dir.join("records.jsonl"))?;
        let reader = BufReader::new(f);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str::<SymbolRecord>(&line)?);
        }
        Ok(Shard::from_records(shard_id, records))
    }

    pub fn from_records(shard_id: String, records: Vec<SymbolRecord>) -> Shard {
        let mut tokens: BTreeMap<(TokSlot, String), Vec<LocalId>> = BTreeMap::new();
        let mut whole: BTreeMap<(WholeSlot, String), Vec<LocalId>> = BTreeMap::new();
        let mut ranges: BTreeMap<RangeSlot, Vec<(u64, LocalId)>> = BTreeMap::new();

        for (i, r) in records.iter().enumerate() {
            let id = i as LocalId;

            for tok in tokenize_identifier(&r.name) {
                tokens.entry((TokSlot::Name, tok)).or_default().push(id);
            }
            whole.entry((WholeSlot::Name, r.name.clone())).or_default().push(id);

            for tok in tokenize_path(&r.path) {
                tokens.entry((TokSlot::Path, tok)).or_default().push(id);
            }
            whole.entry((WholeSlot::Path, r.path.clone())).or_default().push(id);

            if !r.source.is_empty() {
                for tok in tokenize_path(&r.source) {
                    tokens.entry((TokSlot::Source, tok)).or_default().push(id);
                }
                whole
                    .entry((WholeSlot::Source, r.source.clone()))
                    .or_default()
                    .push(id);
            }

            whole
                .entry((WholeSlot::Section, r.section.clone()))
                .or_default()
                .push(id);
            whole
                .entry((WholeSlot::Type, r.r#type.as_str().to_string()))
                .or_default()
                .push(id);

            for reloc in &r.relocations {
                if reloc.is_empty() {
                    continue;
                }
                whole
                    .entry((WholeSlot::Relocations, reloc.clone()))
                    .or_default()
                    .push(id);
            }

            ranges.entry(RangeSlot::Address).or_default().push((r.address, id));
            ranges.entry(RangeSlot::Size).or_default().push((r.size, id));
            ranges.entry(RangeSlot::Mtime).or_default().push((r.mtime_ns, id));
        }

        for list in ranges.values_mut() {
            list.sort_unstable_by_key(|(v, _)| *v);
        }

        Shard {
            shard_id,
            records,
            tokens,
            whole,
            ranges,
        }
    }

    pub fn record(&self, id: LocalId) -> &SymbolRecord {
        &self.records[id as usize]
    }

    pub fn doc_count(&self) -> usize {
        self.records.len()
    }

    pub fn all_ids(&self) -> impl Iterator<Item = LocalId> + '_ {
        0..self.records.len() as LocalId
    }

    pub fn token(&self, slot: TokSlot, token: &str) -> &[LocalId] {
        self.tokens
            .get(&(slot, token.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn token_prefix(&self, slot: TokSlot, prefix: &str) -> Vec<LocalId> {
        self.tokens
            .range((slot, prefix.to_string())..)
            .take_while(|((s, t), _)| *s == slot && t.starts_with(prefix))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    pub fn whole(&self, slot: WholeSlot, term: &str) -> &[LocalId] {
        self.whole
            .get(&(slot, term.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn whole_prefix(&self, slot: WholeSlot, prefix: &str) -> Vec<LocalId> {
        self.whole
            .range((slot, prefix.to_string())..)
            .take_while(|((s, t), _)| *s == slot && t.starts_with(prefix))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    pub fn range(&self, slot: RangeSlot, lo: Option<u64>, hi: Option<u64>) -> Vec<LocalId> {
        let lo = lo.unwrap_or(u64::MIN);
        let hi = hi.unwrap_or(u64::MAX);
        match self.ranges.get(&slot) {
            Some(list) => {
                let start = list.partition_point(|(v, _)| *v < lo);
                list[start..]
                    .iter()
                    .take_while(|(v, _)| *v <= hi)
                    .map(|(_, id)| *id)
                    .collect()
            }
            None => Vec::new(),
        }
    }
}

pub fn shard_dir(store_dir: &Path, shard_id: &str) -> PathBuf {
    store_dir.join(format!("shard-{shard_id}"))
}

/// A shard id is a zero-padded commit sequence number followed by a uuid
/// for uniqueness. The numeric prefix means sorting shard ids as plain
/// strings (as [`crate::store::Store::load_shards`] does) also sorts them
/// by commit order, so the "later shard wins a tie" rule in the searcher
/// is actually true and not just an accident of uuid randomness. 20 digits
/// covers every `u64` value.
pub fn new_shard_id(seq: u64) -> String {
    format!("{seq:020}-{}", uuid::Uuid::new_v4())
}

/// List every `shard-<id>` directory present under the store root,
/// regardless of whether the manifest still references it.
pub fn list_shard_dirs(store_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !store_dir.exists() {
        return Ok(out);
    }
    for entry in fs::read_dir(store_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with("shard-") {
                    out.push(entry.path());
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdx_schema::SymbolType;

    fn rec(name: &str, address: u64) -> SymbolRecord {
        SymbolRecord {
            path: "/build/a.o".into(),
            name: name.into(),
            section: ".text".into(),
            r#type: SymbolType::Func,
            address,
            size: 16,
            mtime_ns: 0,
            source: String::new(),
            relocations: vec!["helper".into(), String::new()],
        }
    }

    #[test]
    fn tokenizes_and_finds_by_subtoken() {
        let shard = Shard::from_records("s1".into(), vec![rec("parse_http2_request", 0x1000)]);
        assert_eq!(shard.token(TokSlot::Name, "http"), &[0]);
        assert_eq!(shard.whole(WholeSlot::Name, "parse_http2_request"), &[0]);
    }

    #[test]
    fn prefix_search_matches_multiple_tokens() {
        let shard = Shard::from_records(
            "s1".into(),
            vec![rec("get_foo", 0x10), rec("get_bar", 0x20), rec("set_foo", 0x30)],
        );
        let mut ids = shard.token_prefix(TokSlot::Name, "get");
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn range_query_is_inclusive_both_ends() {
        let shard = Shard::from_records(
            "s1".into(),
            vec![rec("a", 100), rec("b", 200), rec("c", 300)],
        );
        let ids = shard.range(RangeSlot::Address, Some(100), Some(200));
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn empty_relocation_placeholder_is_not_indexed() {
        let shard = Shard::from_records("s1".into(), vec![rec("a", 0)]);
        assert_eq!(shard.whole(WholeSlot::Relocations, ""), &[] as &[LocalId]);
        assert_eq!(shard.whole(WholeSlot::Relocations, "helper"), &[0]);
    }
}
