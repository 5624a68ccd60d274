//! Top-level query entry point: parse, execute per shard, merge.

use bdx_schema::SymbolRecord;
use bdx_store::Shard;
use tracing::instrument;

use crate::error::Result;
use crate::exec::execute;

pub struct Searcher {
    shards: Vec<Shard>,
}

impl Searcher {
    pub fn new(shards: Vec<Shard>) -> Searcher {
        Searcher { shards }
    }

    pub fn open(store: &bdx_store::Store) -> Result<Searcher> {
        Ok(Searcher::new(store.load_shards()?))
    }

    /// Run `query`, returning up to `limit` hydrated records ordered by
    /// `(path, address)`.
    #[instrument(skip(self))]
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SymbolRecord>> {
        let mut results = self.run(query)?;
        results.truncate(limit);
        Ok(results)
    }

    pub fn count(&self, query: &str) -> Result<usize> {
        Ok(self.run(query)?.len())
    }

    /// Same as [`Searcher::search`] with no limit. Each call re-executes the
    /// plan from scratch: cheap against an in-memory index, and exactly what
    /// lets the graph engine re-query edges at traversal time without
    /// holding any cursor state between calls.
    pub fn iterate(&self, query: &str) -> Result<impl Iterator<Item = SymbolRecord> + '_> {
        Ok(self.run(query)?.into_iter())
    }

    fn run(&self, query: &str) -> Result<Vec<SymbolRecord>> {
        let plan = bdx_query::parse_plan(query)?;

        // Dedup on (path, name, address): a record could only collide across
        // shards if two manifest-referenced shards both claim the same file,
        // which never happens under the store's invariants, but a later
        // shard still wins any such tie rather than producing a duplicate.
        let mut by_key: std::collections::BTreeMap<(String, String, u64), SymbolRecord> = std::collections::BTreeMap::new();

        for shard in &self.shards {
            for id in execute(shard, &plan) {
                let record = shard.record(id).clone();
                let key = (record.path.clone(), record.name.clone(), record.address);
                by_key.insert(key, record);
            }
        }

        let mut results: Vec<SymbolRecord> = by_key.into_values().collect();
        results.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdx_schema::SymbolType;
    use bdx_store::Store;

    fn rec(path: &str, name: &str, address: u64, relocations: Vec<&str>) -> SymbolRecord {
        SymbolRecord {
            path: path.into(),
            name: name.into(),
            section: ".text".into(),
            r#type: SymbolType::Func,
            address,
            size: 4,
            mtime_ns: 0,
            source: String::new(),
            relocations: relocations.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn search_merges_across_shards_ordered_by_path_and_address() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut txn = store.begin_write().unwrap();
        txn.add_file("/build/b.o", 1, vec![rec("/build/b.o", "zeta", 0x10, vec![])]);
        txn.commit().unwrap();

        let store = Store::open(dir.path()).unwrap();
        let mut txn = store.begin_write().unwrap();
        txn.add_file("/build/a.o", 1, vec![rec("/build/a.o", "alpha", 0x20, vec!["helper"])]);
        txn.commit().unwrap();

        let store = Store::open(dir.path()).unwrap();
        let searcher = Searcher::open(&store).unwrap();
        let results = searcher.search("type:func", 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].path, "/build/a.o");
        assert_eq!(results[1].path, "/build/b.o");
    }

    #[test]
    fn iterate_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut txn = store.begin_write().unwrap();
        txn.add_file("/build/a.o", 1, vec![rec("/build/a.o", "alpha", 0, vec!["helper"])]);
        txn.commit().unwrap();

        let searcher = Searcher::open(&Store::open(dir.path()).unwrap()).unwrap();
        let first: Vec<_> = searcher.iterate("fullname:helper").unwrap().collect();
        let second: Vec<_> = searcher.iterate("fullname:helper").unwrap().collect();
        assert_eq!(first, second);
        assert!(first.is_empty()); // "helper" is a relocation target, not a defined symbol name
    }

    #[test]
    fn count_matches_search_len_for_an_unbounded_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut txn = store.begin_write().unwrap();
        txn.add_file("/build/a.o", 1, vec![rec("/build/a.o", "alpha", 0, vec![]), rec("/build/a.o", "beta", 4, vec![])]);
        txn.commit().unwrap();

        let searcher = Searcher::open(&Store::open(dir.path()).unwrap()).unwrap();
        assert_eq!(searcher.count("type:func").unwrap(), 2);
        assert_eq!(searcher.search("type:func", usize::MAX).unwrap().len(), 2);
    }
}
