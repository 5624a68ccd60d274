//! BFS / DFS / A* path enumeration over relocation edges, per spec §4.7.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use bdx_schema::SymbolRecord;
use bdx_search::Searcher;
use tracing::{info, instrument};

use crate::error::Result;

/// One complete path from a source match to a sink match, as the sequence
/// of symbol records visited, source first.
pub type SymbolPath = Vec<SymbolRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Bfs,
    Dfs,
    AStar,
}

#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub algorithm: Algorithm,
    /// Stop once this many paths have been emitted.
    pub max_paths: usize,
    /// Optional cap on path length (in nodes); `None` means unbounded.
    pub max_depth: Option<usize>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        GraphOptions { algorithm: Algorithm::Bfs, max_paths: 10, max_depth: None }
    }
}

/// `(path, name, address)`: the same stable key `bdx_schema::SymbolRecord`
/// uses for search ordering, reused here as the per-path visited key.
type NodeKey = (String, String, u64);

fn key(r: &SymbolRecord) -> NodeKey {
    (r.path.clone(), r.name.clone(), r.address)
}

/// Run source query and sink query, then enumerate up to `opts.max_paths`
/// paths between their matches using `opts.algorithm`.
#[instrument(skip(searcher))]
pub fn find_paths(
    searcher: &Searcher,
    source_query: &str,
    sink_query: &str,
    opts: &GraphOptions,
) -> Result<Vec<SymbolPath>> {
    let sources = searcher.search(source_query, usize::MAX).map_err(crate::error::GraphError::Source)?;
    let sinks = searcher.search(sink_query, usize::MAX).map_err(crate::error::GraphError::Sink)?;

    if sources.is_empty() || sinks.is_empty() {
        return Ok(Vec::new());
    }

    let sink_keys: HashSet<NodeKey> = sinks.iter().map(key).collect();
    let sink_names: HashSet<&str> = sinks.iter().map(|r| r.name.as_str()).collect();

    let paths = match opts.algorithm {
        Algorithm::Bfs => bfs(searcher, &sources, &sink_keys, opts)?,
        Algorithm::Dfs => dfs(searcher, &sources, &sink_keys, opts)?,
        Algorithm::AStar => astar(searcher, &sources, &sink_keys, &sink_names, opts)?,
    };

    info!(paths = paths.len(), algorithm = ?opts.algorithm, "graph traversal complete");
    Ok(paths)
}

/// Every symbol named by one of `node`'s relocations, resolved via
/// `fullname:` lookup. A name is looked up once even if it repeats in the
/// relocation list; weak/static duplicates at the *target* end still yield
/// one edge per defining symbol, since distinct files can each define the
/// same name.
fn edges(searcher: &Searcher, node: &SymbolRecord) -> Result<Vec<SymbolRecord>> {
    let mut seen_names: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for name in &node.relocations {
        if name.is_empty() || !seen_names.insert(name.as_str()) {
            continue;
        }
        let query = format!("fullname:\"{name}\"");
        out.extend(searcher.iterate(&query)?);
    }
    Ok(out)
}

fn within_depth(path: &SymbolPath, max_depth: Option<usize>) -> bool {
    max_depth.is_none_or(|max| path.len() <= max)
}

fn visited_keys(path: &SymbolPath) -> HashSet<NodeKey> {
    path.iter().map(key).collect()
}

/// Shortest-in-edges-first enumeration: a plain FIFO frontier of partial
/// paths, each carrying its own visited set so distinct paths may revisit a
/// node the others already used.
fn bfs(
    searcher: &Searcher,
    sources: &[SymbolRecord],
    sink_keys: &HashSet<NodeKey>,
    opts: &GraphOptions,
) -> Result<Vec<SymbolPath>> {
    let mut results = Vec::new();
    let mut frontier: VecDeque<SymbolPath> = sources.iter().map(|s| vec![s.clone()]).collect();

    while let Some(path) = frontier.pop_front() {
        if results.len() >= opts.max_paths {
            break;
        }
        let last = path.last().expect("path is never empty");
        if sink_keys.contains(&key(last)) {
            results.push(path.clone());
            if results.len() >= opts.max_paths {
                break;
            }
        }
        if !within_depth(&path, opts.max_depth) {
            continue;
        }
        let visited = visited_keys(&path);
        for next in edges(searcher, last)? {
            if visited.contains(&key(&next)) {
                continue;
            }
            let mut extended = path.clone();
            extended.push(next);
            frontier.push_back(extended);
        }
    }
    Ok(results)
}

/// Depth-first, one recursion per partial path, visited set scoped to that
/// path rather than shared globally (per spec §9: a global visited set
/// would wrongly collapse distinct paths through a shared node).
fn dfs(
    searcher: &Searcher,
    sources: &[SymbolRecord],
    sink_keys: &HashSet<NodeKey>,
    opts: &GraphOptions,
) -> Result<Vec<SymbolPath>> {
    let mut results = Vec::new();
    for source in sources {
        if results.len() >= opts.max_paths {
            break;
        }
        dfs_visit(searcher, vec![source.clone()], sink_keys, opts, &mut results)?;
    }
    Ok(results)
}

fn dfs_visit(
    searcher: &Searcher,
    path: SymbolPath,
    sink_keys: &HashSet<NodeKey>,
    opts: &GraphOptions,
    results: &mut Vec<SymbolPath>,
) -> Result<()> {
    if results.len() >= opts.max_paths {
        return Ok(());
    }
    let last = path.last().expect("path is never empty");
    if sink_keys.contains(&key(last)) {
        results.push(path.clone());
        if results.len() >= opts.max_paths {
            return Ok(());
        }
    }
    if !within_depth(&path, opts.max_depth) {
        return Ok(());
    }
    let visited = visited_keys(&path);
    for next in edges(searcher, last)? {
        if results.len() >= opts.max_paths {
            return Ok(());
        }
        if visited.contains(&key(&next)) {
            continue;
        }
        let mut extended = path.clone();
        extended.push(next);
        dfs_visit(searcher, extended, sink_keys, opts, results)?;
    }
    Ok(())
}

/// One entry of the A* frontier. Ordered for use in a [`BinaryHeap`], which
/// is a max-heap: `Ord` is flipped so the heap pops the lowest `f`, with
/// ties broken by insertion order (earlier-inserted first), per spec §4.7.
struct Frontier {
    f: usize,
    order: usize,
    path: SymbolPath,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.order == other.order
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other.f.cmp(&self.f).then_with(|| other.order.cmp(&self.order))
    }
}

/// Admissible heuristic: `1` if `node` has a relocation naming a sink
/// directly (one more hop reaches it), else `0` — never an overestimate,
/// since the true remaining edge count is always `>= 0`.
fn heuristic(node: &SymbolRecord, sink_names: &HashSet<&str>) -> usize {
    if node.relocations.iter().any(|r| sink_names.contains(r.as_str())) {
        1
    } else {
        0
    }
}

fn astar(
    searcher: &Searcher,
    sources: &[SymbolRecord],
    sink_keys: &HashSet<NodeKey>,
    sink_names: &HashSet<&str>,
    opts: &GraphOptions,
) -> Result<Vec<SymbolPath>> {
    let mut results = Vec::new();
    let mut heap = BinaryHeap::new();
    let mut order = 0usize;

    for source in sources {
        let h = heuristic(source, sink_names);
        heap.push(Frontier { f: h, order, path: vec![source.clone()] });
        order += 1;
    }

    while let Some(Frontier { path, .. }) = heap.pop() {
        if results.len() >= opts.max_paths {
            break;
        }
        let last = path.last().expect("path is never empty");
        if sink_keys.contains(&key(last)) {
            results.push(path.clone());
            if results.len() >= opts.max_paths {
                break;
            }
        }
        if !within_depth(&path, opts.max_depth) {
            continue;
        }
        let visited = visited_keys(&path);
        let g = path.len() - 1;
        for next in edges(searcher, last)? {
            if visited.contains(&key(&next)) {
                continue;
            }
            let h = heuristic(&next, sink_names);
            let mut extended = path.clone();
            extended.push(next);
            heap.push(Frontier { f: g + 1 + h, order, path: extended });
            order += 1;
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdx_schema::SymbolType;
    use bdx_store::Store;

    fn rec(path: &str, name: &str, address: u64, relocations: &[&str]) -> SymbolRecord {
        SymbolRecord {
            path: path.into(),
            name: name.into(),
            section: ".text".into(),
            r#type: SymbolType::Func,
            address,
            size: 4,
            mtime_ns: 0,
            source: String::new(),
            relocations: relocations.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn chain_searcher(dir: &std::path::Path) -> Searcher {
        // a -> b -> c, plus an unrelated d with no edges at all.
        let store = Store::open(dir).unwrap();
        let mut txn = store.begin_write().unwrap();
        txn.add_file(
            "/build/chain.o",
            1,
            vec![
                rec("/build/chain.o", "a", 0x0, &["b"]),
                rec("/build/chain.o", "b", 0x10, &["c"]),
                rec("/build/chain.o", "c", 0x20, &[]),
                rec("/build/chain.o", "d", 0x30, &[]),
            ],
        );
        txn.commit().unwrap();
        Searcher::open(&Store::open(dir).unwrap()).unwrap()
    }

    #[test]
    fn bfs_finds_the_direct_edge() {
        let dir = tempfile::tempdir().unwrap();
        let searcher = chain_searcher(dir.path());
        let opts = GraphOptions { algorithm: Algorithm::Bfs, max_paths: 1, max_depth: None };
        let paths = find_paths(&searcher, "fullname:a", "fullname:b", &opts).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn bfs_finds_the_shortest_multi_hop_path_first() {
        let dir = tempfile::tempdir().unwrap();
        let searcher = chain_searcher(dir.path());
        let opts = GraphOptions { algorithm: Algorithm::Bfs, max_paths: 1, max_depth: None };
        let paths = find_paths(&searcher, "fullname:a", "fullname:c", &opts).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn no_path_when_sink_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let searcher = chain_searcher(dir.path());
        let opts = GraphOptions::default();
        let paths = find_paths(&searcher, "fullname:a", "fullname:d", &opts).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn max_depth_excludes_longer_paths() {
        let dir = tempfile::tempdir().unwrap();
        let searcher = chain_searcher(dir.path());
        let opts = GraphOptions { algorithm: Algorithm::Bfs, max_paths: 10, max_depth: Some(2) };
        let paths = find_paths(&searcher, "fullname:a", "fullname:c", &opts).unwrap();
        assert!(paths.is_empty(), "c is 3 nodes deep, depth cap is 2");
    }

    #[test]
    fn dfs_and_astar_also_find_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let searcher = chain_searcher(dir.path());
        for algorithm in [Algorithm::Dfs, Algorithm::AStar] {
            let opts = GraphOptions { algorithm, max_paths: 1, max_depth: None };
            let paths = find_paths(&searcher, "fullname:a", "fullname:c", &opts).unwrap();
            assert_eq!(paths.len(), 1, "{algorithm:?} should find one path");
            assert_eq!(
                paths[0].iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
                vec!["a", "b", "c"]
            );
        }
    }

    #[test]
    fn a_path_cannot_revisit_a_node_within_itself() {
        // a relocates to b and to itself (a self-loop edge); the engine must
        // not walk a -> a -> b as a "path" since a node repeats within it.
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut txn = store.begin_write().unwrap();
        txn.add_file(
            "/build/loop.o",
            1,
            vec![rec("/build/loop.o", "a", 0x0, &["a", "b"]), rec("/build/loop.o", "b", 0x10, &[])],
        );
        txn.commit().unwrap();
        let searcher = Searcher::open(&Store::open(dir.path()).unwrap()).unwrap();

        let opts = GraphOptions { algorithm: Algorithm::Bfs, max_paths: 10, max_depth: Some(5) };
        let paths = find_paths(&searcher, "fullname:a", "fullname:b", &opts).unwrap();
        assert!(paths.iter().all(|p| {
            let mut names: Vec<_> = p.iter().map(|r| &r.name).collect();
            let before = names.len();
            names.sort();
            names.dedup();
            names.len() == before
        }));
    }
}
