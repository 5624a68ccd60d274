//! Renders graph-engine output as a DOT document. DOT *layout* (actually
//! drawing the graph) is an external tool per spec §1; this only emits the
//! document.

use std::collections::BTreeSet;

use bdx_graph::SymbolPath;
use bdx_schema::SymbolRecord;

fn node_id(record: &SymbolRecord) -> String {
    format!("{}:{}:{:#x}", record.path, record.name, record.address)
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn render(paths: &[SymbolPath]) -> String {
    let mut nodes: BTreeSet<(String, String)> = BTreeSet::new();
    let mut edges: BTreeSet<(String, String)> = BTreeSet::new();

    for path in paths {
        for record in path {
            nodes.insert((node_id(record), record.name.clone()));
        }
        for window in path.windows(2) {
            edges.insert((node_id(&window[0]), node_id(&window[1])));
        }
    }

    let mut out = String::from("digraph bdx {\n");
    for (id, label) in &nodes {
        out.push_str(&format!("  \"{}\" [label=\"{}\"];\n", escape(id), escape(label)));
    }
    for (from, to) in &edges {
        out.push_str(&format!("  \"{}\" -> \"{}\";\n", escape(from), escape(to)));
    }
    out.push_str("}\n");
    out
}
