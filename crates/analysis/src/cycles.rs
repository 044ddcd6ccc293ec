//! Circular-dependency search over the resolved import graph.
//!
//! Classic DFS with a recursion-stack path: revisiting a node already on
//! the active path emits the sub-path from that node to the current one as
//! one cycle. Each DFS order yields only the minimal cycle it runs into,
//! so overlapping cycles in dense graphs may be under-reported; that is the
//! documented behaviour, not a bug to fix here. Runs in O(V+E).

use ir::{Cycle, DependencyGraph};
use std::collections::HashSet;

pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut cycles = Vec::new();

    // BTreeMap key order keeps the traversal (and the report) deterministic
    for start in graph.edges.keys() {
        if visited.contains(start.as_str()) {
            continue;
        }
        let mut path: Vec<&str> = Vec::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        dfs(graph, start, &mut visited, &mut path, &mut on_path, &mut cycles);
    }
    cycles
}

fn dfs<'a>(
    graph: &'a DependencyGraph,
    node: &'a str,
    visited: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
    on_path: &mut HashSet<&'a str>,
    cycles: &mut Vec<Cycle>,
) {
    visited.insert(node);
    path.push(node);
    on_path.insert(node);

    if let Some(targets) = graph.edges.get(node) {
        for target in targets {
            if on_path.contains(target.as_str()) {
                let pos = path
                    .iter()
                    .position(|&p| p == target.as_str())
                    .expect("node on active path");
                cycles.push(Cycle {
                    files: path[pos..].iter().map(|s| s.to_string()).collect(),
                });
            } else if !visited.contains(target.as_str()) && graph.edges.contains_key(target.as_str())
            {
                dfs(graph, target, visited, path, on_path, cycles);
            }
        }
    }

    path.pop();
    on_path.remove(node);
}
