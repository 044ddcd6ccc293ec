//! File import graph construction.
//!
//! Raw import targets come from the language adapters (structural where a
//! grammar exists, the single fallback pattern otherwise). A canonical-key
//! lookup built once in O(V) resolves targets to graph nodes in O(1)
//! amortised: extension-stripped relative path first, base filename second.
//! Unresolved targets are silently dropped; packages never become edges.

use ir::{AstArena, DependencyGraph, SourceUnit};
use parsers::adapter_for;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Canonical graph key of a unit: its relative path without extension.
pub fn file_key(path: &str) -> String {
    match path.rfind('.') {
        Some(dot) if !path[dot + 1..].contains('/') => path[..dot].to_string(),
        _ => path.to_string(),
    }
}

/// Builds the import graph for one run. `arenas` maps unit paths to already
/// parsed arenas so adapters do not re-parse.
pub fn build_dependency_graph(
    units: &[SourceUnit],
    arenas: &HashMap<String, AstArena>,
) -> DependencyGraph {
    // canonical lookup, built once: path-without-extension and bare filename
    let mut by_path: HashMap<String, String> = HashMap::new();
    let mut by_name: HashMap<String, String> = HashMap::new();
    for unit in units {
        let key = file_key(&unit.path);
        by_path.entry(key.clone()).or_insert_with(|| key.clone());
        if let Some(name) = key.rsplit('/').next() {
            by_name.entry(name.to_string()).or_insert_with(|| key.clone());
        }
    }

    let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for unit in units {
        let key = file_key(&unit.path);
        let raw = adapter_for(unit.language).extract_imports(unit, arenas.get(&unit.path));
        let mut targets: BTreeSet<String> = BTreeSet::new();
        for target in raw {
            match resolve(&key, &target, &by_path, &by_name) {
                Some(resolved) => {
                    targets.insert(resolved);
                }
                None => {
                    debug!(file = %unit.path, target = %target, "Import target dropped");
                }
            }
        }
        edges.insert(key, targets.into_iter().collect());
    }
    DependencyGraph { edges }
}

fn resolve(
    importer: &str,
    target: &str,
    by_path: &HashMap<String, String>,
    by_name: &HashMap<String, String>,
) -> Option<String> {
    let stripped = file_key(target);
    if let Some(rest) = stripped.strip_prefix("@/").or_else(|| stripped.strip_prefix("~/")) {
        // alias-rooted: project root, then the conventional src/ prefix
        return by_path
            .get(rest)
            .or_else(|| by_path.get(&format!("src/{rest}")))
            .or_else(|| by_name.get(rest.rsplit('/').next()?))
            .cloned();
    }
    if stripped.starts_with('.') {
        let dir = importer.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let joined = normalize(dir, &stripped)?;
        return by_path
            .get(&joined)
            .or_else(|| by_path.get(&format!("{joined}/index")))
            .or_else(|| by_path.get(&format!("{joined}/__init__")))
            .cloned();
    }
    // bare target: slashed module paths and single names resolve by path
    // first, then by base filename
    by_path
        .get(&stripped)
        .or_else(|| by_name.get(stripped.rsplit('/').next()?))
        .cloned()
}

/// Joins `target` onto `dir` and collapses `.`/`..` segments. Escaping the
/// project root yields `None`.
fn normalize(dir: &str, target: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}
