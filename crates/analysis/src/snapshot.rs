//! One run's view of a project: scanned units, parsed arenas and every
//! analysis artifact, built from scratch and owned until the run ends.
//!
//! File parsing fans out over rayon; results are re-keyed by path and the
//! unit list is already sorted, so artifact order never depends on worker
//! completion order. Call sites and taint flows follow directory-traversal
//! then AST pre-order discovery order.

use crate::callsites::{CallPatterns, CallSiteExtractor};
use crate::cycles::detect_cycles;
use crate::depgraph::build_dependency_graph;
use crate::taint::{TaintAnalyzer, TaintPatterns};
use ir::{AstArena, CallSite, Cycle, DependencyGraph, SourceUnit, TaintFlow};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SnapshotConfig {
    pub call_patterns: CallPatterns,
    pub taint_patterns: TaintPatterns,
    /// Directory names excluded in addition to the fixed defaults.
    pub extra_excludes: Vec<String>,
}

pub struct ProjectSnapshot {
    pub units: Vec<SourceUnit>,
    pub arenas: HashMap<String, AstArena>,
    pub call_sites: Vec<CallSite>,
    pub taint_flows: Vec<TaintFlow>,
    pub graph: DependencyGraph,
    pub cycles: Vec<Cycle>,
}

impl ProjectSnapshot {
    /// Scans `root` and runs every analysis pass once.
    pub fn build(root: &Path, config: &SnapshotConfig) -> anyhow::Result<Self> {
        let units = parsers::scan_project(root, &config.extra_excludes)?;
        debug!(files = units.len(), "Project scanned");

        let arenas: HashMap<String, AstArena> = units
            .par_iter()
            .filter_map(|u| parsers::parse_unit(u).map(|a| (u.path.clone(), a)))
            .collect();

        let extractor = CallSiteExtractor::new(config.call_patterns.clone());
        let taint = TaintAnalyzer::new(config.taint_patterns.clone());

        let mut call_sites = Vec::new();
        let mut taint_flows = Vec::new();
        for unit in &units {
            let arena = arenas.get(&unit.path);
            call_sites.extend(extractor.extract(unit, arena));
            if let Some(a) = arena {
                taint_flows.extend(taint.analyze(unit, a));
            }
        }

        let graph = build_dependency_graph(&units, &arenas);
        let cycles = detect_cycles(&graph);
        debug!(
            call_sites = call_sites.len(),
            taint_flows = taint_flows.len(),
            cycles = cycles.len(),
            "Snapshot complete"
        );

        Ok(Self {
            units,
            arenas,
            call_sites,
            taint_flows,
            graph,
            cycles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::create_dir_all(base.join("src")).unwrap();
        fs::write(
            base.join("src/ai.ts"),
            "import { helper } from './helper';\nexport async function ask(user_prompt) {\n  return client.chat.completions.create({ model: 'gpt-4o', messages: user_prompt });\n}\n",
        )
        .unwrap();
        fs::write(
            base.join("src/helper.ts"),
            "import { ask } from './ai';\nexport const helper = 1;\n",
        )
        .unwrap();
        tmp
    }

    #[test]
    fn snapshot_collects_all_artifacts() {
        let tmp = fixture();
        let snapshot = ProjectSnapshot::build(tmp.path(), &SnapshotConfig::default()).unwrap();

        assert_eq!(snapshot.units.len(), 2);
        assert_eq!(snapshot.call_sites.len(), 1);
        assert_eq!(snapshot.call_sites[0].file, "src/ai.ts");
        assert_eq!(snapshot.cycles.len(), 1);
        assert_eq!(snapshot.taint_flows.len(), 1);
    }

    #[test]
    fn two_builds_produce_identical_artifacts() {
        let tmp = fixture();
        let a = ProjectSnapshot::build(tmp.path(), &SnapshotConfig::default()).unwrap();
        let b = ProjectSnapshot::build(tmp.path(), &SnapshotConfig::default()).unwrap();
        assert_eq!(a.call_sites.len(), b.call_sites.len());
        assert_eq!(a.taint_flows, b.taint_flows);
        assert_eq!(a.cycles, b.cycles);
        assert_eq!(a.graph.edges, b.graph.edges);
    }
}
