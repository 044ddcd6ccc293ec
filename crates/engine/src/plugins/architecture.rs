//! Scores the import graph: circular dependencies and fan-out.

use crate::plugin::{AnalyzerOutput, AnalyzerPlugin};
use crate::report::Finding;
use analysis::ProjectSnapshot;
use ir::{Severity, SignalKey, SignalMap};

pub struct ArchitecturePlugin;

impl AnalyzerPlugin for ArchitecturePlugin {
    fn dimension(&self) -> &str {
        "architecture"
    }

    fn analyze(&self, snapshot: &ProjectSnapshot) -> anyhow::Result<AnalyzerOutput> {
        let findings: Vec<Finding> = snapshot
            .cycles
            .iter()
            .map(|cycle| {
                let chain = cycle.files.join(" -> ");
                Finding::new(
                    self.dimension(),
                    Severity::Major,
                    &format!("Circular dependency: {chain}"),
                    "The files import each other in a cycle, coupling their change surfaces.",
                )
                .recommend("Break the cycle by extracting the shared piece into its own module.")
                .at(&cycle.files[0], 1)
            })
            .collect();

        let mut signals = SignalMap::new();
        signals.set(
            SignalKey::CircularDependencies,
            snapshot.cycles.len() as f64,
        );
        signals.set(
            SignalKey::DependencyCount,
            snapshot.graph.edge_count() as f64,
        );

        let score = (5.0 - snapshot.cycles.len() as f64).clamp(0.0, 5.0);

        Ok(AnalyzerOutput {
            findings,
            score,
            signals,
        })
    }
}
