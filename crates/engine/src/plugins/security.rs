//! Scores intraprocedural taint flows into sink calls.

use crate::plugin::{AnalyzerOutput, AnalyzerPlugin};
use crate::report::Finding;
use analysis::ProjectSnapshot;
use ir::{Severity, SignalKey, SignalMap};

pub struct SecurityPlugin;

impl AnalyzerPlugin for SecurityPlugin {
    fn dimension(&self) -> &str {
        "security"
    }

    fn analyze(&self, snapshot: &ProjectSnapshot) -> anyhow::Result<AnalyzerOutput> {
        let findings: Vec<Finding> = snapshot
            .taint_flows
            .iter()
            .map(|flow| {
                Finding::new(
                    self.dimension(),
                    Severity::Critical,
                    &format!("Tainted data reaches {}", flow.sink),
                    &format!(
                        "Untrusted value '{}' flows into the sink call without sanitization.",
                        flow.variable
                    ),
                )
                .recommend("Sanitize or validate the value before it reaches the sink.")
                .at(&flow.file, flow.line)
            })
            .collect();

        let mut signals = SignalMap::new();
        signals.set(
            SignalKey::TaintedSinkCalls,
            snapshot.taint_flows.len() as f64,
        );

        let score = (5.0 - snapshot.taint_flows.len() as f64 * 1.5).clamp(0.0, 5.0);

        Ok(AnalyzerOutput {
            findings,
            score,
            signals,
        })
    }
}
