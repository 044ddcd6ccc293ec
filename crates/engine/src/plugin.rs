//! The analyzer plugin contract.

use crate::report::Finding;
use analysis::ProjectSnapshot;
use ir::SignalMap;

/// What one analyzer hands back: its findings, a heuristic score in
/// `[0, 5]`, and the raw signals the rule engine may re-score from.
pub struct AnalyzerOutput {
    pub findings: Vec<Finding>,
    pub score: f64,
    pub signals: SignalMap,
}

/// One independently scored audit dimension.
///
/// `analyze` must not fail for "nothing found"; it may fail for setup
/// problems, which the orchestrator converts into a synthetic Major
/// finding while the run continues.
pub trait AnalyzerPlugin: Send + Sync {
    fn dimension(&self) -> &str;

    fn analyze(&self, snapshot: &ProjectSnapshot) -> anyhow::Result<AnalyzerOutput>;
}
