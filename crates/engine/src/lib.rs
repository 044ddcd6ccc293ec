//! Audit orchestration.
//!
//! Ties the analysis snapshot, the rule engine and the policy evaluator
//! together: analyzer plugins score their dimensions, the orchestrator
//! merges scores and findings into an [`AuditReport`], and the store trait
//! persists finished runs.

pub mod orchestrator;
pub mod plugin;
pub mod plugins;
pub mod report;
pub mod store;

pub use orchestrator::AuditOrchestrator;
pub use plugin::{AnalyzerOutput, AnalyzerPlugin};
pub use plugins::builtin_plugins;
pub use report::{ActionItem, AuditReport, DimensionScore, Finding, RiskLevel};
pub use store::{AuditStore, HistoryEntry, JsonlStore, RegressionAlert, TrendPoint};
