//! Structural analysis passes over scanned source units.
//!
//! Each pass is independent and deterministic: call-site classification,
//! intraprocedural taint tracking, dependency-graph construction and cycle
//! detection. [`snapshot::ProjectSnapshot`] runs them all over one project
//! tree and owns the resulting artifacts for the duration of a run.

pub mod callsites;
pub mod cycles;
pub mod depgraph;
pub mod snapshot;
pub mod taint;

pub use callsites::{CallPatterns, CallSiteExtractor};
pub use cycles::detect_cycles;
pub use depgraph::build_dependency_graph;
pub use snapshot::{ProjectSnapshot, SnapshotConfig};
pub use taint::{TaintAnalyzer, TaintPatterns};
