//! Core data model for the codepulse audit engine.
//!
//! Everything the analysis passes produce lives here: scanned source units,
//! the arena AST (module [`ast`]), classified call sites, taint flows, the
//! file dependency graph and its cycles, and the signal map the analyzer
//! plugins hand to the rule engine. All artifacts are rebuilt from scratch
//! on every run and are immutable once produced.

pub mod ast;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use ast::{AstArena, AstNode, Meta, NodeId};

/// Placeholder reported when a tainted sink argument is not a bare variable.
pub const COMPLEX_EXPRESSION: &str = "<complex_expression>";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
/// Severity of a finding or a signal violation.
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "major" => Ok(Severity::Major),
            "minor" => Ok(Severity::Minor),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
/// Language tag attached to a scanned file.
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    /// Anything without a grammar-based adapter; regex fallback only.
    Other,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Other => "other",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One scanned file: path relative to the project root, language tag and
/// raw content. Immutable per run.
pub struct SourceUnit {
    pub path: String,
    pub language: Language,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A classified call expression with the facts extracted around it.
pub struct CallSite {
    pub file: String,
    pub line: usize,
    pub callee: String,
    /// Model name when present as a named argument.
    pub model: Option<String>,
    /// Temperature when present as a named argument.
    pub temperature: Option<f64>,
    /// The call's ancestor chain reaches a try/catch construct.
    pub has_error_handling: bool,
    /// A grounding keyword appears in a string literal of the arguments.
    pub has_grounding: bool,
    /// A validation marker appears in the arguments or near the call site.
    pub has_validation: bool,
    /// A response-validation marker appears in the arguments or nearby.
    pub has_response_validation: bool,
    /// True when the fact came from the regex fallback instead of the AST.
    pub from_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A source-to-sink data flow detected within one file.
pub struct TaintFlow {
    pub file: String,
    pub line: usize,
    /// Callee of the sink call.
    pub sink: String,
    /// Bare variable name, or [`COMPLEX_EXPRESSION`].
    pub variable: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
/// File import graph. Keys and targets are canonical file keys
/// (extension-stripped paths relative to the project root). Built once per
/// run; ordered maps keep traversal deterministic.
pub struct DependencyGraph {
    pub edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One circular dependency: the ordered sub-path found on a single DFS
/// traversal, not an exhaustive enumeration. A self-import yields length 1.
pub struct Cycle {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(into = "String", from = "String")]
/// Closed signal-key set with an escape hatch for dimension-specific extras.
/// Replaces stringly-typed signal dictionaries; unknown names parse into
/// [`SignalKey::Extra`] instead of failing.
pub enum SignalKey {
    UngroundedCalls,
    MissingErrorHandling,
    UnvalidatedResponses,
    HighTemperatureCalls,
    TotalCallSites,
    TaintedSinkCalls,
    CircularDependencies,
    DependencyCount,
    TestCoverage,
    Extra(String),
}

impl SignalKey {
    pub fn as_str(&self) -> &str {
        match self {
            SignalKey::UngroundedCalls => "ungrounded_calls",
            SignalKey::MissingErrorHandling => "missing_error_handling",
            SignalKey::UnvalidatedResponses => "unvalidated_responses",
            SignalKey::HighTemperatureCalls => "high_temperature_calls",
            SignalKey::TotalCallSites => "total_call_sites",
            SignalKey::TaintedSinkCalls => "tainted_sink_calls",
            SignalKey::CircularDependencies => "circular_dependencies",
            SignalKey::DependencyCount => "dependency_count",
            SignalKey::TestCoverage => "test_coverage",
            SignalKey::Extra(s) => s,
        }
    }
}

impl FromStr for SignalKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ungrounded_calls" => SignalKey::UngroundedCalls,
            "missing_error_handling" => SignalKey::MissingErrorHandling,
            "unvalidated_responses" => SignalKey::UnvalidatedResponses,
            "high_temperature_calls" => SignalKey::HighTemperatureCalls,
            "total_call_sites" => SignalKey::TotalCallSites,
            "tainted_sink_calls" => SignalKey::TaintedSinkCalls,
            "circular_dependencies" => SignalKey::CircularDependencies,
            "dependency_count" => SignalKey::DependencyCount,
            "test_coverage" => SignalKey::TestCoverage,
            other => SignalKey::Extra(other.to_string()),
        })
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<SignalKey> for String {
    fn from(k: SignalKey) -> String {
        k.as_str().to_string()
    }
}

impl From<String> for SignalKey {
    fn from(s: String) -> SignalKey {
        s.parse().expect("signal key parse is infallible")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
/// Named metrics a dimension hands to the rule engine. Lookups are checked:
/// an absent key is `None`, never a silent zero.
pub struct SignalMap {
    values: BTreeMap<SignalKey, f64>,
}

impl SignalMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: SignalKey, value: f64) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &SignalKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SignalKey, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::ast::{kind, AstArena, AstNode, Meta};
    use super::*;

    fn node(kind: &str, value: serde_json::Value) -> AstNode {
        AstNode {
            kind: kind.to_string(),
            value,
            children: Vec::new(),
            meta: Meta {
                file: "a.ts".into(),
                line: 1,
                column: 1,
            },
        }
    }

    #[test]
    fn arena_tracks_parents_and_ancestors() {
        let mut arena = AstArena::new();
        let root = arena.push(node(kind::TRY, serde_json::Value::Null), None);
        let call = arena.push(node(kind::CALL, serde_json::json!("fetch")), Some(root));
        let arg = arena.push(node(kind::IDENTIFIER, serde_json::json!("x")), Some(call));

        assert_eq!(arena.parents[arg], Some(call));
        let chain: Vec<_> = arena.ancestors(arg).collect();
        assert_eq!(chain, vec![call, root]);
        assert!(chain
            .iter()
            .any(|&id| arena.nodes[id].kind == kind::TRY));
    }

    #[test]
    fn preorder_follows_source_order() {
        let mut arena = AstArena::new();
        let root = arena.push(node(kind::OTHER, serde_json::Value::Null), None);
        let a = arena.push(node(kind::IDENTIFIER, serde_json::json!("a")), Some(root));
        let b = arena.push(node(kind::IDENTIFIER, serde_json::json!("b")), Some(root));
        let a1 = arena.push(node(kind::IDENTIFIER, serde_json::json!("a1")), Some(a));

        assert_eq!(arena.preorder(root), vec![root, a, a1, b]);
    }

    #[test]
    fn bounded_traversal_stops_at_depth() {
        let mut arena = AstArena::new();
        let root = arena.push(node(kind::CALL, serde_json::json!("f")), None);
        let lvl1 = arena.push(node(kind::OBJECT, serde_json::Value::Null), Some(root));
        let lvl2 = arena.push(node(kind::PROPERTY, serde_json::json!("k")), Some(lvl1));
        let _lvl3 = arena.push(node(kind::STRING, serde_json::json!("v")), Some(lvl2));

        let seen = arena.bounded(root, 2);
        assert!(seen.contains(&lvl2));
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn signal_keys_round_trip_through_strings() {
        let known: SignalKey = "tainted_sink_calls".parse().unwrap();
        assert_eq!(known, SignalKey::TaintedSinkCalls);
        let extra: SignalKey = "custom_metric".parse().unwrap();
        assert_eq!(extra, SignalKey::Extra("custom_metric".into()));
        assert_eq!(extra.as_str(), "custom_metric");
    }

    #[test]
    fn signal_map_lookups_are_checked() {
        let mut signals = SignalMap::new();
        signals.set(SignalKey::UngroundedCalls, 3.0);
        assert_eq!(signals.get(&SignalKey::UngroundedCalls), Some(3.0));
        assert_eq!(signals.get(&SignalKey::TestCoverage), None);
    }
}
