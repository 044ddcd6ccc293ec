//! Declarative scoring rules and release-gate policies.
//!
//! Rules live one-per-dimension in YAML files under a rules directory;
//! policies live in a single YAML list. Both are loaded once at engine
//! construction and shared read-only for the run. Formula and policy
//! expressions are evaluated by the sandboxed interpreter in [`formula`],
//! which only ever sees the context map it is handed.

pub mod engine;
pub mod formula;
pub mod policy;

pub use engine::{RuleEngine, RuleResult, Violation};
pub use policy::{PolicyEvaluator, PolicyResult};

use anyhow::{bail, Context, Result};
use ir::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Threshold attached to a signal: exceeding `max` raises a violation of
/// the given severity.
pub struct SignalSpec {
    pub max: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionSpec {
    pub signal: String,
    pub formula: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusSpec {
    pub signal: String,
    pub formula: String,
    #[serde(default)]
    pub max_bonus: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSpec {
    pub base_score: f64,
    #[serde(default)]
    pub deductions: Vec<DeductionSpec>,
    #[serde(default)]
    pub bonuses: Vec<BonusSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Thresholds {
    #[serde(default)]
    pub fail_below: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One dimension's scoring rule, as declared in its YAML file.
pub struct Rule {
    pub dimension: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub signals: BTreeMap<String, SignalSpec>,
    pub scoring: ScoringSpec,
    #[serde(default)]
    pub thresholds: Thresholds,
}

fn default_version() -> u32 {
    1
}

/// Loads every `*.yml`/`*.yaml` rule file under `dir`, keyed by dimension.
///
/// A missing directory is not an error: the engine falls back to plugin
/// scores. Two files declaring the same dimension is a configuration
/// mistake and fails the load.
pub fn load_rules(dir: &Path) -> Result<BTreeMap<String, Rule>> {
    let mut rules = BTreeMap::new();
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "No rules directory, using plugin scores");
        return Ok(rules);
    }

    let mut paths: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("reading rules directory {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yml") | Some("yaml")
            )
        })
        .collect();
    paths.sort();

    for path in paths {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading rule file {}", path.display()))?;
        let rule: Rule = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing rule file {}", path.display()))?;
        debug!(dimension = %rule.dimension, file = %path.display(), "Rule loaded");
        if rules.insert(rule.dimension.clone(), rule).is_some() {
            bail!(
                "duplicate rule for dimension declared in {}",
                path.display()
            );
        }
    }
    Ok(rules)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One release-gate policy: a boolean expression over report context.
pub struct Policy {
    pub name: String,
    pub expr: String,
    #[serde(default)]
    pub enforced: bool,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    policies: Vec<Policy>,
}

/// Loads the policy list from a YAML file. A missing file means no gates.
pub fn load_policies(path: &Path) -> Result<Vec<Policy>> {
    if !path.is_file() {
        debug!(path = %path.display(), "No policy file, no release gates");
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading policy file {}", path.display()))?;
    let file: PolicyFile = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing policy file {}", path.display()))?;
    Ok(file.policies)
}
