//! Rule evaluation: signals in, clamped score plus violations out.

use crate::formula::{Formula, Value};
use crate::Rule;
use ir::{Severity, SignalKey, SignalMap};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, serde::Serialize)]
/// A signal that exceeded its configured threshold.
pub struct Violation {
    pub signal: String,
    pub value: f64,
    pub max: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RuleResult {
    pub dimension: String,
    /// Always in `[0.0, 5.0]`, rounded to one decimal.
    pub score: f64,
    pub violations: Vec<Violation>,
    /// Ordered, human-readable record of every applied term.
    pub explanation: Vec<String>,
}

/// Applies per-dimension scoring rules. Rules are loaded once at
/// construction; build a new engine to pick up edited files.
pub struct RuleEngine {
    rules: BTreeMap<String, Rule>,
}

impl RuleEngine {
    pub fn new(rules: BTreeMap<String, Rule>) -> Self {
        Self { rules }
    }

    pub fn from_dir(dir: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(crate::load_rules(dir)?))
    }

    pub fn has_rule(&self, dimension: &str) -> bool {
        self.rules.contains_key(dimension)
    }

    /// Evaluates the dimension's rule against its signals.
    ///
    /// Returns `None` when no rule is configured for the dimension; the
    /// caller falls back to the plugin's own score. Malformed formulas
    /// degrade to a zero contribution with a warning in the explanation
    /// trail. Never fails.
    pub fn apply_rule(&self, dimension: &str, signals: &SignalMap) -> Option<RuleResult> {
        let rule = self.rules.get(dimension)?;
        let mut score = rule.scoring.base_score;
        let mut explanation = vec![format!("base score {:.1}", rule.scoring.base_score)];

        for deduction in &rule.scoring.deductions {
            let value = resolve_signal(signals, &deduction.signal, &mut explanation);
            match eval_term(&deduction.formula, value) {
                Ok(amount) => {
                    score -= amount;
                    explanation.push(format!(
                        "deduction '{}' ({} = {value}) -> -{amount:.2}",
                        deduction.formula, deduction.signal
                    ));
                }
                Err(err) => {
                    warn!(dimension, formula = %deduction.formula, %err, "Formula failed");
                    explanation.push(format!(
                        "warning: deduction '{}' failed ({err}), contributed 0",
                        deduction.formula
                    ));
                }
            }
        }

        for bonus in &rule.scoring.bonuses {
            let value = resolve_signal(signals, &bonus.signal, &mut explanation);
            match eval_term(&bonus.formula, value) {
                Ok(mut amount) => {
                    if let Some(cap) = bonus.max_bonus {
                        amount = amount.min(cap);
                    }
                    score += amount;
                    explanation.push(format!(
                        "bonus '{}' ({} = {value}) -> +{amount:.2}",
                        bonus.formula, bonus.signal
                    ));
                }
                Err(err) => {
                    warn!(dimension, formula = %bonus.formula, %err, "Formula failed");
                    explanation.push(format!(
                        "warning: bonus '{}' failed ({err}), contributed 0",
                        bonus.formula
                    ));
                }
            }
        }

        let mut violations = Vec::new();
        for (name, spec) in &rule.signals {
            let key: SignalKey = name.parse().expect("infallible");
            if let Some(value) = signals.get(&key) {
                if value > spec.max {
                    violations.push(Violation {
                        signal: name.clone(),
                        value,
                        max: spec.max,
                        severity: spec.severity,
                    });
                }
            }
        }

        let clamped = score.clamp(0.0, 5.0);
        let rounded = (clamped * 10.0).round() / 10.0;
        explanation.push(format!("final score {rounded:.1} (clamped from {score:.2})"));

        Some(RuleResult {
            dimension: dimension.to_string(),
            score: rounded,
            violations,
            explanation,
        })
    }
}

/// Checked lookup: an absent signal is surfaced in the trail, then scored
/// as zero.
fn resolve_signal(signals: &SignalMap, name: &str, explanation: &mut Vec<String>) -> f64 {
    let key: SignalKey = name.parse().expect("infallible");
    match signals.get(&key) {
        Some(v) => v,
        None => {
            explanation.push(format!("note: signal '{name}' absent, treated as 0"));
            0.0
        }
    }
}

/// Formulas see the signal value under all three conventional names.
fn eval_term(text: &str, value: f64) -> anyhow::Result<f64> {
    let formula = Formula::parse(text)?;
    let mut context = HashMap::new();
    for name in ["count", "value", "coverage"] {
        context.insert(name.to_string(), Value::Num(value));
    }
    formula.eval_num(&context)
}
