//! Release-gate policies over a flattened report context.

use crate::formula::{Formula, Value};
use crate::Policy;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PolicyResult {
    pub name: String,
    pub pass: bool,
    pub message: String,
    pub enforced: bool,
}

/// Evaluates boolean gate expressions against the context the orchestrator
/// flattens out of the finished report. Evaluation never raises: a policy
/// that fails to parse or evaluate comes back `pass=false` with a
/// diagnostic message.
pub struct PolicyEvaluator {
    policies: Vec<Policy>,
}

impl PolicyEvaluator {
    pub fn new(policies: Vec<Policy>) -> Self {
        Self { policies }
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn evaluate_all(&self, context: &HashMap<String, Value>) -> Vec<PolicyResult> {
        self.policies
            .iter()
            .map(|p| self.evaluate(p, context))
            .collect()
    }

    fn evaluate(&self, policy: &Policy, context: &HashMap<String, Value>) -> PolicyResult {
        let outcome = Formula::parse(&policy.expr).and_then(|f| f.eval_bool(context));
        match outcome {
            Ok(pass) => PolicyResult {
                name: policy.name.clone(),
                pass,
                message: if pass {
                    format!("'{}' holds", policy.expr)
                } else {
                    format!("'{}' does not hold", policy.expr)
                },
                enforced: policy.enforced,
            },
            Err(err) => {
                warn!(policy = %policy.name, %err, "Policy evaluation failed");
                PolicyResult {
                    name: policy.name.clone(),
                    pass: false,
                    message: format!("evaluation failed: {err}"),
                    enforced: policy.enforced,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(name: &str, expr: &str, enforced: bool) -> Policy {
        Policy {
            name: name.into(),
            expr: expr.into(),
            enforced,
        }
    }

    fn context(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn passing_and_failing_gates() {
        let evaluator = PolicyEvaluator::new(vec![
            policy("no-critical", "critical_count == 0 AND overall_score >= 3.0", true),
            policy("low-risk", "risk_level == 'Low'", false),
        ]);
        let ctx = context(&[
            ("critical_count", Value::Num(0.0)),
            ("overall_score", Value::Num(4.1)),
            ("risk_level", Value::Str("Medium".into())),
        ]);

        let results = evaluator.evaluate_all(&ctx);
        assert!(results[0].pass);
        assert!(results[0].enforced);
        assert!(!results[1].pass);
    }

    #[test]
    fn broken_expression_fails_closed() {
        let evaluator = PolicyEvaluator::new(vec![policy("bad", "overall_score >=", true)]);
        let results = evaluator.evaluate_all(&HashMap::new());
        assert!(!results[0].pass);
        assert!(results[0].message.contains("evaluation failed"));
    }

    #[test]
    fn unknown_variable_fails_closed() {
        let evaluator = PolicyEvaluator::new(vec![policy("missing", "no_such_key > 1", false)]);
        let results = evaluator.evaluate_all(&HashMap::new());
        assert!(!results[0].pass);
    }

    #[test]
    fn dimension_score_keys_are_reachable() {
        let evaluator =
            PolicyEvaluator::new(vec![policy("secure", "score_security >= 4.0", true)]);
        let ctx = context(&[("score_security", Value::Num(4.5))]);
        assert!(evaluator.evaluate_all(&ctx)[0].pass);
    }
}
