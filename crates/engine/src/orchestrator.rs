//! Runs the analyzer plugins, merges rule-engine scores and assembles the
//! final report.
//!
//! Resilience contract: no single plugin failure aborts the run. A failed
//! plugin keeps its dimension slot (with no score) and contributes one
//! synthetic Major finding; everything else proceeds normally and a
//! complete report is always returned.

use crate::plugin::AnalyzerPlugin;
use crate::report::{ActionItem, AuditReport, DimensionScore, Finding, RiskLevel};
use chrono::Utc;
use ir::Severity;
use rules::formula::Value;
use rules::{PolicyEvaluator, RuleEngine};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

const ACTION_PLAN_CAP: usize = 10;

pub struct AuditOrchestrator {
    plugins: Vec<Box<dyn AnalyzerPlugin>>,
    rule_engine: RuleEngine,
    policy_evaluator: PolicyEvaluator,
}

impl AuditOrchestrator {
    pub fn new(
        plugins: Vec<Box<dyn AnalyzerPlugin>>,
        rule_engine: RuleEngine,
        policy_evaluator: PolicyEvaluator,
    ) -> Self {
        Self {
            plugins,
            rule_engine,
            policy_evaluator,
        }
    }

    /// Runs every dimension over the snapshot and assembles the report.
    pub fn run(&self, snapshot: &analysis::ProjectSnapshot, project_path: &str) -> AuditReport {
        let started = Instant::now();
        let mut dimensions: Vec<DimensionScore> = Vec::new();
        let mut findings: Vec<Finding> = Vec::new();

        for plugin in &self.plugins {
            let dimension = plugin.dimension().to_string();
            match plugin.analyze(snapshot) {
                Ok(output) => {
                    debug!(%dimension, score = output.score, findings = output.findings.len(), "Dimension analyzed");
                    let mut score = output.score;
                    let mut rule_explanation = None;
                    let mut dim_findings = output.findings;

                    if let Some(result) = self.rule_engine.apply_rule(&dimension, &output.signals)
                    {
                        score = result.score;
                        for violation in &result.violations {
                            let represented = dim_findings.iter().chain(findings.iter()).any(|f| {
                                f.title
                                    .to_lowercase()
                                    .starts_with(&violation.signal.to_lowercase())
                            });
                            if !represented {
                                dim_findings.push(
                                    Finding::new(
                                        &dimension,
                                        violation.severity,
                                        &format!(
                                            "{} above threshold ({} > {})",
                                            violation.signal, violation.value, violation.max
                                        ),
                                        "A configured scoring rule flagged this signal.",
                                    )
                                    .recommend("Bring the signal back under its configured limit."),
                                );
                            }
                        }
                        rule_explanation = Some(result.explanation);
                    }

                    dimensions.push(DimensionScore {
                        dimension,
                        score: Some(score),
                        findings_count: dim_findings.len(),
                        signals: output.signals,
                        rule_explanation,
                    });
                    findings.extend(dim_findings);
                }
                Err(err) => {
                    warn!(%dimension, %err, "Analyzer failed, continuing");
                    findings.push(
                        Finding::new(
                            &dimension,
                            Severity::Major,
                            &format!("Analyzer '{dimension}' failed"),
                            &format!("The analyzer did not complete: {err}"),
                        )
                        .recommend("Inspect the analyzer failure; its dimension was not scored."),
                    );
                    dimensions.push(DimensionScore {
                        dimension,
                        score: None,
                        findings_count: 1,
                        signals: ir::SignalMap::new(),
                        rule_explanation: None,
                    });
                }
            }
        }

        let scored: Vec<f64> = dimensions.iter().filter_map(|d| d.score).collect();
        let overall_score = if scored.is_empty() {
            0.0
        } else {
            let mean = scored.iter().sum::<f64>() / scored.len() as f64;
            (mean * 10.0).round() / 10.0
        };

        let mut critical_findings = Vec::new();
        let mut major_findings = Vec::new();
        let mut minor_findings = Vec::new();
        for finding in findings {
            match finding.severity {
                Severity::Critical => critical_findings.push(finding),
                Severity::Major => major_findings.push(finding),
                Severity::Minor => minor_findings.push(finding),
            }
        }

        let risk_level = RiskLevel::classify(
            overall_score,
            critical_findings.len(),
            major_findings.len(),
        );

        let action_plan: Vec<ActionItem> = critical_findings
            .iter()
            .chain(&major_findings)
            .take(ACTION_PLAN_CAP)
            .map(ActionItem::from_finding)
            .collect();

        let context = policy_context(
            overall_score,
            critical_findings.len(),
            major_findings.len(),
            minor_findings.len(),
            risk_level,
            &dimensions,
        );
        let policy_results = self.policy_evaluator.evaluate_all(&context);

        AuditReport {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            project_path: project_path.to_string(),
            overall_score,
            critical_count: critical_findings.len(),
            major_count: major_findings.len(),
            minor_count: minor_findings.len(),
            risk_level,
            dimensions,
            critical_findings,
            major_findings,
            minor_findings,
            action_plan,
            policy_results,
            execution_time_seconds: started.elapsed().as_secs_f64(),
        }
    }
}

/// Flattens the assembled report into one policy namespace: overall score,
/// severity counts, risk level, `score_<dimension>` per slot, and every raw
/// signal merged in dimension order. On a signal-key collision the later
/// dimension wins.
fn policy_context(
    overall_score: f64,
    critical_count: usize,
    major_count: usize,
    minor_count: usize,
    risk_level: RiskLevel,
    dimensions: &[DimensionScore],
) -> HashMap<String, Value> {
    let mut context = HashMap::new();
    context.insert("overall_score".to_string(), Value::Num(overall_score));
    context.insert(
        "critical_count".to_string(),
        Value::Num(critical_count as f64),
    );
    context.insert("major_count".to_string(), Value::Num(major_count as f64));
    context.insert("minor_count".to_string(), Value::Num(minor_count as f64));
    context.insert(
        "risk_level".to_string(),
        Value::Str(risk_level.as_str().to_string()),
    );
    for dim in dimensions {
        context.insert(
            format!("score_{}", dim.dimension),
            Value::Num(dim.score.unwrap_or(0.0)),
        );
        for (key, value) in dim.signals.iter() {
            context.insert(key.as_str().to_string(), Value::Num(value));
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{AnalyzerOutput, AnalyzerPlugin};
    use analysis::ProjectSnapshot;
    use anyhow::anyhow;
    use ir::{SignalKey, SignalMap};
    use rules::Policy;
    use std::collections::BTreeMap;

    fn empty_snapshot() -> ProjectSnapshot {
        ProjectSnapshot {
            units: Vec::new(),
            arenas: HashMap::new(),
            call_sites: Vec::new(),
            taint_flows: Vec::new(),
            graph: ir::DependencyGraph::default(),
            cycles: Vec::new(),
        }
    }

    struct FixedPlugin {
        name: &'static str,
        score: f64,
        findings: Vec<(Severity, &'static str)>,
        signals: Vec<(SignalKey, f64)>,
    }

    impl AnalyzerPlugin for FixedPlugin {
        fn dimension(&self) -> &str {
            self.name
        }

        fn analyze(&self, _snapshot: &ProjectSnapshot) -> anyhow::Result<AnalyzerOutput> {
            let mut signals = SignalMap::new();
            for (key, value) in &self.signals {
                signals.set(key.clone(), *value);
            }
            Ok(AnalyzerOutput {
                findings: self
                    .findings
                    .iter()
                    .map(|(sev, title)| Finding::new(self.name, *sev, title, "fixture"))
                    .collect(),
                score: self.score,
                signals,
            })
        }
    }

    struct FailingPlugin;

    impl AnalyzerPlugin for FailingPlugin {
        fn dimension(&self) -> &str {
            "flaky"
        }

        fn analyze(&self, _snapshot: &ProjectSnapshot) -> anyhow::Result<AnalyzerOutput> {
            Err(anyhow!("backend unavailable"))
        }
    }

    fn orchestrator(plugins: Vec<Box<dyn AnalyzerPlugin>>) -> AuditOrchestrator {
        AuditOrchestrator::new(
            plugins,
            RuleEngine::new(BTreeMap::new()),
            PolicyEvaluator::new(Vec::new()),
        )
    }

    #[test]
    fn failed_plugin_keeps_its_slot_and_adds_one_major_finding() {
        let orch = orchestrator(vec![
            Box::new(FixedPlugin {
                name: "a",
                score: 4.0,
                findings: vec![],
                signals: vec![],
            }),
            Box::new(FailingPlugin),
            Box::new(FixedPlugin {
                name: "c",
                score: 4.0,
                findings: vec![],
                signals: vec![],
            }),
        ]);
        let report = orch.run(&empty_snapshot(), ".");

        assert_eq!(report.dimensions.len(), 3);
        assert!(report.dimensions[1].score.is_none());
        assert_eq!(report.major_count, 1);
        assert!(report.major_findings[0].title.contains("flaky"));
        // failed dimension excluded from the mean
        assert_eq!(report.overall_score, 4.0);
    }

    #[test]
    fn end_to_end_aggregation() {
        // X scores 5.0 with no findings, Y fails, Z scores 1.0 with one
        // Critical finding.
        let orch = orchestrator(vec![
            Box::new(FixedPlugin {
                name: "x",
                score: 5.0,
                findings: vec![],
                signals: vec![],
            }),
            Box::new(FailingPlugin),
            Box::new(FixedPlugin {
                name: "z",
                score: 1.0,
                findings: vec![(Severity::Critical, "Tainted data reaches eval")],
                signals: vec![],
            }),
        ]);
        let report = orch.run(&empty_snapshot(), ".");

        assert_eq!(report.overall_score, 3.0);
        assert_eq!(report.critical_count, 1);
        assert_eq!(report.major_count, 1);
        assert_eq!(report.risk_level, RiskLevel::High);
    }

    #[test]
    fn zero_dimensions_scores_zero() {
        let report = orchestrator(Vec::new()).run(&empty_snapshot(), ".");
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn rule_score_supersedes_and_violations_become_findings() {
        let rule: rules::Rule = serde_yaml::from_str(
            r#"
dimension: z
signals:
  tainted_sink_calls: { max: 0, severity: critical }
scoring:
  base_score: 5.0
  deductions:
    - signal: tainted_sink_calls
      formula: "count * 2"
"#,
        )
        .unwrap();
        let orch = AuditOrchestrator::new(
            vec![Box::new(FixedPlugin {
                name: "z",
                score: 4.9,
                findings: vec![],
                signals: vec![(SignalKey::TaintedSinkCalls, 1.0)],
            })],
            RuleEngine::new(BTreeMap::from([("z".to_string(), rule)])),
            PolicyEvaluator::new(Vec::new()),
        );
        let report = orch.run(&empty_snapshot(), ".");

        assert_eq!(report.dimensions[0].score, Some(3.0));
        assert!(report.dimensions[0].rule_explanation.is_some());
        assert_eq!(report.critical_count, 1);
        assert!(report.critical_findings[0]
            .title
            .starts_with("tainted_sink_calls"));
    }

    #[test]
    fn violation_already_represented_is_not_duplicated() {
        let rule: rules::Rule = serde_yaml::from_str(
            r#"
dimension: z
signals:
  tainted_sink_calls: { max: 0, severity: critical }
scoring:
  base_score: 5.0
"#,
        )
        .unwrap();
        let orch = AuditOrchestrator::new(
            vec![Box::new(FixedPlugin {
                name: "z",
                score: 4.0,
                findings: vec![(Severity::Critical, "Tainted_sink_calls detected in handler")],
                signals: vec![(SignalKey::TaintedSinkCalls, 2.0)],
            })],
            RuleEngine::new(BTreeMap::from([("z".to_string(), rule)])),
            PolicyEvaluator::new(Vec::new()),
        );
        let report = orch.run(&empty_snapshot(), ".");
        assert_eq!(report.critical_count, 1);
    }

    #[test]
    fn policies_see_the_flattened_context() {
        let orch = AuditOrchestrator::new(
            vec![Box::new(FixedPlugin {
                name: "security",
                score: 4.5,
                findings: vec![],
                signals: vec![(SignalKey::TaintedSinkCalls, 0.0)],
            })],
            RuleEngine::new(BTreeMap::new()),
            PolicyEvaluator::new(vec![Policy {
                name: "gate".into(),
                expr: "score_security >= 4.0 AND tainted_sink_calls == 0 AND risk_level == 'Low'"
                    .into(),
                enforced: true,
            }]),
        );
        let report = orch.run(&empty_snapshot(), ".");
        assert_eq!(report.policy_results.len(), 1);
        assert!(report.policy_results[0].pass);
    }

    #[test]
    fn reports_are_deterministic_apart_from_run_metadata() {
        let build = || {
            orchestrator(vec![Box::new(FixedPlugin {
                name: "a",
                score: 3.2,
                findings: vec![(Severity::Minor, "Ungrounded call to f")],
                signals: vec![(SignalKey::UngroundedCalls, 1.0)],
            })])
        };
        let snapshot = empty_snapshot();
        let a = build().run(&snapshot, ".");
        let b = build().run(&snapshot, ".");

        assert_eq!(a.overall_score, b.overall_score);
        assert_eq!(a.risk_level, b.risk_level);
        assert_eq!(
            a.findings().map(|f| &f.title).collect::<Vec<_>>(),
            b.findings().map(|f| &f.title).collect::<Vec<_>>()
        );
        assert_ne!(a.id, b.id);
    }
}
