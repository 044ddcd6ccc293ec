//! Report model: findings, dimension scores, risk ladder and the final
//! [`AuditReport`] handed to reporters and the store.

use chrono::{DateTime, Utc};
use ir::{Severity, SignalMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One reported issue. Append-only within a run.
pub struct Finding {
    pub id: String,
    pub dimension: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Finding {
    pub fn new(dimension: &str, severity: Severity, title: &str, description: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            dimension: dimension.to_string(),
            severity,
            title: title.to_string(),
            description: description.to_string(),
            recommendation: String::new(),
            file: None,
            line: None,
        }
    }

    pub fn recommend(mut self, text: &str) -> Self {
        self.recommendation = text.to_string();
        self
    }

    pub fn at(mut self, file: &str, line: usize) -> Self {
        self.file = Some(file.to_string());
        self.line = Some(line);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One analyzer's slot in the report. `score` is `None` when the plugin
/// failed; the slot is retained but excluded from the overall mean.
pub struct DimensionScore {
    pub dimension: String,
    pub score: Option<f64>,
    pub findings_count: usize,
    pub signals: SignalMap,
    /// Present when a configured rule superseded the plugin's own score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_explanation: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Fixed, ordered ladder; first match wins.
    pub fn classify(overall_score: f64, critical_count: usize, major_count: usize) -> Self {
        if critical_count > 5 || overall_score < 2.0 {
            RiskLevel::Critical
        } else if critical_count > 0 || major_count > 10 || overall_score < 3.0 {
            RiskLevel::High
        } else if major_count > 5 || overall_score < 4.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    pub title: String,
    pub dimension: String,
    pub priority: String,
    pub effort: String,
}

impl ActionItem {
    pub fn from_finding(finding: &Finding) -> Self {
        let (priority, effort) = match finding.severity {
            Severity::Critical => ("immediate", "high"),
            Severity::Major => ("soon", "medium"),
            Severity::Minor => ("backlog", "low"),
        };
        Self {
            title: finding.title.clone(),
            dimension: finding.dimension.clone(),
            priority: priority.to_string(),
            effort: effort.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Full output of one audit run. Immutable once returned.
pub struct AuditReport {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub project_path: String,
    pub overall_score: f64,
    pub critical_count: usize,
    pub major_count: usize,
    pub minor_count: usize,
    pub risk_level: RiskLevel,
    /// Dimension-processing order, preserved.
    pub dimensions: Vec<DimensionScore>,
    pub critical_findings: Vec<Finding>,
    pub major_findings: Vec<Finding>,
    pub minor_findings: Vec<Finding>,
    pub action_plan: Vec<ActionItem>,
    pub policy_results: Vec<rules::PolicyResult>,
    pub execution_time_seconds: f64,
}

impl AuditReport {
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.critical_findings
            .iter()
            .chain(&self.major_findings)
            .chain(&self.minor_findings)
    }
}
