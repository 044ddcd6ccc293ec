//! Audit persistence: a trait the orchestrator's callers write reports
//! through, and an append-only JSONL file implementation.
//!
//! Store failures never invalidate the in-memory report; callers log and
//! move on.

use crate::report::{AuditReport, RiskLevel};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Compact history row for listings.
pub struct HistoryEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub overall_score: f64,
    pub risk_level: RiskLevel,
    pub critical_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub created_at: DateTime<Utc>,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
/// A dimension whose score dropped between the two most recent runs.
pub struct RegressionAlert {
    pub dimension: String,
    pub previous: f64,
    pub current: f64,
    pub drop: f64,
}

pub trait AuditStore: Send + Sync {
    fn save_audit_run(&self, report: &AuditReport) -> Result<String>;
    fn get_audit_history(&self, limit: usize) -> Result<Vec<HistoryEntry>>;
    fn get_dimension_trend(&self, dimension: &str, days: i64) -> Result<Vec<TrendPoint>>;
    fn get_regression_alerts(&self, threshold: f64) -> Result<Vec<RegressionAlert>>;
}

/// One report per line, appended in run order.
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Vec<AuditReport>> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading store {}", self.path.display()))?;
        let mut reports = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditReport>(line) {
                Ok(report) => reports.push(report),
                Err(err) => {
                    warn!(line = idx + 1, %err, "Skipping unreadable store line");
                }
            }
        }
        Ok(reports)
    }
}

impl AuditStore for JsonlStore {
    fn save_audit_run(&self, report: &AuditReport) -> Result<String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating store directory {}", parent.display()))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening store {}", self.path.display()))?;
        let line = serde_json::to_string(report).context("serializing report")?;
        writeln!(file, "{line}").context("appending report")?;
        Ok(report.id.clone())
    }

    fn get_audit_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut reports = self.load()?;
        reports.reverse(); // newest first
        Ok(reports
            .into_iter()
            .take(limit)
            .map(|r| HistoryEntry {
                id: r.id,
                created_at: r.created_at,
                overall_score: r.overall_score,
                risk_level: r.risk_level,
                critical_count: r.critical_count,
            })
            .collect())
    }

    fn get_dimension_trend(&self, dimension: &str, days: i64) -> Result<Vec<TrendPoint>> {
        let cutoff = Utc::now() - Duration::days(days);
        Ok(self
            .load()?
            .into_iter()
            .filter(|r| r.created_at >= cutoff)
            .filter_map(|r| {
                r.dimensions
                    .iter()
                    .find(|d| d.dimension == dimension)
                    .and_then(|d| d.score)
                    .map(|score| TrendPoint {
                        created_at: r.created_at,
                        score,
                    })
            })
            .collect())
    }

    fn get_regression_alerts(&self, threshold: f64) -> Result<Vec<RegressionAlert>> {
        let reports = self.load()?;
        let [.., previous, current] = reports.as_slice() else {
            return Ok(Vec::new());
        };
        let mut alerts = Vec::new();
        for dim in &current.dimensions {
            let Some(current_score) = dim.score else {
                continue;
            };
            let Some(previous_score) = previous
                .dimensions
                .iter()
                .find(|d| d.dimension == dim.dimension)
                .and_then(|d| d.score)
            else {
                continue;
            };
            let drop = previous_score - current_score;
            if drop >= threshold {
                alerts.push(RegressionAlert {
                    dimension: dim.dimension.clone(),
                    previous: previous_score,
                    current: current_score,
                    drop,
                });
            }
        }
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::DimensionScore;
    use tempfile::TempDir;

    fn report(score: f64, dim_score: f64) -> AuditReport {
        AuditReport {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            project_path: ".".into(),
            overall_score: score,
            critical_count: 0,
            major_count: 0,
            minor_count: 0,
            risk_level: RiskLevel::Low,
            dimensions: vec![DimensionScore {
                dimension: "security".into(),
                score: Some(dim_score),
                findings_count: 0,
                signals: ir::SignalMap::new(),
                rule_explanation: None,
            }],
            critical_findings: Vec::new(),
            major_findings: Vec::new(),
            minor_findings: Vec::new(),
            action_plan: Vec::new(),
            policy_results: Vec::new(),
            execution_time_seconds: 0.1,
        }
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let tmp = TempDir::new().unwrap();
        let store = JsonlStore::new(tmp.path().join("audits.jsonl"));
        let first = store.save_audit_run(&report(3.0, 3.0)).unwrap();
        let second = store.save_audit_run(&report(4.0, 4.0)).unwrap();

        let history = store.get_audit_history(1).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, second);
        assert_ne!(history[0].id, first);
    }

    #[test]
    fn trend_tracks_one_dimension() {
        let tmp = TempDir::new().unwrap();
        let store = JsonlStore::new(tmp.path().join("audits.jsonl"));
        store.save_audit_run(&report(3.0, 2.5)).unwrap();
        store.save_audit_run(&report(4.0, 4.5)).unwrap();

        let trend = store.get_dimension_trend("security", 30).unwrap();
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].score, 2.5);
        assert!(store.get_dimension_trend("nope", 30).unwrap().is_empty());
    }

    #[test]
    fn regression_alerts_compare_last_two_runs() {
        let tmp = TempDir::new().unwrap();
        let store = JsonlStore::new(tmp.path().join("audits.jsonl"));
        store.save_audit_run(&report(4.0, 4.0)).unwrap();
        store.save_audit_run(&report(2.0, 2.0)).unwrap();

        let alerts = store.get_regression_alerts(1.0).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].dimension, "security");
        assert_eq!(alerts[0].drop, 2.0);

        assert!(store.get_regression_alerts(3.0).unwrap().is_empty());
    }

    #[test]
    fn unreadable_lines_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("audits.jsonl");
        let store = JsonlStore::new(&path);
        store.save_audit_run(&report(3.0, 3.0)).unwrap();
        fs::write(
            &path,
            format!("{}\nnot json\n", fs::read_to_string(&path).unwrap().trim()),
        )
        .unwrap();

        assert_eq!(store.get_audit_history(10).unwrap().len(), 1);
    }

    #[test]
    fn missing_store_file_reads_empty() {
        let store = JsonlStore::new("/nonexistent/audits.jsonl");
        assert!(store.get_audit_history(5).unwrap().is_empty());
    }
}
