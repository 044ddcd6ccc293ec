//! Renderers for a finished [`AuditReport`]: a human-readable text view
//! and pretty JSON. Both are read-only consumers and deterministic for a
//! given report.

use engine::{AuditReport, Finding, RiskLevel};
use ir::Severity;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format '{other}' (expected text or json)")),
        }
    }
}

pub fn render(report: &AuditReport, format: Format, color: bool) -> anyhow::Result<String> {
    match format {
        Format::Text => Ok(render_text(report, color)),
        Format::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

/// Severity colored with simple ANSI codes. Adds no dependencies.
fn color_severity(sev: Severity, color: bool) -> String {
    let (code, text) = match sev {
        Severity::Critical => ("\x1b[31m", "CRITICAL"),
        Severity::Major => ("\x1b[33m", "MAJOR"),
        Severity::Minor => ("\x1b[32m", "MINOR"),
    };
    if color {
        format!("{code}{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn color_risk(risk: RiskLevel, color: bool) -> String {
    let code = match risk {
        RiskLevel::Critical | RiskLevel::High => "\x1b[31m",
        RiskLevel::Medium => "\x1b[33m",
        RiskLevel::Low => "\x1b[32m",
    };
    if color {
        format!("{code}{risk}\x1b[0m")
    } else {
        risk.to_string()
    }
}

fn simple_box(title: &str) -> String {
    let width = title.len() + 2;
    format!(
        "╭{}╮\n│ {} │\n╰{}╯\n",
        "─".repeat(width),
        title,
        "─".repeat(width)
    )
}

fn render_text(report: &AuditReport, color: bool) -> String {
    let mut out = String::new();
    out.push_str(&simple_box("Audit Report"));
    let _ = writeln!(out, "  Project:     {}", report.project_path);
    let _ = writeln!(out, "  Overall:     {:.1} / 5.0", report.overall_score);
    let _ = writeln!(out, "  Risk:        {}", color_risk(report.risk_level, color));
    let _ = writeln!(
        out,
        "  Findings:    {} critical, {} major, {} minor",
        report.critical_count, report.major_count, report.minor_count
    );
    let _ = writeln!(
        out,
        "  Duration:    {:.2}s",
        report.execution_time_seconds
    );
    out.push('\n');

    out.push_str("  DIMENSIONS\n");
    out.push_str("  ────────────────────────────────────────────────\n");
    for dim in &report.dimensions {
        match dim.score {
            Some(score) => {
                let _ = writeln!(
                    out,
                    "  {:<20} {:.1}   ({} findings)",
                    dim.dimension, score, dim.findings_count
                );
            }
            None => {
                let _ = writeln!(out, "  {:<20} failed", dim.dimension);
            }
        }
    }
    out.push('\n');

    for (label, findings) in [
        ("CRITICAL", &report.critical_findings),
        ("MAJOR", &report.major_findings),
        ("MINOR", &report.minor_findings),
    ] {
        if findings.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {label} FINDINGS");
        out.push_str("  ────────────────────────────────────────────────\n");
        for finding in findings {
            render_finding(&mut out, finding, color);
        }
        out.push('\n');
    }

    if !report.action_plan.is_empty() {
        out.push_str("  ACTION PLAN\n");
        out.push_str("  ────────────────────────────────────────────────\n");
        for (idx, item) in report.action_plan.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. [{}] {} ({})",
                idx + 1,
                item.priority,
                item.title,
                item.dimension
            );
        }
        out.push('\n');
    }

    if !report.policy_results.is_empty() {
        out.push_str("  POLICIES\n");
        out.push_str("  ────────────────────────────────────────────────\n");
        for policy in &report.policy_results {
            let status = if policy.pass { "PASS" } else { "FAIL" };
            let tag = if policy.enforced { " (enforced)" } else { "" };
            let _ = writeln!(out, "  [{status}] {}{tag}: {}", policy.name, policy.message);
        }
    }

    out
}

fn render_finding(out: &mut String, finding: &Finding, color: bool) {
    let location = match (&finding.file, finding.line) {
        (Some(file), Some(line)) => format!("  {file}:{line}"),
        (Some(file), None) => format!("  {file}"),
        _ => String::new(),
    };
    let _ = writeln!(
        out,
        "  [{}] {}{location}",
        color_severity(finding.severity, color),
        finding.title
    );
    if !finding.recommendation.is_empty() {
        let _ = writeln!(out, "      ↳ {}", finding.recommendation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine::{ActionItem, DimensionScore};

    fn fixture() -> AuditReport {
        let finding = Finding::new(
            "security",
            Severity::Critical,
            "Tainted data reaches eval",
            "desc",
        )
        .recommend("Sanitize the input.")
        .at("src/app.py", 12);
        AuditReport {
            id: "fixed".into(),
            created_at: Utc::now(),
            project_path: "demo".into(),
            overall_score: 3.0,
            critical_count: 1,
            major_count: 0,
            minor_count: 0,
            risk_level: RiskLevel::High,
            dimensions: vec![
                DimensionScore {
                    dimension: "security".into(),
                    score: Some(2.0),
                    findings_count: 1,
                    signals: ir::SignalMap::new(),
                    rule_explanation: None,
                },
                DimensionScore {
                    dimension: "flaky".into(),
                    score: None,
                    findings_count: 1,
                    signals: ir::SignalMap::new(),
                    rule_explanation: None,
                },
            ],
            critical_findings: vec![finding.clone()],
            major_findings: Vec::new(),
            minor_findings: Vec::new(),
            action_plan: vec![ActionItem::from_finding(&finding)],
            policy_results: Vec::new(),
            execution_time_seconds: 0.42,
        }
    }

    #[test]
    fn text_report_lists_sections() {
        let text = render(&fixture(), Format::Text, false).unwrap();
        assert!(text.contains("Audit Report"));
        assert!(text.contains("High"));
        assert!(text.contains("DIMENSIONS"));
        assert!(text.contains("security"));
        assert!(text.contains("failed"));
        assert!(text.contains("[CRITICAL] Tainted data reaches eval  src/app.py:12"));
        assert!(text.contains("ACTION PLAN"));
        assert!(!text.contains("\x1b["));
    }

    #[test]
    fn color_wraps_severity_in_ansi() {
        let text = render(&fixture(), Format::Text, true).unwrap();
        assert!(text.contains("\x1b[31mCRITICAL\x1b[0m"));
    }

    #[test]
    fn json_report_round_trips() {
        let text = render(&fixture(), Format::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["overall_score"], 3.0);
        assert_eq!(value["risk_level"], "High");
        assert_eq!(value["dimensions"][1]["score"], serde_json::Value::Null);
    }
}
