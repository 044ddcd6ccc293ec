//! The `audit` command: build a snapshot, run every dimension, render the
//! report and map the release gate to an exit code.

use crate::args::AuditArgs;
use crate::config::Config;
use crate::ui;
use analysis::{ProjectSnapshot, SnapshotConfig};
use anyhow::{Context, Result};
use engine::{builtin_plugins, AuditOrchestrator, AuditReport, AuditStore, JsonlStore};
use reporters::Format;
use rules::{load_policies, PolicyEvaluator, RuleEngine};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;

pub fn run_audit(args: AuditArgs) -> Result<ExitCode> {
    let level = if args.quiet {
        LevelFilter::OFF
    } else if args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    if args.debug && !args.quiet {
        debug!("Debug mode enabled");
    }

    let config = Config::load()?;
    let rules_dir = args.rules.or(config.rules_dir);
    let policies_file = args.policies.or(config.policies_file);
    let store_path = args.store.or(config.store_path);

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
    {
        error!("Failed to build global thread pool: {e}");
    }

    if args.format == Format::Text && !args.quiet {
        ui::print_header();
    }

    let path = args
        .path
        .canonicalize()
        .with_context(|| format!("resolving {}", args.path.display()))?;
    info!(target = %path.display(), "Audit started");

    let snapshot_config = SnapshotConfig {
        extra_excludes: args.exclude.clone(),
        ..SnapshotConfig::default()
    };
    let snapshot = ProjectSnapshot::build(&path, &snapshot_config)?;
    info!(
        files = snapshot.units.len(),
        call_sites = snapshot.call_sites.len(),
        "Snapshot ready"
    );

    let rule_engine = match &rules_dir {
        Some(dir) => RuleEngine::from_dir(dir)?,
        None => RuleEngine::new(Default::default()),
    };
    let policies = match &policies_file {
        Some(file) => load_policies(file)?,
        None => Vec::new(),
    };
    let orchestrator =
        AuditOrchestrator::new(builtin_plugins(), rule_engine, PolicyEvaluator::new(policies));

    let report = orchestrator.run(&snapshot, &path.display().to_string());

    if let Some(store_path) = store_path {
        persist(&report, store_path);
    }

    let output = reporters::render(&report, args.format, ui::use_color())?;
    println!("{output}");

    let pass = gate_passes(&report);
    if args.format == Format::Text && !args.quiet {
        eprintln!("{}", ui::gate_verdict(pass));
    }
    Ok(if pass {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

/// Store failures never invalidate the report that was just produced.
fn persist(report: &AuditReport, path: PathBuf) {
    let store = JsonlStore::new(&path);
    match store.save_audit_run(report) {
        Ok(id) => debug!(%id, store = %path.display(), "Report persisted"),
        Err(err) => warn!(store = %path.display(), %err, "Failed to persist report"),
    }
}

/// Enforced policies decide the gate when any are present; otherwise the
/// default gate blocks on critical findings or a low overall score.
fn gate_passes(report: &AuditReport) -> bool {
    let enforced: Vec<_> = report
        .policy_results
        .iter()
        .filter(|p| p.enforced)
        .collect();
    if enforced.is_empty() {
        !(report.critical_count > 0 || report.overall_score < 3.0)
    } else {
        enforced.iter().all(|p| p.pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine::RiskLevel;

    fn report(overall: f64, critical: usize, policies: Vec<rules::PolicyResult>) -> AuditReport {
        AuditReport {
            id: "t".into(),
            created_at: Utc::now(),
            project_path: ".".into(),
            overall_score: overall,
            critical_count: critical,
            major_count: 0,
            minor_count: 0,
            risk_level: RiskLevel::Low,
            dimensions: Vec::new(),
            critical_findings: Vec::new(),
            major_findings: Vec::new(),
            minor_findings: Vec::new(),
            action_plan: Vec::new(),
            policy_results: policies,
            execution_time_seconds: 0.0,
        }
    }

    fn policy(pass: bool, enforced: bool) -> rules::PolicyResult {
        rules::PolicyResult {
            name: "p".into(),
            pass,
            message: String::new(),
            enforced,
        }
    }

    #[test]
    fn default_gate_blocks_on_criticals_or_low_score() {
        assert!(gate_passes(&report(4.0, 0, Vec::new())));
        assert!(!gate_passes(&report(4.0, 1, Vec::new())));
        assert!(!gate_passes(&report(2.9, 0, Vec::new())));
    }

    #[test]
    fn enforced_policies_override_the_default_gate() {
        // an enforced passing policy lets a low score through
        assert!(gate_passes(&report(1.0, 2, vec![policy(true, true)])));
        // an enforced failing policy blocks a clean report
        assert!(!gate_passes(&report(5.0, 0, vec![policy(false, true)])));
        // unenforced policies are advisory only
        assert!(gate_passes(&report(5.0, 0, vec![policy(false, false)])));
    }
}
