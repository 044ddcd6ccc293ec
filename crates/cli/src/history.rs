//! The `history` command: list past runs from a JSONL store, optionally
//! with regression alerts between the two most recent runs.

use crate::args::HistoryArgs;
use crate::config::Config;
use anyhow::{bail, Result};
use engine::{AuditStore, JsonlStore};
use std::process::ExitCode;

pub fn run_history(args: HistoryArgs) -> Result<ExitCode> {
    let config = Config::load()?;
    let Some(store_path) = args.store.or(config.store_path) else {
        bail!("no store file given (use --store or set store_path in the config)");
    };
    let store = JsonlStore::new(&store_path);

    let history = store.get_audit_history(args.limit)?;
    if history.is_empty() {
        println!("No audit runs recorded in {}.", store_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    println!("  PAST RUNS ({})", store_path.display());
    println!("  ────────────────────────────────────────────────────────────");
    println!("  When (UTC)            Score   Risk       Critical  Id");
    for entry in &history {
        println!(
            "  {}   {:<5.1}  {:<9}  {:<8}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.overall_score,
            entry.risk_level.to_string(),
            entry.critical_count,
            entry.id
        );
    }

    if let Some(threshold) = args.regressions {
        let alerts = store.get_regression_alerts(threshold)?;
        if alerts.is_empty() {
            println!("\n  No dimension regressed by {threshold} or more.");
        } else {
            println!("\n  REGRESSIONS");
            for alert in alerts {
                println!(
                    "  {}: {:.1} -> {:.1} (dropped {:.1})",
                    alert.dimension, alert.previous, alert.current, alert.drop
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
