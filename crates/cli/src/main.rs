//! Entry point for the command-line interface.
//! Delegates to dedicated modules for argument handling, the audit run
//! and history queries.

use codepulse::args::{parse_cli, Commands};
use codepulse::audit::run_audit;
use codepulse::history::run_history;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = parse_cli();
    let outcome = match cli.command {
        Commands::Audit(args) => run_audit(args),
        Commands::History(args) => run_history(args),
    };
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
