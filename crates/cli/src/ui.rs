//! User interface helpers for the CLI.

use colored::Colorize;
use std::io::IsTerminal;

pub fn print_header() {
    let version = env!("CARGO_PKG_VERSION");
    // Avoid panics when the version exceeds the expected width
    let spaces = " ".repeat(22usize.saturating_sub(version.len()));
    eprintln!(
        r#"
    ╭────────────────────────────────────╮
    │                                    │
    │     CODEPULSE  HEALTH  AUDIT       │
    │                                    │
    │     Version: {version}{spaces}│
    │                                    │
    ╰────────────────────────────────────╯
"#
    );
}

/// Stdout coloring is only worthwhile on a terminal.
pub fn use_color() -> bool {
    std::io::stdout().is_terminal()
}

pub fn gate_verdict(pass: bool) -> String {
    if pass {
        "RELEASE GATE: PASS".green().bold().to_string()
    } else {
        "RELEASE GATE: FAIL".red().bold().to_string()
    }
}
