use clap::{Args as ClapArgs, Parser, Subcommand};
use reporters::Format;
use std::path::PathBuf;

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn parse_threads(s: &str) -> Result<usize, String> {
    let v: usize = s
        .parse()
        .map_err(|e: std::num::ParseIntError| e.to_string())?;
    if v == 0 {
        Err("threads must be greater than 0".into())
    } else {
        Ok(v)
    }
}

fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "codepulse - code-health audits for AI-era codebases",
    long_about = "codepulse audits a project tree across independent dimensions \
(AI call reliability, security taint flows, architecture) and scores each one \
against declarative rules. Release-gate policies turn the report into an \
exit code for CI.

Examples:
  codepulse audit .                         # audit the current directory
  codepulse audit src/ --format json        # machine-readable report
  codepulse audit . --rules rules/ --policies policies.yml
  codepulse history --store audits.jsonl    # past runs",
    subcommand_required = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit a project and print the report
    Audit(AuditArgs),
    /// Show past audit runs from a store file
    History(HistoryArgs),
}

#[derive(ClapArgs)]
pub struct AuditArgs {
    /// Path to the project to audit
    pub path: PathBuf,
    /// Directory of per-dimension rule files
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// Release-gate policy file
    #[arg(long)]
    pub policies: Option<PathBuf>,
    /// Output format for the report
    #[arg(long, default_value = "text", value_parser = parse_format)]
    pub format: Format,
    /// Append the report to this JSONL store
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Number of parallel threads for file parsing
    #[arg(long, default_value_t = default_threads(), value_parser = parse_threads)]
    pub threads: usize,
    /// Exclude extra directory names from the scan
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,
    /// Suppress log output
    #[arg(long)]
    pub quiet: bool,
    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

#[derive(ClapArgs)]
pub struct HistoryArgs {
    /// JSONL store file to read
    #[arg(long)]
    pub store: Option<PathBuf>,
    /// Maximum number of runs to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
    /// Also show dimensions whose score regressed by at least this much
    #[arg(long)]
    pub regressions: Option<f64>,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
