//! Command-line entry point: load suite files, run them, print results.
//!
//! Usage:
//!   veritest <suite.yaml>... [OPTIONS]

use crate::runner::{RunnerOptions, SuiteRunner, SuiteResults};
use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use url::Url;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Declarative API test runner
#[derive(Parser, Debug)]
#[command(name = "veritest")]
#[command(
    author,
    version,
    about = "Run declarative YAML test suites against an HTTP API"
)]
pub struct Args {
    /// Test suite YAML files to run, in order
    #[arg(required = true)]
    pub suites: Vec<PathBuf>,

    /// Base URL the relative test-case URLs are joined against
    #[arg(short, long, default_value = "http://localhost:5000")]
    pub base_url: Url,

    /// Environment key for env-scoped entries in the common data file
    #[arg(short, long, default_value = "default")]
    pub env: String,

    /// Common JSON test-data file shared across suites
    #[arg(short = 'd', long)]
    pub test_data: Option<PathBuf>,

    /// Only run test cases carrying at least one of these tags
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Raw Cookie header attached to every request
    #[arg(long)]
    pub cookie: Option<String>,

    /// Deadline in seconds for each HTTP call and precondition script
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Print each suite's full result map as JSON
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run every suite. Returns `true` when all executed test cases passed.
/// Missing suite files are skipped with a warning; if none of the given
/// paths exist, that is an error.
pub async fn run(args: &Args) -> Result<bool, anyhow::Error> {
    let existing: Vec<&PathBuf> = args.suites.iter().filter(|p| p.exists()).collect();
    for missing in args.suites.iter().filter(|p| !p.exists()) {
        warn!(suite = %missing.display(), "suite file not found, skipping");
    }
    if existing.is_empty() {
        bail!("none of the given suite files exist");
    }

    let mut options = RunnerOptions::new(args.base_url.clone());
    options.env = args.env.clone();
    options.cookie = args.cookie.clone();
    options.test_data_file = args.test_data.clone();
    options.timeout = Duration::from_secs(args.timeout_secs);
    let runner = SuiteRunner::new(options).context("failed to initialize runner")?;

    let mut all_passed = true;
    let mut total = 0usize;
    let mut failed = 0usize;

    for path in existing {
        println!("{BOLD}{CYAN}{}{RESET}", path.display());
        let results = runner.run_suite(path, &args.tags).await?;
        report_suite(&results, args.verbose)?;
        total += results.len();
        let suite_failed = results.values().filter(|r| !r.status).count();
        failed += suite_failed;
        all_passed &= suite_failed == 0;
    }

    println!(
        "\n{BOLD}{}{} passed, {} failed{RESET}",
        if failed == 0 { GREEN } else { RED },
        total - failed,
        failed
    );
    Ok(all_passed)
}

fn report_suite(results: &SuiteResults, verbose: bool) -> Result<(), anyhow::Error> {
    for (name, result) in results {
        if result.status {
            println!("  {GREEN}PASS{RESET} {name}");
        } else {
            println!("  {RED}FAIL{RESET} {name}");
            if let Some(error) = &result.error {
                println!("       {DIM}{error}{RESET}");
            }
        }
    }
    if verbose {
        let rendered =
            serde_json::to_string_pretty(results).context("failed to render results")?;
        println!("{rendered}");
    }
    Ok(())
}
