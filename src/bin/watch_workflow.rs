// benchguard - CI benchmark regression helpers
// Copyright (c) 2025 Oliver Seifert
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! # Workflow Watcher
//!
//! Blocks until the latest run of a GitHub Actions workflow completes, then
//! saves its log as `BenchmarkRun-<runId>.log`.
//!
//! Exit codes: 0 success (or no conclusion), 1 bad arguments such as a
//! missing log directory, 2 run failed, 3 timed out.
//!
//! Usage:
//!   watch-workflow --workflow perf.yml --repo owner/name [--ref master]
//!                  [--interval 15] [--timeout 3600]

use anyhow::{Result, ensure};
use benchguard::watch::{self, GhCli, SystemClock, WatchConfig, WatchOutcome};
use chrono::Local;
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "watch-workflow")]
#[command(about = "Wait for a GitHub Actions workflow run and fetch its logs", long_about = None)]
#[command(version)]
struct Args {
    /// Workflow file name or display name
    #[arg(long)]
    workflow: String,

    /// Repository in owner/name form
    #[arg(long)]
    repo: String,

    /// Git ref the run is expected on (informational)
    #[arg(long = "ref", default_value = "master")]
    git_ref: String,

    /// Seconds between polls
    #[arg(long, default_value = "15")]
    interval: u64,

    /// Seconds to wait before giving up
    #[arg(long, default_value = "3600")]
    timeout: u64,

    /// Directory the run log is written to
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(outcome) => process::exit(outcome.exit_code()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run() -> Result<WatchOutcome> {
    let args = Args::parse();
    ensure!(
        args.log_dir.is_dir(),
        "Log directory does not exist: {}",
        args.log_dir.display()
    );

    let config = WatchConfig {
        workflow: args.workflow,
        repo: args.repo,
        git_ref: args.git_ref,
        interval: Duration::from_secs(args.interval),
        timeout: Duration::from_secs(args.timeout),
        log_dir: args.log_dir,
    };

    log::info!(
        "Watching workflow '{}' in repo {} on ref {} (started {})",
        config.workflow,
        config.repo,
        config.git_ref,
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let outcome = watch::watch(&mut GhCli::new(), &mut SystemClock::start(), &config);
    match &outcome {
        WatchOutcome::Completed { run, .. } => println!("{} {}", "✓".green(), run),
        WatchOutcome::Failed { run, .. } => eprintln!("{} {}", "✗".red(), run),
        WatchOutcome::TimedOut { .. } => eprintln!(
            "{}",
            format!(
                "Timeout waiting for workflow run to complete after {}s",
                config.timeout.as_secs()
            )
            .red()
        ),
    }
    Ok(outcome)
}
