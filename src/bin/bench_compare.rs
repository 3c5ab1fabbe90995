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

//! # Benchmark Regression Guard
//!
//! Compares the latest BenchmarkDotNet results against a stored baseline and
//! fails the CI step when a benchmark slowed down beyond the threshold or the
//! baseline was recorded on a different machine class.
//!
//! Exit codes: 0 ok or nothing to compare, 1 no benchmark data, 2 regression,
//! 3 environment mismatch.
//!
//! Usage:
//!   bench-compare --baseline baseline.json [--threshold 5] [--update-baseline]
//!                 [--allow-env-mismatch] [--baseline-family <name>]

use anyhow::Result;
use benchguard::fingerprint::EnvironmentFingerprint;
use benchguard::guard::{self, GuardConfig, Outcome};
use benchguard::locate::DEFAULT_RESULTS_DIR;
use clap::Parser;
use owo_colors::OwoColorize;
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "bench-compare")]
#[command(about = "Compare benchmark results against a stored baseline", long_about = None)]
#[command(version)]
struct Args {
    /// Baseline JSON file (legacy map or wrapped with environment metadata)
    #[arg(long)]
    baseline: PathBuf,

    /// Allowed slowdown in percent before a benchmark counts as regressed
    #[arg(long, default_value = "5.0")]
    threshold: f64,

    /// Write the current results as a new baseline file
    #[arg(long, default_value = "false")]
    update_baseline: bool,

    /// Compare even if the baseline was captured on a different OS or CPU
    #[arg(long, default_value = "false")]
    allow_env_mismatch: bool,

    /// Runner family label, used to name the written baseline file
    #[arg(long)]
    baseline_family: Option<String>,

    /// Directory searched for benchmark reports
    #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// Directory the updated baseline is written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Toolchain whose `--version` is recorded in the environment metadata
    #[arg(long, default_value = "dotnet")]
    toolchain: String,

    /// Markdown file the summary is appended to
    #[arg(long, env = "GITHUB_STEP_SUMMARY")]
    step_summary: Option<PathBuf>,
}

impl From<Args> for GuardConfig {
    fn from(args: Args) -> Self {
        GuardConfig {
            results_dir: args.results_dir,
            baseline_path: args.baseline,
            threshold: args.threshold,
            update_baseline: args.update_baseline,
            allow_env_mismatch: args.allow_env_mismatch,
            family: args.baseline_family.filter(|f| !f.is_empty()),
            step_summary: args.step_summary.filter(|p| !p.as_os_str().is_empty()),
            output_dir: args.output_dir,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(outcome) => {
            report(&outcome);
            process::exit(outcome.exit_code());
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run() -> Result<Outcome> {
    let args = Args::parse();
    let toolchain = args.toolchain.clone();
    let config = GuardConfig::from(args);
    let family = config.family.clone();

    let mut stdout = io::stdout().lock();
    guard::run(
        &config,
        || EnvironmentFingerprint::capture(&toolchain, family.as_deref()),
        &mut stdout,
    )
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Passed => eprintln!("{}", "✓ Benchmarks within threshold".green()),
        Outcome::NothingToCompare => {}
        _ => {
            if let Some(explanation) = outcome.explanation() {
                eprintln!("\n{}", explanation.red());
            }
        }
    }
}
