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

//! A complete comparison run: locate, extract, fingerprint, compare, emit.
//!
//! Every stage takes the previous stage's values and returns its own, so the
//! run carries no shared state. The caller turns the returned [`Outcome`]
//! into a process exit status.

use crate::BenchmarkSet;
use crate::baseline::{Baseline, baseline_output_path};
use crate::compare::{Comparison, ComparisonReport, DEFAULT_THRESHOLD, environment_drift};
use crate::extract::extract_benchmarks;
use crate::fingerprint::EnvironmentFingerprint;
use crate::locate::{DEFAULT_RESULTS_DIR, locate_reports};
use crate::report;
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;

/// Settings of one comparison run.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardConfig {
    pub results_dir: PathBuf,
    pub baseline_path: PathBuf,
    pub threshold: f64,
    pub update_baseline: bool,
    pub allow_env_mismatch: bool,
    pub family: Option<String>,
    /// Append-only Markdown sink, usually `$GITHUB_STEP_SUMMARY`.
    pub step_summary: Option<PathBuf>,
    /// Where an updated baseline is written.
    pub output_dir: PathBuf,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            baseline_path: PathBuf::from("baseline.json"),
            threshold: DEFAULT_THRESHOLD,
            update_baseline: false,
            allow_env_mismatch: false,
            family: None,
            step_summary: None,
            output_dir: PathBuf::from("."),
        }
    }
}

/// How a comparison run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The results directory does not exist.
    NothingToCompare,
    /// Reports were searched but none yielded a benchmark.
    NoBenchmarkData { root: PathBuf },
    Passed,
    Regressed {
        regressions: Vec<Comparison>,
        threshold: f64,
    },
    EnvironmentMismatch { reasons: Vec<String> },
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::NothingToCompare | Outcome::Passed => 0,
            Outcome::NoBenchmarkData { .. } => 1,
            Outcome::Regressed { .. } => 2,
            Outcome::EnvironmentMismatch { .. } => 3,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }

    /// Diagnostic for the error stream on failing outcomes.
    pub fn explanation(&self) -> Option<String> {
        match self {
            Outcome::NothingToCompare | Outcome::Passed => None,
            Outcome::NoBenchmarkData { root } => Some(format!(
                "No benchmarks with Median or Mean found in report. Searched JSON and CSV under {}",
                root.display()
            )),
            Outcome::Regressed {
                regressions,
                threshold,
            } => Some(format!(
                "Failing due to {} regression(s) exceeding threshold of {}%. \
                 If the slowdown is expected, run with --update-baseline and commit the new baseline.",
                regressions.len(),
                threshold
            )),
            Outcome::EnvironmentMismatch { reasons } => Some(format!(
                "Baseline was captured on a different environment:\n  - {}\n\
                 Use a baseline for this runner (--baseline-family) or pass --allow-env-mismatch.",
                reasons.join("\n  - ")
            )),
        }
    }
}

/// Execute a comparison run, writing the console summary to `out`.
///
/// `fingerprint` is only invoked once benchmark data has been found.
pub fn run<W, F>(config: &GuardConfig, fingerprint: F, out: &mut W) -> Result<Outcome>
where
    W: Write,
    F: FnOnce() -> EnvironmentFingerprint,
{
    let Some(benchmarks) = collect(config, out)? else {
        return Ok(Outcome::NothingToCompare);
    };
    if benchmarks.is_empty() {
        return Ok(Outcome::NoBenchmarkData {
            root: config.results_dir.clone(),
        });
    }

    let current_env = fingerprint();
    let baseline = load_baseline(config, out)?;
    let comparison = ComparisonReport::new(&benchmarks, baseline.as_ref(), config.threshold);
    let baseline_env = baseline.as_ref().and_then(|b| b.meta.as_ref());

    emit(config, &comparison, &current_env, baseline_env, out)?;

    if config.update_baseline {
        let path = baseline_output_path(&config.output_dir, config.family.as_deref());
        Baseline::new(benchmarks, current_env.clone()).save(&path)?;
        writeln!(
            out,
            "\nWrote current baseline to {} (upload as artifact to capture).",
            path.display()
        )?;
    }

    let reasons = environment_drift(&current_env, baseline.as_ref(), config.allow_env_mismatch);
    if !reasons.is_empty() {
        return Ok(Outcome::EnvironmentMismatch { reasons });
    }

    let regressions: Vec<Comparison> = comparison.regressions().into_iter().cloned().collect();
    if !regressions.is_empty() {
        out.write_all(report::render_regressions(&comparison).as_bytes())?;
        return Ok(Outcome::Regressed {
            regressions,
            threshold: config.threshold,
        });
    }

    writeln!(out, "\nNo regressions exceeding threshold. OK.")?;
    Ok(Outcome::Passed)
}

/// `None` when the results directory is missing.
fn collect<W: Write>(config: &GuardConfig, out: &mut W) -> Result<Option<BenchmarkSet>> {
    match locate_reports(&config.results_dir) {
        Some(reports) => Ok(Some(extract_benchmarks(&reports))),
        None => {
            writeln!(
                out,
                "No BenchmarkDotNet results directory found at {}; nothing to compare.",
                config.results_dir.display()
            )?;
            Ok(None)
        }
    }
}

fn load_baseline<W: Write>(config: &GuardConfig, out: &mut W) -> Result<Option<Baseline>> {
    if !config.baseline_path.exists() {
        writeln!(
            out,
            "Baseline file not present; skipping comparisons and reporting current medians as suggestion."
        )?;
        return Ok(None);
    }
    Ok(Baseline::load(&config.baseline_path))
}

fn emit<W: Write>(
    config: &GuardConfig,
    comparison: &ComparisonReport,
    current_env: &EnvironmentFingerprint,
    baseline_env: Option<&EnvironmentFingerprint>,
    out: &mut W,
) -> Result<()> {
    out.write_all(report::render_console(comparison, current_env, baseline_env).as_bytes())?;

    if let Some(path) = &config.step_summary {
        let markdown = report::render_markdown(comparison, current_env, baseline_env);
        if let Err(e) = report::append_step_summary(path, &markdown) {
            log::warn!("{:#}", e);
        }
    }
    Ok(())
}
