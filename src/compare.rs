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

//! Comparison of current measurements against a baseline.

use crate::BenchmarkSet;
use crate::baseline::Baseline;
use crate::fingerprint::EnvironmentFingerprint;

/// Percentage slowdown tolerated before a benchmark counts as regressed.
pub const DEFAULT_THRESHOLD: f64 = 5.0;

/// One current benchmark measured against its reference value.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub name: String,
    pub current: f64,
    pub baseline: Option<f64>,
    /// Positive means slower than the baseline.
    pub delta_percent: Option<f64>,
}

impl Comparison {
    pub fn new(name: &str, current: f64, baseline: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            current,
            baseline,
            delta_percent: baseline.map(|b| delta_percent(current, b)),
        }
    }

    /// Strictly above `threshold`. Entries without a baseline never regress.
    pub fn is_regression(&self, threshold: f64) -> bool {
        self.delta_percent.is_some_and(|delta| delta > threshold)
    }
}

/// `(current - baseline) / baseline * 100`.
pub fn delta_percent(current: f64, baseline: f64) -> f64 {
    (current - baseline) / baseline * 100.0
}

/// All comparisons of a run, ordered by benchmark name.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub entries: Vec<Comparison>,
    pub threshold: f64,
}

impl ComparisonReport {
    pub fn new(current: &BenchmarkSet, baseline: Option<&Baseline>, threshold: f64) -> Self {
        let entries = current
            .iter()
            .map(|(name, value)| Comparison::new(name, *value, baseline.and_then(|b| b.get(name))))
            .collect();
        Self { entries, threshold }
    }

    pub fn regressions(&self) -> Vec<&Comparison> {
        self.entries
            .iter()
            .filter(|c| c.is_regression(self.threshold))
            .collect()
    }

    pub fn has_regressions(&self) -> bool {
        self.entries.iter().any(|c| c.is_regression(self.threshold))
    }
}

/// Reasons the baseline environment is not comparable with the current one.
///
/// The OS must match exactly. The baseline CPU only has to appear inside the
/// current CPU string, so vendors appending stepping or clock details to the
/// model name still match.
pub fn environment_mismatches(
    current: &EnvironmentFingerprint,
    baseline: &EnvironmentFingerprint,
) -> Vec<String> {
    let mut reasons = Vec::new();
    if baseline.os != current.os {
        reasons.push(format!(
            "OS differs: baseline '{}' vs current '{}'",
            baseline.os, current.os
        ));
    }
    if !baseline.cpu.is_empty() && !current.cpu.contains(&baseline.cpu) {
        reasons.push(format!(
            "CPU differs: baseline '{}' not found in current '{}'",
            baseline.cpu, current.cpu
        ));
    }
    reasons
}

/// Mismatch reasons that should stop the run.
///
/// Empty when mismatches are allowed or the baseline recorded no environment.
pub fn environment_drift(
    current: &EnvironmentFingerprint,
    baseline: Option<&Baseline>,
    allow_mismatch: bool,
) -> Vec<String> {
    if allow_mismatch {
        return Vec::new();
    }
    baseline
        .and_then(|b| b.meta.as_ref())
        .map(|meta| environment_mismatches(current, meta))
        .unwrap_or_default()
}
