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

//! Parsing of located reports into a flat [`BenchmarkSet`].
//!
//! JSON reports are tried one file at a time in priority order and the first
//! file that yields anything wins. Only when no JSON file produced data are
//! the CSV reports read, and all of them are merged. Formats are never mixed.

use crate::BenchmarkSet;
use crate::locate::{BenchmarkReport, ReportFormat};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Name used when an entry carries no method/benchmark name.
const UNKNOWN_NAME: &str = "Unknown";

/// CSV columns that describe benchmark parameters rather than measurements.
const PARAMETER_COLUMNS: &[&str] = &["GroupCount", "Group", "OverloadsPerGroup", "UsePooling"];

/// Extract benchmarks from the located reports.
///
/// An empty result means no report yielded usable data in any format.
pub fn extract_benchmarks(reports: &[BenchmarkReport]) -> BenchmarkSet {
    for report in reports.iter().filter(|r| r.format.is_json()) {
        match read_json_report(&report.path) {
            Ok(set) if !set.is_empty() => {
                log::info!(
                    "Extracted {} benchmark(s) from {}",
                    set.len(),
                    report.path.display()
                );
                return set;
            }
            Ok(_) => log::debug!("No benchmarks in {}", report.path.display()),
            Err(e) => log::warn!("Skipping {}: {:#}", report.path.display(), e),
        }
    }

    let mut benchmarks = BenchmarkSet::new();
    for report in reports.iter().filter(|r| r.format == ReportFormat::Csv) {
        match read_csv_report(&report.path) {
            Ok(set) => {
                log::info!(
                    "Extracted {} benchmark(s) from {}",
                    set.len(),
                    report.path.display()
                );
                benchmarks.extend(set);
            }
            Err(e) => log::warn!("Skipping {}: {:#}", report.path.display(), e),
        }
    }
    benchmarks
}

fn read_json_report(path: &Path) -> Result<BenchmarkSet> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read report: {}", path.display()))?;
    let data: Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in report: {}", path.display()))?;
    Ok(parse_json_report(&data))
}

fn read_csv_report(path: &Path) -> Result<BenchmarkSet> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open report: {}", path.display()))?;
    parse_csv_report(file).with_context(|| format!("Invalid CSV in report: {}", path.display()))
}

/// Extract benchmarks from a parsed JSON report.
///
/// Understands the exporter layout (`Benchmarks` array), the older `Runs`
/// array, and as a last resort any top-level object holding a `Statistics`
/// block, named after its key.
pub fn parse_json_report(data: &Value) -> BenchmarkSet {
    let Some(root) = data.as_object() else {
        return BenchmarkSet::new();
    };

    if let Some(entries) = root.get("Benchmarks").and_then(Value::as_array) {
        entries
            .iter()
            .filter_map(|entry| Some((entry_name(entry), benchmark_median(entry)?)))
            .collect()
    } else if let Some(runs) = root.get("Runs").and_then(Value::as_array) {
        runs.iter()
            .filter_map(|run| {
                let median = run.get("Statistics").and_then(statistics_median)?;
                Some((entry_name(run), median))
            })
            .collect()
    } else {
        root.iter()
            .filter_map(|(name, value)| {
                let median = value.get("Statistics").and_then(statistics_median)?;
                Some((name.clone(), median))
            })
            .collect()
    }
}

/// `Method`, followed by its parameters in the bracketed form the CSV path
/// uses so parameterized cases of one method stay distinct.
fn entry_name(entry: &Value) -> String {
    let method = entry
        .get("Method")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_NAME);
    let parameters = entry.get("Parameters").map(entry_parameters).unwrap_or_default();
    if parameters.is_empty() {
        method.to_string()
    } else {
        format!("{} [{}]", method, parameters.join(", "))
    }
}

/// The exporter writes parameters as `A=1&B=2`; an object form is accepted too.
fn entry_parameters(parameters: &Value) -> Vec<String> {
    match parameters {
        Value::String(s) => s
            .split('&')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| match value {
                Value::String(v) => format!("{key}={v}"),
                other => format!("{key}={other}"),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn benchmark_median(entry: &Value) -> Option<f64> {
    let stats = ["Statistics", "Stats"]
        .iter()
        .filter_map(|key| entry.get(*key))
        .find(|stats| stats.as_object().is_some_and(|s| !s.is_empty()));

    stats.and_then(statistics_median).or_else(|| {
        entry
            .get("Summary")
            .and_then(|summary| summary.get("Statistics"))
            .and_then(statistics_median)
    })
}

fn statistics_median(stats: &Value) -> Option<f64> {
    let median = stats.get("Median")?;
    let value = match median {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (value.is_finite() && value >= 0.0).then_some(value)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Method", default)]
    method: Option<String>,
    #[serde(rename = "Benchmark", default)]
    benchmark: Option<String>,
    #[serde(rename = "GroupCount", default)]
    group_count: Option<String>,
    #[serde(rename = "Group", default)]
    group: Option<String>,
    #[serde(rename = "OverloadsPerGroup", default)]
    overloads_per_group: Option<String>,
    #[serde(rename = "UsePooling", default)]
    use_pooling: Option<String>,
    #[serde(rename = "Mean", default)]
    mean: Option<String>,
}

impl CsvRow {
    fn name(&self, parameterized: bool) -> String {
        let method = self
            .method
            .as_deref()
            .or(self.benchmark.as_deref())
            .unwrap_or(UNKNOWN_NAME);
        if !parameterized {
            return method.to_string();
        }
        format!(
            "{} [GroupCount={}, OverloadsPerGroup={}, UsePooling={}]",
            method,
            self.group_count
                .as_deref()
                .or(self.group.as_deref())
                .unwrap_or(""),
            self.overloads_per_group.as_deref().unwrap_or(""),
            self.use_pooling.as_deref().unwrap_or(""),
        )
    }
}

/// Extract benchmarks from a CSV report, reading the `Mean` column.
///
/// Rows whose mean cannot be parsed are skipped.
pub fn parse_csv_report<R: Read>(input: R) -> Result<BenchmarkSet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    let parameterized = reader
        .headers()?
        .iter()
        .any(|h| PARAMETER_COLUMNS.contains(&h.trim()));

    let mut benchmarks = BenchmarkSet::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                log::debug!("Skipping malformed CSV row: {}", e);
                continue;
            }
        };
        let Some(ns) = row.mean.as_deref().and_then(parse_duration_ns) else {
            continue;
        };
        benchmarks.insert(row.name(parameterized), ns);
    }
    Ok(benchmarks)
}

/// Parse a `"<number> <unit>"` duration into nanoseconds.
///
/// The number may use comma thousands separators. A missing unit means
/// nanoseconds, and so does any unit that is not ns, μs/us or ms.
pub fn parse_duration_ns(text: &str) -> Option<f64> {
    let mut parts = text.split_whitespace();
    let value: f64 = parts.next()?.replace(',', "").parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let unit = parts.next().unwrap_or("ns").to_lowercase();
    Some(value * unit_factor(&unit))
}

fn unit_factor(unit: &str) -> f64 {
    if unit.starts_with("ns") {
        1.0
    } else if ["μs", "µs", "us"].iter().any(|u| unit.starts_with(u)) {
        1_000.0
    } else if unit.starts_with("ms") {
        1_000_000.0
    } else {
        1.0
    }
}
