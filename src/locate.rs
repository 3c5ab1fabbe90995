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

//! Discovery of benchmark result files below an artifact directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Relative directory BenchmarkDotNet writes its exported reports to.
pub const DEFAULT_RESULTS_DIR: &str = "BenchmarkDotNet.Artifacts/results";

/// Kind of report file, in descending order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReportFormat {
    /// `*report.json`, the full JSON exporter output.
    CanonicalJson,
    /// Any other `*.json` file.
    GenericJson,
    /// `*report.csv`, the CSV exporter output.
    Csv,
}

impl ReportFormat {
    /// Classify a file by name. Returns `None` for files that are not reports.
    pub fn classify(file_name: &str) -> Option<Self> {
        if file_name.ends_with("report.json") {
            Some(Self::CanonicalJson)
        } else if file_name.ends_with(".json") {
            Some(Self::GenericJson)
        } else if file_name.ends_with("report.csv") {
            Some(Self::Csv)
        } else {
            None
        }
    }

    pub fn is_json(self) -> bool {
        matches!(self, Self::CanonicalJson | Self::GenericJson)
    }
}

/// A located report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkReport {
    pub path: PathBuf,
    pub format: ReportFormat,
}

/// Recursively collect report files under `root`, canonical JSON first,
/// then generic JSON, then CSV. Paths within a class are sorted.
///
/// Returns `None` when `root` does not exist: benchmarks simply did not run.
/// Unreadable directory entries are skipped.
pub fn locate_reports(root: &Path) -> Option<Vec<BenchmarkReport>> {
    if !root.is_dir() {
        return None;
    }

    let mut reports: Vec<BenchmarkReport> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let format = ReportFormat::classify(&entry.file_name().to_string_lossy())?;
            Some(BenchmarkReport {
                path: entry.into_path(),
                format,
            })
        })
        .collect();

    reports.sort_by(|a, b| a.format.cmp(&b.format).then_with(|| a.path.cmp(&b.path)));
    log::debug!("Located {} report file(s) under {}", reports.len(), root.display());
    Some(reports)
}
