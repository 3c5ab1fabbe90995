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

//! Persisted reference measurements.
//!
//! Two on-disk shapes exist. Older files are a bare `{ name: ns }` map; current
//! files wrap that map with the environment it was captured on. Both are
//! normalized into [`Baseline`] at load time and only the wrapped shape is
//! ever written.

use crate::BenchmarkSet;
use crate::fingerprint::EnvironmentFingerprint;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name stem of a written baseline.
pub const BASELINE_FILE_STEM: &str = "guard_validation_current_baseline";

/// A baseline file as found on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaselineFile {
    Wrapped {
        benchmarks: BenchmarkSet,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<EnvironmentFingerprint>,
    },
    Legacy(BenchmarkSet),
}

impl From<BaselineFile> for Baseline {
    fn from(file: BaselineFile) -> Self {
        match file {
            BaselineFile::Wrapped { benchmarks, meta } => Baseline {
                benchmarks,
                meta: meta.filter(|m| !m.is_empty()),
            },
            BaselineFile::Legacy(benchmarks) => Baseline {
                benchmarks,
                meta: None,
            },
        }
    }
}

impl From<&Baseline> for BaselineFile {
    fn from(baseline: &Baseline) -> Self {
        BaselineFile::Wrapped {
            benchmarks: baseline.benchmarks.clone(),
            meta: baseline.meta.clone(),
        }
    }
}

/// Reference measurements plus, when recorded, where they were taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    pub benchmarks: BenchmarkSet,
    pub meta: Option<EnvironmentFingerprint>,
}

impl Baseline {
    pub fn new(benchmarks: BenchmarkSet, meta: EnvironmentFingerprint) -> Self {
        Self {
            benchmarks,
            meta: Some(meta),
        }
    }

    /// Reference value for `name`. Zero counts as absent.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.benchmarks.get(name).copied().filter(|v| *v != 0.0)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: BaselineFile =
            serde_json::from_str(content).context("Unrecognized baseline format")?;
        Ok(file.into())
    }

    /// Read and normalize a baseline file of either shape.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read baseline: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid baseline: {}", path.display()))
    }

    /// Load a baseline for comparison.
    ///
    /// A missing file and an unreadable file both yield `None`; the latter
    /// with a warning.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            log::info!("No baseline at {}", path.display());
            return None;
        }
        match Self::read(path) {
            Ok(baseline) => {
                log::info!(
                    "Loaded baseline with {} benchmark(s) from {}",
                    baseline.benchmarks.len(),
                    path.display()
                );
                Some(baseline)
            }
            Err(e) => {
                log::warn!("Could not read baseline: {:#}", e);
                None
            }
        }
    }

    /// Write in the wrapped shape, pretty-printed.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&BaselineFile::from(self))
            .context("Failed to serialize baseline")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write baseline: {}", path.display()))
    }
}

/// Name of the baseline file written for `family`.
pub fn baseline_file_name(family: Option<&str>) -> String {
    match family.filter(|f| !f.is_empty()) {
        Some(family) => format!("{BASELINE_FILE_STEM}.{family}.json"),
        None => format!("{BASELINE_FILE_STEM}.json"),
    }
}

pub fn baseline_output_path(dir: &Path, family: Option<&str>) -> PathBuf {
    dir.join(baseline_file_name(family))
}
