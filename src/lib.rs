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

//! # benchguard
//!
//! Helpers for gating CI runs on benchmark performance:
//!
//! - [`locate`] finds BenchmarkDotNet-style result files under an artifact root
//! - [`extract`] turns one or more of those files into a [`BenchmarkSet`]
//! - [`fingerprint`] captures the environment a run happened on
//! - [`baseline`] loads and persists the reference measurements
//! - [`compare`] computes per-benchmark deltas and environment drift
//! - [`report`] renders console and Markdown summaries
//! - [`guard`] wires all of the above into a single comparison run
//!
//! The peripheral helpers live in [`watch`] (poll a workflow run until it
//! completes) and [`pr_body`] (describe a proposed baseline update).

pub mod baseline;
pub mod compare;
pub mod extract;
pub mod fingerprint;
pub mod guard;
pub mod locate;
pub mod pr_body;
pub mod report;
pub mod watch;

use std::collections::BTreeMap;

/// Benchmark name to central-tendency duration in nanoseconds.
///
/// Ordered by name so every rendering of a set is deterministic.
pub type BenchmarkSet = BTreeMap<String, f64>;

pub use crate::baseline::Baseline;
pub use crate::compare::{Comparison, ComparisonReport};
pub use crate::fingerprint::EnvironmentFingerprint;
pub use crate::guard::{GuardConfig, Outcome};
pub use crate::locate::{BenchmarkReport, ReportFormat};
