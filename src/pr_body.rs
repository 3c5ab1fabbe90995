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

//! Markdown description for a pull request proposing a new baseline.

use crate::baseline::Baseline;
use std::fmt::Write as _;

/// Maximum number of benchmark rows shown in the sample table.
pub const SAMPLE_ROWS: usize = 12;

/// Render the PR body for `family`. An empty baseline renders a notice
/// instead of the table.
pub fn render_pr_body(family: &str, baseline: &Baseline) -> String {
    let mut md = format!("# Proposed baseline update for family `{family}`\n\n");
    md.push_str(
        "This PR proposes updating the guard validation baseline for this runner family.\n\n",
    );

    if let Some(meta) = &baseline.meta {
        let fields: Vec<_> = meta
            .fields()
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect();
        if !fields.is_empty() {
            md.push_str("## Environment metadata\n");
            for (label, value) in fields {
                let _ = writeln!(md, "- **{label}**: {value}");
            }
            md.push('\n');
        }
    }

    if baseline.benchmarks.is_empty() {
        md.push_str("No benchmark data present in baseline file.\n");
        return md;
    }

    md.push_str("## Benchmarks (sample)\n");
    md.push_str("| Benchmark | Median (ns) |\n");
    md.push_str("|---|---:|\n");
    for (name, value) in baseline.benchmarks.iter().take(SAMPLE_ROWS) {
        let _ = writeln!(md, "| {name} | {value:.3} |");
    }
    if baseline.benchmarks.len() > SAMPLE_ROWS {
        let _ = writeln!(
            md,
            "\n_{} more benchmark(s) not shown._",
            baseline.benchmarks.len() - SAMPLE_ROWS
        );
    }
    md
}
