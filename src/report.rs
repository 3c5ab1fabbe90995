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

//! Human-readable renderings of a comparison run.

use crate::compare::{Comparison, ComparisonReport};
use crate::fingerprint::EnvironmentFingerprint;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Heading of the Markdown block appended to the step summary.
pub const STEP_SUMMARY_HEADING: &str = "### Guard validation benchmark summary";

pub fn summary_line(comparison: &Comparison) -> String {
    match (comparison.baseline, comparison.delta_percent) {
        (Some(baseline), Some(delta)) => format!(
            "{}: median={:.3}ns, baseline={:.3}ns, delta={:.2}%",
            comparison.name, comparison.current, baseline, delta
        ),
        _ => format!(
            "{}: median={:.3}ns, baseline=none",
            comparison.name, comparison.current
        ),
    }
}

/// Sectioned plain-text summary for the console.
pub fn render_console(
    report: &ComparisonReport,
    current: &EnvironmentFingerprint,
    baseline: Option<&EnvironmentFingerprint>,
) -> String {
    let mut out = String::from("\nBenchmark summary:\n");
    for comparison in &report.entries {
        let _ = writeln!(out, "  {}", summary_line(comparison));
    }

    out.push_str("\nEnvironment:\n");
    let _ = writeln!(out, "  current:  {current}");
    if let Some(baseline) = baseline {
        let _ = writeln!(out, "  baseline: {baseline}");
    }
    out
}

/// The regression list, or an empty string when there is none.
pub fn render_regressions(report: &ComparisonReport) -> String {
    let regressions = report.regressions();
    if regressions.is_empty() {
        return String::new();
    }
    let mut out = String::from("\nPerformance regressions detected:\n");
    for c in regressions {
        if let (Some(baseline), Some(delta)) = (c.baseline, c.delta_percent) {
            let _ = writeln!(
                out,
                " - {} increased by {:.2}% (from {:.3} to {:.3} ns)",
                c.name, delta, baseline, c.current
            );
        }
    }
    out
}

/// Markdown equivalent of [`render_console`] for CI step summaries.
pub fn render_markdown(
    report: &ComparisonReport,
    current: &EnvironmentFingerprint,
    baseline: Option<&EnvironmentFingerprint>,
) -> String {
    let mut md = format!("\n{STEP_SUMMARY_HEADING}\n");
    for comparison in &report.entries {
        let marker = if comparison.is_regression(report.threshold) {
            " :warning:"
        } else {
            ""
        };
        let _ = writeln!(md, "- {}{}", summary_line(comparison), marker);
    }

    md.push_str("\n#### Environment\n");
    let _ = writeln!(md, "- **current**: {current}");
    if let Some(baseline) = baseline {
        let _ = writeln!(md, "- **baseline**: {baseline}");
    }
    md
}

/// Append `markdown` to the step summary file at `path`.
pub fn append_step_summary(path: &Path, markdown: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open step summary: {}", path.display()))?;
    file.write_all(markdown.as_bytes())
        .with_context(|| format!("Failed to append step summary: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BenchmarkSet;
    use crate::baseline::Baseline;

    fn report() -> ComparisonReport {
        let current: BenchmarkSet = [("Foo".to_string(), 9413.0), ("New".to_string(), 1.5)]
            .into_iter()
            .collect();
        let baseline = Baseline {
            benchmarks: [("Foo".to_string(), 8000.0)].into_iter().collect(),
            meta: None,
        };
        ComparisonReport::new(&current, Some(&baseline), 5.0)
    }

    fn env(os: &str) -> EnvironmentFingerprint {
        EnvironmentFingerprint {
            os: os.into(),
            cpu: "Intel(R) Xeon".into(),
            ..Default::default()
        }
    }

    #[test]
    fn summary_lines_show_delta_or_none() {
        let report = report();
        assert_eq!(
            summary_line(&report.entries[0]),
            "Foo: median=9413.000ns, baseline=8000.000ns, delta=17.66%"
        );
        assert_eq!(
            summary_line(&report.entries[1]),
            "New: median=1.500ns, baseline=none"
        );
    }

    #[test]
    fn console_prints_baseline_environment_only_when_known() {
        let report = report();
        let without = render_console(&report, &env("Linux"), None);
        assert!(without.contains("current:  os=Linux"));
        assert!(!without.contains("baseline: os="));

        let with = render_console(&report, &env("Linux"), Some(&env("Windows")));
        assert!(with.contains("baseline: os=Windows"));
    }

    #[test]
    fn regressions_are_listed() {
        let text = render_regressions(&report());
        assert!(text.contains(" - Foo increased by 17.66% (from 8000.000 to 9413.000 ns)"));
        assert!(!text.contains("New"));

        let clean = ComparisonReport::new(&BenchmarkSet::new(), None, 5.0);
        assert!(render_regressions(&clean).is_empty());
    }

    #[test]
    fn markdown_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");
        std::fs::write(&path, "# Earlier step\n").unwrap();

        let md = render_markdown(&report(), &env("Linux"), None);
        append_step_summary(&path, &md).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Earlier step\n"));
        assert!(content.contains(STEP_SUMMARY_HEADING));
        assert!(content.contains("- Foo: median=9413.000ns, baseline=8000.000ns, delta=17.66% :warning:"));
        assert!(content.contains("- New: median=1.500ns, baseline=none\n"));
        assert!(content.contains("- **current**: os=Linux"));
    }
}
