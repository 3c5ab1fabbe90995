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

use assert_cmd::Command;
use benchguard::Baseline;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const RESULTS: &str = "BenchmarkDotNet.Artifacts/results";

fn bench_compare(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_bench-compare"));
    cmd.current_dir(dir)
        .env_remove("GITHUB_STEP_SUMMARY")
        .env("GITHUB_SHA", "cafebabe")
        .env("RUST_LOG", "warn")
        .args(["--toolchain", "definitely-not-a-real-toolchain-binary"]);
    cmd
}

fn workspace_with_csv(body: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join(RESULTS).join("Guards");
    fs::create_dir_all(&results).unwrap();
    fs::write(results.join("Guards.Validation-report.csv"), body).unwrap();
    dir
}

#[test]
fn missing_results_directory_is_nothing_to_compare() {
    let dir = tempfile::tempdir().unwrap();
    bench_compare(dir.path())
        .args(["--baseline", "baseline.json", "--update-baseline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to compare"));

    assert!(
        !dir.path()
            .join("guard_validation_current_baseline.json")
            .exists()
    );
}

#[test]
fn empty_results_directory_fails_with_code_one() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join(RESULTS)).unwrap();
    fs::write(dir.path().join(RESULTS).join("Guards-report.json"), "{}").unwrap();

    bench_compare(dir.path())
        .args(["--baseline", "baseline.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Searched JSON and CSV"));
}

#[test]
fn first_run_reports_no_baseline() {
    let dir = workspace_with_csv("Method,Mean,Error\nFoo,9.413 us,0.01 us\n");
    bench_compare(dir.path())
        .args(["--baseline", "baseline.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Foo: median=9413.000ns, baseline=none"))
        .stdout(predicate::str::contains("current:  os="));
}

#[test]
fn regression_beyond_threshold_exits_two() {
    let dir = workspace_with_csv("Method,Mean\nFoo,9.413 us\n");
    fs::write(dir.path().join("baseline.json"), r#"{"Foo": 8000.0}"#).unwrap();

    bench_compare(dir.path())
        .args(["--baseline", "baseline.json", "--threshold", "5.0"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("delta=17.66%"))
        .stdout(predicate::str::contains("Foo increased by 17.66%"))
        .stderr(predicate::str::contains("--update-baseline"));
}

#[test]
fn generous_threshold_passes() {
    let dir = workspace_with_csv("Method,Mean\nFoo,9.413 us\n");
    fs::write(dir.path().join("baseline.json"), r#"{"Foo": 8000.0}"#).unwrap();

    bench_compare(dir.path())
        .args(["--baseline", "baseline.json", "--threshold", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No regressions exceeding threshold"));
}

#[test]
fn foreign_environment_exits_three_unless_allowed() {
    let dir = workspace_with_csv("Method,Mean\nFoo,9.413 us\n");
    fs::write(
        dir.path().join("baseline.json"),
        r#"{
            "benchmarks": { "Foo": 9413.0 },
            "meta": { "os": "Plan 9 4th edition", "cpu": "", "dotnet_version": "", "commit": "" }
        }"#,
    )
    .unwrap();

    bench_compare(dir.path())
        .args(["--baseline", "baseline.json"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("baseline: os=Plan 9 4th edition"))
        .stderr(predicate::str::contains("--allow-env-mismatch"));

    bench_compare(dir.path())
        .args(["--baseline", "baseline.json", "--allow-env-mismatch"])
        .assert()
        .success();
}

#[test]
fn update_baseline_writes_family_file() {
    let dir = workspace_with_csv("Method,Mean\nFoo,9.413 us\nBar,1.5 ms\n");

    bench_compare(dir.path())
        .args([
            "--baseline",
            "baseline.json",
            "--update-baseline",
            "--baseline-family",
            "x64",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "guard_validation_current_baseline.x64.json",
        ));

    let written =
        Baseline::read(&dir.path().join("guard_validation_current_baseline.x64.json")).unwrap();
    assert_eq!(written.benchmarks["Foo"], 9413.0);
    assert_eq!(written.benchmarks["Bar"], 1_500_000.0);
    let meta = written.meta.unwrap();
    assert_eq!(meta.commit, "cafebabe");
    assert_eq!(meta.family.as_deref(), Some("x64"));
    assert_eq!(meta.toolchain_version, "");

    // The written file is a valid baseline for the next run on the same machine.
    fs::rename(
        dir.path().join("guard_validation_current_baseline.x64.json"),
        dir.path().join("baseline.json"),
    )
    .unwrap();
    bench_compare(dir.path())
        .args(["--baseline", "baseline.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("delta=0.00%"));
}

#[test]
fn step_summary_is_appended() {
    let dir = workspace_with_csv("Method,Mean\nFoo,9.413 us\n");
    let summary = dir.path().join("summary.md");
    fs::write(&summary, "previous step\n").unwrap();

    bench_compare(dir.path())
        .env("GITHUB_STEP_SUMMARY", &summary)
        .args(["--baseline", "baseline.json"])
        .assert()
        .success();

    let content = fs::read_to_string(&summary).unwrap();
    assert!(content.starts_with("previous step\n"));
    assert!(content.contains("### Guard validation benchmark summary"));
    assert!(content.contains("- Foo: median=9413.000ns, baseline=none"));
}

#[test]
fn baseline_flag_is_required() {
    let dir = tempfile::tempdir().unwrap();
    bench_compare(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--baseline"));
}
