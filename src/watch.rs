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

//! Polling a GitHub Actions workflow until its latest run completes.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Fields requested from `gh run list --json`.
pub const RUN_FIELDS: &str = "databaseId,status,conclusion,headBranch,headSha";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub workflow: String,
    pub repo: String,
    /// Printed for context; runs are not filtered by it.
    pub git_ref: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub log_dir: PathBuf,
}

impl WatchConfig {
    pub fn new(workflow: &str, repo: &str) -> Self {
        Self {
            workflow: workflow.to_string(),
            repo: repo.to_string(),
            git_ref: "master".to_string(),
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(3600),
            log_dir: PathBuf::from("."),
        }
    }
}

/// One entry of `gh run list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub database_id: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub head_sha: Option<String>,
}

impl RunRecord {
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some("completed")
    }

    /// `success`, or no conclusion recorded at all.
    pub fn succeeded(&self) -> bool {
        match self.conclusion.as_deref() {
            None | Some("") | Some("success") => true,
            Some(_) => false,
        }
    }
}

impl fmt::Display for RunRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self
            .database_id
            .map_or_else(|| "?".to_string(), |id| id.to_string());
        write!(
            f,
            "Run {}: status={} conclusion={} branch={} sha={}",
            id,
            self.status.as_deref().unwrap_or("-"),
            self.conclusion.as_deref().filter(|c| !c.is_empty()).unwrap_or("-"),
            self.head_branch.as_deref().unwrap_or("-"),
            self.head_sha.as_deref().unwrap_or("-"),
        )
    }
}

/// Parse the JSON printed by `gh run list --json`, keeping the newest run.
pub fn parse_run_list(json: &str) -> Result<Option<RunRecord>> {
    let runs: Vec<RunRecord> = serde_json::from_str(json).context("Invalid run list JSON")?;
    Ok(runs.into_iter().next())
}

/// Where workflow run information comes from.
pub trait RunSource {
    /// Most recent run of the configured workflow, if any.
    fn latest_run(&mut self, config: &WatchConfig) -> Result<Option<RunRecord>>;

    /// Full log text of a run.
    fn run_log(&mut self, config: &WatchConfig, run_id: u64) -> Result<String>;
}

/// [`RunSource`] backed by the GitHub CLI.
pub struct GhCli {
    program: String,
}

impl GhCli {
    pub fn new() -> Self {
        Self::with_program("gh")
    }

    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn output(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run {}", self.program))?;
        if !output.status.success() {
            bail!(
                "{} {} exited with {}: {}",
                self.program,
                args.first().copied().unwrap_or_default(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSource for GhCli {
    fn latest_run(&mut self, config: &WatchConfig) -> Result<Option<RunRecord>> {
        let stdout = self.output(&[
            "run",
            "list",
            "--repo",
            &config.repo,
            "--workflow",
            &config.workflow,
            "--limit",
            "1",
            "--json",
            RUN_FIELDS,
        ])?;
        parse_run_list(&stdout)
    }

    fn run_log(&mut self, config: &WatchConfig, run_id: u64) -> Result<String> {
        self.output(&["run", "view", &run_id.to_string(), "--repo", &config.repo, "--log"])
    }
}

/// Time source for the polling loop.
pub trait Clock {
    fn elapsed(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);
}

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Completed with `success` or without a conclusion.
    Completed { run: RunRecord, log: Option<PathBuf> },
    /// Completed with any other conclusion.
    Failed { run: RunRecord, log: Option<PathBuf> },
    TimedOut { last_seen: Option<RunRecord> },
}

impl WatchOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            WatchOutcome::Completed { .. } => 0,
            WatchOutcome::Failed { .. } => 2,
            WatchOutcome::TimedOut { .. } => 3,
        }
    }
}

pub fn log_file_name(run_id: u64) -> String {
    format!("BenchmarkRun-{run_id}.log")
}

/// Poll `source` until the latest run completes or `config.timeout` elapses.
///
/// Listing failures are logged and retried on the next poll. The timeout is
/// checked after every poll, before sleeping.
pub fn watch<S, C>(source: &mut S, clock: &mut C, config: &WatchConfig) -> WatchOutcome
where
    S: RunSource,
    C: Clock,
{
    let mut last_seen = None;
    loop {
        match source.latest_run(config) {
            Ok(None) => {
                log::info!("No workflow runs found yet.");
                last_seen = None;
            }
            Ok(Some(run)) => {
                log::info!("{}", run);
                if run.is_completed() {
                    log::info!("Workflow run completed; fetching logs...");
                    let log = save_run_log(source, config, &run);
                    return if run.succeeded() {
                        WatchOutcome::Completed { run, log }
                    } else {
                        WatchOutcome::Failed { run, log }
                    };
                }
                last_seen = Some(run);
            }
            Err(e) => log::warn!("gh run list failed: {:#}", e),
        }

        if clock.elapsed() > config.timeout {
            return WatchOutcome::TimedOut { last_seen };
        }
        clock.sleep(config.interval);
    }
}

/// Fetch and store the run's log. Failures are logged, never fatal.
fn save_run_log<S: RunSource>(
    source: &mut S,
    config: &WatchConfig,
    run: &RunRecord,
) -> Option<PathBuf> {
    let Some(run_id) = run.database_id else {
        log::warn!("Completed run has no id; cannot fetch logs");
        return None;
    };
    let result = source
        .run_log(config, run_id)
        .and_then(|text| write_log(&config.log_dir, run_id, &text));
    match result {
        Ok(path) => {
            log::info!("Logs written to {}", path.display());
            Some(path)
        }
        Err(e) => {
            log::error!("Failed to fetch logs: {:#}", e);
            None
        }
    }
}

fn write_log(dir: &Path, run_id: u64, text: &str) -> Result<PathBuf> {
    let path = dir.join(log_file_name(run_id));
    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::VecDeque;

    struct Scripted {
        polls: VecDeque<Result<Option<RunRecord>>>,
        log: Result<String, String>,
        list_calls: usize,
    }

    impl Scripted {
        fn new(polls: Vec<Result<Option<RunRecord>>>) -> Self {
            Self {
                polls: polls.into(),
                log: Ok("step 1\nstep 2\n".to_string()),
                list_calls: 0,
            }
        }
    }

    impl RunSource for Scripted {
        fn latest_run(&mut self, _config: &WatchConfig) -> Result<Option<RunRecord>> {
            self.list_calls += 1;
            self.polls.pop_front().unwrap_or(Ok(None))
        }

        fn run_log(&mut self, _config: &WatchConfig, _run_id: u64) -> Result<String> {
            self.log.clone().map_err(|e| anyhow!(e))
        }
    }

    #[derive(Default)]
    struct FakeClock {
        now: Duration,
        sleeps: usize,
    }

    impl Clock for FakeClock {
        fn elapsed(&self) -> Duration {
            self.now
        }

        fn sleep(&mut self, duration: Duration) {
            self.sleeps += 1;
            self.now += duration;
        }
    }

    fn run(status: &str, conclusion: Option<&str>) -> RunRecord {
        RunRecord {
            database_id: Some(42),
            status: Some(status.to_string()),
            conclusion: conclusion.map(str::to_string),
            head_branch: Some("master".to_string()),
            head_sha: Some("abc".to_string()),
        }
    }

    fn config(dir: &Path) -> WatchConfig {
        WatchConfig {
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
            log_dir: dir.to_path_buf(),
            ..WatchConfig::new("bench.yml", "owner/repo")
        }
    }

    #[test]
    fn parses_gh_output() {
        let json = r#"[{"conclusion":"","databaseId":123,"headBranch":"master","headSha":"deadbeef","status":"in_progress"}]"#;
        let run = parse_run_list(json).unwrap().unwrap();
        assert_eq!(run.database_id, Some(123));
        assert!(!run.is_completed());
        assert_eq!(
            run.to_string(),
            "Run 123: status=in_progress conclusion=- branch=master sha=deadbeef"
        );
        assert_eq!(parse_run_list("[]").unwrap(), None);
        assert!(parse_run_list("gh: not logged in").is_err());
    }

    #[test]
    fn conclusion_decides_success() {
        assert!(run("completed", Some("success")).succeeded());
        assert!(run("completed", None).succeeded());
        assert!(run("completed", Some("")).succeeded());
        assert!(!run("completed", Some("failure")).succeeded());
        assert!(!run("completed", Some("cancelled")).succeeded());
    }

    #[test]
    fn completes_after_polling_and_writes_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Scripted::new(vec![
            Ok(None),
            Err(anyhow!("network down")),
            Ok(Some(run("in_progress", None))),
            Ok(Some(run("completed", Some("success")))),
        ]);
        let mut clock = FakeClock::default();

        let outcome = watch(&mut source, &mut clock, &config(dir.path()));
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(clock.sleeps, 3);

        let path = dir.path().join("BenchmarkRun-42.log");
        assert_eq!(
            outcome,
            WatchOutcome::Completed {
                run: run("completed", Some("success")),
                log: Some(path.clone())
            }
        );
        assert_eq!(fs::read_to_string(path).unwrap(), "step 1\nstep 2\n");
    }

    #[test]
    fn failed_run_exits_two_even_without_logs() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Scripted::new(vec![Ok(Some(run("completed", Some("failure"))))]);
        source.log = Err("log unavailable".to_string());
        let mut clock = FakeClock::default();

        let outcome = watch(&mut source, &mut clock, &config(dir.path()));
        assert_eq!(outcome.exit_code(), 2);
        assert!(matches!(outcome, WatchOutcome::Failed { log: None, .. }));
        assert!(!dir.path().join("BenchmarkRun-42.log").exists());
    }

    #[test]
    fn times_out_with_last_seen_run() {
        let dir = tempfile::tempdir().unwrap();
        let polls = (0..10).map(|_| Ok(Some(run("queued", None)))).collect();
        let mut source = Scripted::new(polls);
        let mut clock = FakeClock::default();

        let outcome = watch(&mut source, &mut clock, &config(dir.path()));
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(
            outcome,
            WatchOutcome::TimedOut {
                last_seen: Some(run("queued", None))
            }
        );
        // Polls at 0, 15, 30, 45 and 60s are within the timeout; 75s is not.
        assert_eq!(source.list_calls, 6);
    }
}
