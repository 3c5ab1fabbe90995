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

//! Best-effort capture of the environment a benchmark run executed on.
//!
//! Nothing in here is allowed to fail a run: every probe degrades to an
//! empty or `"unknown"` value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::process::Command;
use sysinfo::System;

/// Value recorded when a field could not be discovered.
pub const UNKNOWN: &str = "unknown";

/// Environment variables consulted, in order, for the source revision.
pub const COMMIT_ENV_VARS: &[&str] = &["GITHUB_SHA", "COMMIT"];

/// Snapshot of the executing environment.
///
/// Serialized as the `meta` block of a baseline file. The toolchain field
/// keeps its historical `dotnet_version` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFingerprint {
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub cpu: String,
    #[serde(rename = "dotnet_version", default)]
    pub toolchain_version: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

impl EnvironmentFingerprint {
    /// Capture the current environment.
    ///
    /// `toolchain` is the command whose `--version` output is recorded.
    pub fn capture(toolchain: &str, family: Option<&str>) -> Self {
        Self {
            os: detect_os(),
            cpu: detect_cpu(),
            toolchain_version: detect_toolchain_version(toolchain),
            commit: detect_commit(|name| std::env::var(name).ok()),
            family: family.map(str::to_string),
        }
    }

    /// True when no field was recorded at all.
    pub fn is_empty(&self) -> bool {
        self.os.is_empty()
            && self.cpu.is_empty()
            && self.toolchain_version.is_empty()
            && self.commit.is_empty()
            && self.family.as_deref().is_none_or(str::is_empty)
    }

    /// `(label, value)` pairs in display order, `family` only when set.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("os", self.os.as_str()),
            ("cpu", self.cpu.as_str()),
            ("dotnet_version", self.toolchain_version.as_str()),
            ("commit", self.commit.as_str()),
        ];
        if let Some(family) = &self.family {
            fields.push(("family", family.as_str()));
        }
        fields
    }
}

impl fmt::Display for EnvironmentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .fields()
            .into_iter()
            .map(|(label, value)| format!("{label}={value}"))
            .collect();
        write!(f, "{}", rendered.join(", "))
    }
}

/// One independently failable way of discovering a value.
pub trait Probe {
    fn name(&self) -> &str;

    fn probe(&self) -> Option<String>;
}

/// Run `probes` in order and return the first non-empty answer.
pub fn first_success(probes: &[Box<dyn Probe>]) -> Option<String> {
    probes.iter().find_map(|probe| {
        let value = probe
            .probe()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        match &value {
            Some(v) => log::debug!("Probe {} answered: {}", probe.name(), v),
            None => log::debug!("Probe {} found nothing", probe.name()),
        }
        value
    })
}

/// Ask sysinfo for the brand of the first CPU.
struct SysinfoCpu;

impl Probe for SysinfoCpu {
    fn name(&self) -> &str {
        "sysinfo"
    }

    fn probe(&self) -> Option<String> {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.cpus().first().map(|c| c.brand().to_string())
    }
}

/// Read the model name from `/proc/cpuinfo`.
struct CpuInfoFile;

impl Probe for CpuInfoFile {
    fn name(&self) -> &str {
        "/proc/cpuinfo"
    }

    fn probe(&self) -> Option<String> {
        if !cfg!(target_os = "linux") {
            return None;
        }
        let content = fs::read_to_string("/proc/cpuinfo").ok()?;
        parse_cpuinfo_model(&content)
    }
}

/// Ask the platform's command-line tooling.
struct CpuCommand;

impl Probe for CpuCommand {
    fn name(&self) -> &str {
        "command"
    }

    fn probe(&self) -> Option<String> {
        if cfg!(target_os = "macos") {
            command_output("sysctl", &["-n", "machdep.cpu.brand_string"])
        } else if cfg!(target_os = "windows") {
            command_output("wmic", &["cpu", "get", "name"]).and_then(|out| parse_wmic_name(&out))
        } else {
            command_output("lscpu", &[]).and_then(|out| parse_lscpu_model(&out))
        }
    }
}

/// CPU probes in the order they are attempted.
pub fn cpu_probes() -> Vec<Box<dyn Probe>> {
    vec![Box::new(SysinfoCpu), Box::new(CpuInfoFile), Box::new(CpuCommand)]
}

pub fn detect_cpu() -> String {
    first_success(&cpu_probes()).unwrap_or_else(|| UNKNOWN.to_string())
}

/// Operating system name with version and kernel when known.
pub fn detect_os() -> String {
    let name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| std::env::consts::OS.to_string());
    match System::kernel_version() {
        Some(kernel) if !name.contains(&kernel) => format!("{name} {kernel}"),
        _ => name,
    }
}

/// `<toolchain> --version`, trimmed, or empty on any failure.
pub fn detect_toolchain_version(toolchain: &str) -> String {
    command_output(toolchain, &["--version"]).unwrap_or_default()
}

/// First non-empty value among [`COMMIT_ENV_VARS`].
pub fn detect_commit<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    COMMIT_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = match Command::new(program).args(args).output() {
        Ok(output) => output,
        Err(e) => {
            log::debug!("Could not run {}: {}", program, e);
            return None;
        }
    };
    if !output.status.success() {
        log::debug!("{} exited with {}", program, output.status);
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn value_after_colon<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim()).filter(|v| !v.is_empty())
    })
}

pub fn parse_cpuinfo_model(content: &str) -> Option<String> {
    value_after_colon(content, "model name").map(str::to_string)
}

pub fn parse_lscpu_model(content: &str) -> Option<String> {
    value_after_colon(content, "Model name").map(str::to_string)
}

pub fn parse_wmic_name(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .nth(1)
        .map(str::to_string)
}
