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

//! # Baseline Update PR Body
//!
//! Writes the Markdown description of a pull request that proposes a new
//! benchmark baseline for one runner family.
//!
//! Usage:
//!   pr-body <family> <baseline-json> <out-md>

use anyhow::{Context, Result};
use benchguard::Baseline;
use benchguard::pr_body::render_pr_body;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "pr-body")]
#[command(about = "Generate a pull request body for a baseline update", long_about = None)]
#[command(version)]
struct Args {
    /// Runner family the baseline belongs to
    family: String,

    /// Baseline JSON file (either shape)
    baseline: PathBuf,

    /// Markdown file to write
    output: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let baseline = match Baseline::read(&args.baseline) {
        Ok(baseline) => baseline,
        Err(e) => {
            log::warn!("Could not read {}: {:#}", args.baseline.display(), e);
            Baseline::default()
        }
    };

    let body = render_pr_body(&args.family, &baseline);
    fs::write(&args.output, body)
        .with_context(|| format!("Failed to write PR body: {}", args.output.display()))?;

    println!("Wrote PR body to {}", args.output.display());
    Ok(())
}
