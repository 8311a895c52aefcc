// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
  name = "sweep",
  version,
  about = "Expands benchmark specs into variants, runs them and scores their output"
)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Run the selected benchmarks and write the results table.
  Run(RunArgs),

  /// Print the variants and commands a run would execute, without running them.
  List(RunArgs),
}

/// Arguments shared by `run` and `list`.
///
/// Every field is optional here; unset values fall through to `sweep.toml`,
/// `SWEEP_*` environment variables and built-in defaults (see `config`).
#[derive(Debug, Clone, Default, Args, Serialize)]
pub struct RunArgs {
  /// Spec files or glob patterns (e.g. 'apps/**/benchmarks.yml').
  #[arg(long = "spec", num_args = 1..)]
  #[serde(rename = "specs", skip_serializing_if = "Vec::is_empty")]
  pub specs: Vec<String>,

  /// Only run these benchmarks. Runs everything found when omitted.
  #[arg(long = "benchmark", num_args = 1..)]
  #[serde(rename = "benchmarks", skip_serializing_if = "Vec::is_empty")]
  pub benchmarks: Vec<String>,

  /// Results table (CSV). A JSON twin is written next to it.
  #[arg(long)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output: Option<PathBuf>,

  /// Directory for per-variant stdout.log/stderr.log files.
  #[arg(long)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub log_dir: Option<PathBuf>,

  /// Maximum seconds for any single variant (0 disables the limit).
  #[arg(long)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout: Option<f64>,

  /// Number of variants run concurrently.
  #[arg(long, short = 'j')]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub jobs: Option<usize>,

  /// Directory variants run in unless their spec sets a `location`.
  #[arg(long)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub working_dir: Option<PathBuf>,

  /// Stop starting new variants after the first one that does not pass.
  #[arg(long)]
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub fail_fast: bool,

  /// Include convergence benchmarks (names containing '_conv') when no
  /// --benchmark is given. Named benchmarks always run.
  #[arg(long)]
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub include_convergence: bool,

  /// Settings file to read instead of ./sweep.toml.
  #[arg(long)]
  #[serde(skip)]
  pub config: Option<PathBuf>,
}
