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
use crate::cli::RunArgs;
use anyhow::Context;
use anyhow::Result;
use figment::Figment;
use figment::providers::Env;
use figment::providers::Format;
use figment::providers::Serialized;
use figment::providers::Toml;
use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Settings file read from the current directory when `--config` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "sweep.toml";

/// Prefix of environment variables that override settings (`SWEEP_JOBS=4`).
pub const ENV_PREFIX: &str = "SWEEP_";

// --- Default Values ---
fn default_output() -> PathBuf {
  PathBuf::from("benchmark_results.csv")
}

fn default_jobs() -> usize {
  1
}

fn default_kill_grace() -> f64 {
  5.0
}

/// Raw, layered settings before validation.
#[derive(Debug, Serialize, Deserialize)]
struct Settings {
  #[serde(default)]
  specs: Vec<String>,
  #[serde(default)]
  benchmarks: Vec<String>,
  #[serde(default = "default_output")]
  output: PathBuf,
  log_dir: Option<PathBuf>,
  timeout: Option<f64>,
  #[serde(default = "default_jobs")]
  jobs: usize,
  working_dir: Option<PathBuf>,
  #[serde(default)]
  fail_fast: bool,
  #[serde(default)]
  include_convergence: bool,
  /// Seconds between SIGTERM and SIGKILL for a timed-out variant.
  #[serde(default = "default_kill_grace")]
  kill_grace: f64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      specs: Vec::new(),
      benchmarks: Vec::new(),
      output: default_output(),
      log_dir: None,
      timeout: None,
      jobs: default_jobs(),
      working_dir: None,
      fail_fast: false,
      include_convergence: false,
      kill_grace: default_kill_grace(),
    }
  }
}

/// Fully validated and resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
  pub specs: Vec<String>,
  /// Empty means every benchmark found.
  pub benchmarks: Vec<String>,
  pub output: PathBuf,
  pub log_dir: Option<PathBuf>,
  pub timeout: Option<Duration>,
  pub jobs: usize,
  pub working_dir: PathBuf,
  pub fail_fast: bool,
  /// Also run `_conv` benchmarks when no names are selected.
  pub include_convergence: bool,
  pub kill_grace: Duration,
  /// Expand and print only.
  pub dry_run: bool,
}

fn seconds(value: f64, what: &str) -> Result<Duration> {
  Duration::try_from_secs_f64(value)
    .with_context(|| format!("{what} must be a non-negative number of seconds, got {value}"))
}

impl TryFrom<RunArgs> for Config {
  type Error = anyhow::Error;

  fn try_from(args: RunArgs) -> Result<Self, Self::Error> {
    let settings_file = args
      .config
      .clone()
      .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    if args.config.is_some() && !settings_file.is_file() {
      anyhow::bail!("Settings file not found: {}", settings_file.display());
    }

    let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
      .merge(Toml::file(&settings_file))
      .merge(Env::prefixed(ENV_PREFIX).ignore(&["log_file"]))
      .merge(Serialized::defaults(&args))
      .extract()
      .context("Failed to resolve settings")?;

    if settings.specs.is_empty() {
      anyhow::bail!(
        "No spec sources given. Pass --spec or set `specs` in {}",
        settings_file.display()
      );
    }
    if settings.jobs == 0 {
      anyhow::bail!("--jobs must be at least 1");
    }

    let timeout = match settings.timeout {
      Some(secs) if secs == 0.0 => None,
      Some(secs) => Some(seconds(secs, "--timeout")?),
      None => None,
    };
    let kill_grace = seconds(settings.kill_grace, "kill_grace")?;

    let working_dir = match settings.working_dir {
      Some(dir) => dir,
      None => std::env::current_dir().context("Failed to determine the current directory")?,
    };

    Ok(Config {
      specs: settings.specs,
      benchmarks: settings.benchmarks,
      output: settings.output,
      log_dir: settings.log_dir,
      timeout,
      jobs: settings.jobs,
      working_dir,
      fail_fast: settings.fail_fast,
      include_convergence: settings.include_convergence,
      kill_grace,
      dry_run: false,
    })
  }
}
