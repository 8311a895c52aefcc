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
//! Drives a run: load specs, select, expand, execute, extract, aggregate.
use crate::config::Config;
use crate::error::SpecError;
use crate::error::SweepError;
use crate::executor::ExecRequest;
use crate::executor::execute;
use crate::metrics::MetricValue;
use crate::results::ResultAggregator;
use crate::results::ResultRow;
use crate::results::VariantStatus;
use crate::spec::BenchmarkSpec;
use crate::spec::SpecSet;
use crate::spec::load_specs;
use crate::variant::Variant;
use crate::variant::expand;
use anyhow::Context;
use anyhow::Result;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tracing::Instrument;

/// A selected benchmark that did not run, and why.
#[derive(Debug, Clone)]
pub struct SkippedBenchmark {
  /// `None` for problems with a whole document or source pattern.
  pub name: Option<String>,
  pub reason: String,
}

/// What a run did, for the user-facing report.
#[derive(Debug, Default)]
pub struct RunSummary {
  pub passed: usize,
  pub failed: usize,
  pub timed_out: usize,
  /// Variants never started because of `fail_fast`.
  pub not_started: usize,
  pub skipped: Vec<SkippedBenchmark>,
  /// (benchmark, variant, status), sorted.
  pub outcomes: Vec<(String, String, VariantStatus)>,
  pub results_path: Option<PathBuf>,
  pub json_path: Option<PathBuf>,
}

impl RunSummary {
  pub fn all_passed(&self) -> bool {
    self.failed == 0 && self.timed_out == 0 && self.not_started == 0 && self.skipped.is_empty()
  }
}

impl fmt::Display for RunSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "=================== short test summary info ====================")?;
    for (benchmark, variant, status) in &self.outcomes {
      let label = match status {
        VariantStatus::Passed => "PASSED",
        VariantStatus::Failed => "FAILED",
        VariantStatus::TimedOut => "TIMEOUT",
      };
      writeln!(f, "{label} {benchmark}::{variant}")?;
    }
    for skipped in &self.skipped {
      match &skipped.name {
        Some(name) => writeln!(f, "SKIPPED {name}: {}", skipped.reason)?,
        None => writeln!(f, "SKIPPED {}", skipped.reason)?,
      }
    }
    writeln!(
      f,
      "================ {} failed, {} passed, {} timed out, {} skipped ===============",
      self.failed,
      self.passed,
      self.timed_out,
      self.skipped.len()
    )?;
    if self.not_started > 0 {
      writeln!(f, "{} variant(s) not started (--fail-fast)", self.not_started)?;
    }
    if let Some(path) = &self.results_path {
      writeln!(f, "Results: {}", path.display())?;
    }
    Ok(())
  }
}

/// Flattens an error and its sources into one line.
fn error_chain(error: &dyn Error) -> String {
  let mut message = error.to_string();
  let mut source = error.source();
  while let Some(cause) = source {
    message.push_str(": ");
    message.push_str(&cause.to_string());
    source = cause.source();
  }
  message
}

/// Convergence benchmarks only run when named or explicitly included.
fn is_convergence(name: &str) -> bool {
  name.contains("_conv")
}

/// Picks the benchmarks to run, recording every selection that cannot run.
fn select<'a>(
  specs: &'a SpecSet,
  names: &[String],
  include_convergence: bool,
  skipped: &mut Vec<SkippedBenchmark>,
) -> Vec<&'a BenchmarkSpec> {
  let excluded = |name: &str| names.is_empty() && !include_convergence && is_convergence(name);

  for rejected in &specs.rejected {
    let relevant = match &rejected.name {
      None => true,
      Some(name) if excluded(name.as_str()) => false,
      Some(name) => names.is_empty() || names.contains(name),
    };
    if relevant {
      skipped.push(SkippedBenchmark {
        name: rejected.name.clone(),
        reason: error_chain(&rejected.error),
      });
    }
  }

  if names.is_empty() {
    return specs
      .benchmarks
      .iter()
      .filter(|spec| {
        let keep = !excluded(spec.name.as_str());
        if !keep {
          tracing::info!(benchmark = %spec.name, "Skipping convergence benchmark");
        }
        keep
      })
      .collect();
  }

  let mut selected: Vec<&BenchmarkSpec> = Vec::with_capacity(names.len());
  for name in names {
    if selected.iter().any(|spec| &spec.name == name) {
      continue;
    }
    match specs.get(name) {
      Some(spec) => selected.push(spec),
      None if specs.rejection(name).is_some() => {}
      None => {
        let error = SpecError::BenchmarkNotFound { name: name.clone() };
        tracing::error!(error = %error, "Skipping selection");
        skipped.push(SkippedBenchmark {
          name: Some(name.clone()),
          reason: error.to_string(),
        });
      }
    }
  }
  selected
}

/// One variant queued for execution.
struct Job {
  spec: Arc<BenchmarkSpec>,
  variant: Variant,
}

/// Run-wide settings shared read-only by every variant task.
struct RunContext {
  working_dir: PathBuf,
  timeout: Option<Duration>,
  kill_grace: Duration,
  log_dir: Option<PathBuf>,
  fail_fast: bool,
  stop: AtomicBool,
}

/// Main benchmark runner.
pub async fn run_benchmarks(config: Config) -> Result<RunSummary> {
  let span = tracing::info_span!("run_benchmarks", specs = ?config.specs);

  async move {
    tracing::info!("--- Starting Benchmark Sweep ---");
    let specs = load_specs(&config.specs).map_err(SweepError::from)?;

    let mut summary = RunSummary::default();
    let selected = select(
      &specs,
      &config.benchmarks,
      config.include_convergence,
      &mut summary.skipped,
    );

    let mut aggregator = ResultAggregator::new();
    let mut queue = Vec::new();
    for spec in selected {
      match expand(spec) {
        Ok(variants) => {
          tracing::info!(benchmark = %spec.name, "Running {} variants:", variants.len());
          for variant in &variants {
            tracing::info!("\t{}", variant.name);
          }
          aggregator.declare_labels(spec.outputs.iter().map(|column| column.label.as_str()));
          let spec = Arc::new(spec.clone());
          queue.extend(variants.into_iter().map(|variant| Job {
            spec: Arc::clone(&spec),
            variant,
          }));
        }
        Err(e) => {
          tracing::error!(benchmark = %spec.name, error = %e, "Benchmark skipped");
          summary.skipped.push(SkippedBenchmark {
            name: Some(spec.name.clone()),
            reason: error_chain(&e),
          });
        }
      }
    }

    if config.dry_run {
      print_plan(&queue);
      return Ok(summary);
    }

    let context = Arc::new(RunContext {
      working_dir: config.working_dir.clone(),
      timeout: config.timeout,
      kill_grace: config.kill_grace,
      log_dir: config.log_dir.clone(),
      fail_fast: config.fail_fast,
      stop: AtomicBool::new(false),
    });

    let total = queue.len();
    let (tx, mut rx) = mpsc::channel::<ResultRow>(config.jobs * 2);
    let dispatcher = tokio::spawn(dispatch(queue, Arc::clone(&context), tx, config.jobs));

    // Single writer: only this loop touches the aggregator.
    while let Some(row) = rx.recv().await {
      aggregator.push(row);
    }
    let started = dispatcher.await.context("Variant dispatcher failed")?;

    summary.passed = aggregator.count(VariantStatus::Passed);
    summary.failed = aggregator.count(VariantStatus::Failed);
    summary.timed_out = aggregator.count(VariantStatus::TimedOut);
    summary.not_started = total - started;
    summary.outcomes = aggregator
      .rows_sorted()
      .into_iter()
      .map(|row| (row.benchmark.clone(), row.variant.clone(), row.status))
      .collect();

    let json_path = aggregator.write(&config.output).map_err(SweepError::from)?;
    summary.results_path = Some(config.output.clone());
    summary.json_path = Some(json_path);

    tracing::info!(
      passed = summary.passed,
      failed = summary.failed,
      timed_out = summary.timed_out,
      skipped = summary.skipped.len(),
      "--- Benchmark run complete ---"
    );
    Ok(summary)
  }
  .instrument(span)
  .await
}

/// Starts variants in queue order, at most `workers` at a time. Returns how
/// many were started.
async fn dispatch(
  queue: Vec<Job>,
  context: Arc<RunContext>,
  tx: mpsc::Sender<ResultRow>,
  workers: usize,
) -> usize {
  let semaphore = Arc::new(Semaphore::new(workers));
  let mut started = 0;

  for job in queue {
    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
      break;
    };
    if context.stop.load(Ordering::SeqCst) {
      tracing::warn!("Not starting further variants (--fail-fast)");
      break;
    }
    started += 1;

    let tx = tx.clone();
    let context = Arc::clone(&context);
    let span = tracing::info_span!(
      "variant",
      benchmark = %job.variant.benchmark,
      name = %job.variant.name
    );
    tokio::spawn(
      async move {
        let row = run_variant(&job, &context).await;
        if context.fail_fast && row.status != VariantStatus::Passed {
          context.stop.store(true, Ordering::SeqCst);
        }
        if tx.send(row).await.is_err() {
          tracing::error!("Result receiver closed; dropping row");
        }
        drop(permit);
      }
      .instrument(span),
    );
  }
  started
}

/// Executes one variant and scores it. Never fails: problems become the
/// row's status.
async fn run_variant(job: &Job, context: &RunContext) -> ResultRow {
  let Job { spec, variant } = job;
  tracing::info!(command = %variant.command, "Running variant");

  let cwd = spec.location.as_deref().unwrap_or(&context.working_dir);
  for (key, value) in &variant.env {
    tracing::debug!("    {key}={value}");
  }

  let request = ExecRequest {
    command: &variant.command,
    env: &variant.env,
    cwd: Some(cwd),
    timeout: spec.timeout.or(context.timeout),
    kill_grace: context.kill_grace,
  };

  let source = pathdiff::diff_paths(&spec.source, &context.working_dir)
    .unwrap_or_else(|| spec.source.clone())
    .display()
    .to_string();
  let mut row = ResultRow {
    benchmark: variant.benchmark.clone(),
    variant: variant.name.clone(),
    status: VariantStatus::Failed,
    metrics: BTreeMap::new(),
    params: variant.params.iter().cloned().collect(),
    command: variant.command.clone(),
    env: variant.env.clone(),
    exit_code: None,
    duration_s: 0.0,
    started_at: None,
    finished_at: None,
    source,
    error: None,
  };

  let result = match execute(&request).await {
    Ok(result) => result,
    Err(e) => {
      let message = error_chain(&SweepError::from(e));
      tracing::error!(error = %message, "Variant could not be run");
      for column in &spec.outputs {
        row.metrics.insert(column.label.clone(), MetricValue::NotFound);
      }
      row.error = Some(message);
      return row;
    }
  };

  row.status = if result.timed_out {
    tracing::error!(timeout = ?request.timeout, "Variant timed out");
    VariantStatus::TimedOut
  } else if result.success {
    VariantStatus::Passed
  } else {
    tracing::error!(
      code = ?result.exit_code,
      "Benchmark ERROR, exited with a non-zero code. Check the variant logs."
    );
    VariantStatus::Failed
  };
  tracing::info!(duration = ?result.duration, "Variant finished");

  for column in &spec.outputs {
    let Some(metric) = spec.metric(&column.metric) else {
      continue;
    };
    let value = metric.evaluate(&result.stdout, &result.stderr);
    match &value {
      MetricValue::Found(scalar) => tracing::info!("   {} = '{}'", column.label, scalar),
      MetricValue::NotFound => tracing::warn!("   {} = 'VALUE_NOT_FOUND'", column.label),
      MetricValue::Failed(reason) => tracing::error!("   {} failed: {}", column.label, reason),
    }
    row.metrics.insert(column.label.clone(), value);
  }

  if let Some(dir) = &context.log_dir {
    if let Err(e) = write_variant_logs(dir, &variant.name, &result.stdout, &result.stderr).await {
      tracing::warn!(error = %e, dir = %dir.display(), "Failed to write variant logs");
    }
  }

  row.exit_code = result.exit_code;
  row.duration_s = result.duration.as_secs_f64();
  row.started_at = Some(result.started_at);
  row.finished_at = Some(result.finished_at);
  row
}

/// Directory name for a variant's logs. Parameter values may contain path
/// separators or `..`; neither may leave the log directory.
fn log_dir_name(variant: &str) -> String {
  let name: String = variant
    .chars()
    .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
    .collect();
  match name.as_str() {
    "" | "." | ".." => "_".to_string(),
    _ => name,
  }
}

async fn write_variant_logs(
  dir: &Path,
  variant: &str,
  stdout: &str,
  stderr: &str,
) -> Result<(), SweepError> {
  let variant_dir = dir.join(log_dir_name(variant));
  tokio::fs::create_dir_all(&variant_dir).await?;
  tokio::fs::write(variant_dir.join("stdout.log"), stdout).await?;
  tokio::fs::write(variant_dir.join("stderr.log"), stderr).await?;
  Ok(())
}

/// Prints the expanded variants of a dry run to stdout.
fn print_plan(queue: &[Job]) {
  for Job { spec, variant } in queue {
    println!("{}", variant.name);
    println!("    cmd: {}", variant.command);
    for (key, value) in &variant.env {
      println!("    env: {key}={value}");
    }
    if let Some(timeout) = spec.timeout {
      println!("    timeout: {}s", timeout.as_secs_f64());
    }
  }
}
