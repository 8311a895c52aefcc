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
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error enum for the sweeplab library.
///
/// Metric extraction failures never appear here: they are recorded on the
/// result row and never abort anything.
#[derive(Error, Debug)]
pub enum SweepError {
  #[error("Failed to load benchmark specs")]
  Spec(#[from] SpecError),

  #[error("Execution failed")]
  Exec(#[from] ExecError),

  #[error("Failed to persist results")]
  Results(#[from] ResultsError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors raised while loading, resolving and expanding benchmark specs
/// (src/spec.rs, src/variant.rs, src/command.rs).
///
/// All of these are fatal for the benchmark they concern and never for the
/// whole run, with the exception of `SpecNotFound` when no document at all
/// could be read.
#[derive(Error, Debug)]
pub enum SpecError {
  #[error("No benchmark spec document found for '{source_pattern}'")]
  SpecNotFound { source_pattern: String },

  #[error("Invalid glob pattern '{pattern}'")]
  InvalidGlob {
    pattern: String,
    #[source]
    source: globset::Error,
  },

  #[error("Failed to read spec file: {path}")]
  ReadSpec {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse {path}{}: {message}", describe_location(.location))]
  SpecParse {
    path: PathBuf,
    location: Option<(usize, usize)>,
    message: String,
  },

  #[error("Benchmark '{name}' is defined in both {first} and {second}")]
  DuplicateBenchmark {
    name: String,
    first: PathBuf,
    second: PathBuf,
  },

  #[error("Benchmark '{benchmark}' extends unknown shared block '{block}'")]
  UnknownSharedBlock { benchmark: String, block: String },

  #[error("Inheritance cycle through shared block '{block}'")]
  InheritanceCycle { block: String },

  #[error("Benchmark '{benchmark}' has no 'cmd' after inheritance")]
  MissingCommand { benchmark: String },

  #[error("Metric '{metric}' in '{benchmark}' has an invalid regexp")]
  InvalidRegex {
    benchmark: String,
    metric: String,
    #[source]
    source: regex::Error,
  },

  #[error("Output column '{label}' in '{benchmark}' refers to undeclared metric '{metric}'")]
  UnknownOutputMetric {
    benchmark: String,
    metric: String,
    label: String,
  },

  #[error("Malformed template '{template}': {reason}")]
  MalformedTemplate { template: String, reason: String },

  #[error("Placeholder '{{{placeholder}}}' is not bound by any parameter of '{variant}'")]
  UnboundPlaceholder { variant: String, placeholder: String },

  #[error("Ambiguous 'parameters' in '{benchmark}': {reason}")]
  AmbiguousParameters { benchmark: String, reason: String },

  #[error("Parameter row {row} of '{benchmark}' has {found} values, expected {expected}")]
  RaggedParameterRows {
    benchmark: String,
    row: usize,
    expected: usize,
    found: usize,
  },

  #[error("Two variants of '{benchmark}' are both named '{variant}'")]
  VariantNameCollision { benchmark: String, variant: String },

  #[error("Benchmark '{name}' not found in any of the provided spec files")]
  BenchmarkNotFound { name: String },
}

/// Errors related to running a variant's process (src/executor.rs).
#[derive(Error, Debug)]
pub enum ExecError {
  #[error("Failed to spawn '{command}'")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to take {stream} pipe")]
  Pipe { stream: &'static str },

  #[error("Failed to wait for child process")]
  Wait(#[source] std::io::Error),

  #[error("Failed to read {stream}")]
  ReadStream {
    stream: &'static str,
    #[source]
    source: std::io::Error,
  },
}

/// Metric-level failures (src/metrics.rs). These are recorded against the
/// metric and never fail the variant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
  #[error("Expected exactly one match, found {found}")]
  UnexpectedMatchCount { found: usize },

  #[error("Match '{text}' is not a number")]
  NonNumericMatch { text: String },
}

/// Errors related to persisting the results table (src/results.rs).
#[derive(Error, Debug)]
pub enum ResultsError {
  #[error("Failed to create results directory {path}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to write CSV results to {path}")]
  Csv {
    path: PathBuf,
    #[source]
    source: csv::Error,
  },

  #[error("Failed to write JSON results to {path}")]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("Failed to write {path}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

fn describe_location(location: &Option<(usize, usize)>) -> String {
  match location {
    Some((line, column)) => format!(" at line {line}, column {column}"),
    None => String::new(),
  }
}
