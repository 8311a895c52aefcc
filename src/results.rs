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
//! The results table: one row per variant, written once at the end of a run.
use crate::error::ResultsError;
use crate::metrics::MetricValue;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantStatus {
  Passed,
  Failed,
  TimedOut,
}

impl fmt::Display for VariantStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      VariantStatus::Passed => "passed",
      VariantStatus::Failed => "failed",
      VariantStatus::TimedOut => "timed_out",
    })
  }
}

/// The outcome of one variant.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRow {
  pub benchmark: String,
  pub variant: String,
  pub status: VariantStatus,
  /// Output label to reduced metric.
  pub metrics: BTreeMap<String, MetricValue>,
  pub params: BTreeMap<String, String>,
  pub command: String,
  pub env: BTreeMap<String, String>,
  pub exit_code: Option<i32>,
  pub duration_s: f64,
  pub started_at: Option<DateTime<Utc>>,
  pub finished_at: Option<DateTime<Utc>>,
  /// Spec document, relative to the working directory when possible.
  pub source: String,
  /// Set when the process could not be run at all.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
  columns: &'a [String],
  rows: Vec<&'a ResultRow>,
}

/// Collects rows in completion order and persists a sorted view.
///
/// A run owns exactly one aggregator and is its only writer.
#[derive(Debug, Default)]
pub struct ResultAggregator {
  labels: Vec<String>,
  rows: Vec<ResultRow>,
}

impl ResultAggregator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds output labels to the column set, keeping first-seen order.
  pub fn declare_labels<'a, I>(&mut self, labels: I)
  where
    I: IntoIterator<Item = &'a str>,
  {
    for label in labels {
      if !self.labels.iter().any(|known| known == label) {
        self.labels.push(label.to_string());
      }
    }
  }

  pub fn push(&mut self, row: ResultRow) {
    self.rows.push(row);
  }

  pub fn labels(&self) -> &[String] {
    &self.labels
  }

  /// Rows in the order they were pushed.
  pub fn rows(&self) -> &[ResultRow] {
    &self.rows
  }

  pub fn count(&self, status: VariantStatus) -> usize {
    self.rows.iter().filter(|row| row.status == status).count()
  }

  /// Rows sorted by (benchmark, variant).
  pub fn rows_sorted(&self) -> Vec<&ResultRow> {
    let mut rows: Vec<&ResultRow> = self.rows.iter().collect();
    rows.sort_by(|a, b| (&a.benchmark, &a.variant).cmp(&(&b.benchmark, &b.variant)));
    rows
  }

  pub fn header(&self) -> Vec<String> {
    let mut header = vec!["benchmark".to_string(), "variant".to_string()];
    header.extend(self.labels.iter().cloned());
    header.extend(["status", "exit_code", "duration_s"].map(String::from));
    header
  }

  fn record(&self, row: &ResultRow) -> Vec<String> {
    let mut record = vec![row.benchmark.clone(), row.variant.clone()];
    for label in &self.labels {
      let cell = row
        .metrics
        .get(label)
        .and_then(MetricValue::scalar)
        .map(ToString::to_string)
        .unwrap_or_default();
      record.push(cell);
    }
    record.push(row.status.to_string());
    record.push(row.exit_code.map(|code| code.to_string()).unwrap_or_default());
    record.push(format!("{:.3}", row.duration_s));
    record
  }

  /// Path of the JSON twin written next to `csv_path`.
  pub fn json_path(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("json")
  }

  /// Writes the CSV table and its JSON twin. Returns the JSON path.
  pub fn write(&self, csv_path: &Path) -> Result<PathBuf, ResultsError> {
    if let Some(parent) = csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(|source| ResultsError::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let rows = self.rows_sorted();
    let csv_error = |source| ResultsError::Csv {
      path: csv_path.to_path_buf(),
      source,
    };

    let mut writer = csv::Writer::from_path(csv_path).map_err(csv_error)?;
    writer.write_record(self.header()).map_err(csv_error)?;
    for row in &rows {
      writer.write_record(self.record(row)).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| ResultsError::Write {
      path: csv_path.to_path_buf(),
      source,
    })?;
    tracing::info!(path = %csv_path.display(), rows = rows.len(), "Results saved");

    let json_path = Self::json_path(csv_path);
    let file = File::create(&json_path).map_err(|source| ResultsError::Write {
      path: json_path.clone(),
      source,
    })?;
    let report = JsonReport {
      columns: &self.labels,
      rows,
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &report).map_err(|source| {
      ResultsError::Json {
        path: json_path.clone(),
        source,
      }
    })?;
    tracing::info!(path = %json_path.display(), "Results saved");

    Ok(json_path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::metrics::Scalar;
  use tempfile::TempDir;

  fn row(benchmark: &str, variant: &str, metrics: &[(&str, MetricValue)]) -> ResultRow {
    ResultRow {
      benchmark: benchmark.to_string(),
      variant: variant.to_string(),
      status: VariantStatus::Passed,
      metrics: metrics
        .iter()
        .map(|(label, value)| (label.to_string(), value.clone()))
        .collect(),
      params: BTreeMap::new(),
      command: "true".to_string(),
      env: BTreeMap::new(),
      exit_code: Some(0),
      duration_s: 0.5,
      started_at: None,
      finished_at: None,
      source: "benchmarks.yml".to_string(),
      error: None,
    }
  }

  #[test]
  fn labels_are_a_first_seen_union() {
    let mut agg = ResultAggregator::new();
    agg.declare_labels(["throughput", "latency"]);
    agg.declare_labels(["latency", "loss"]);
    assert_eq!(agg.labels(), ["throughput", "latency", "loss"]);
  }

  #[test]
  fn persisted_view_is_sorted() {
    let mut agg = ResultAggregator::new();
    agg.push(row("b", "b_x_1", &[]));
    agg.push(row("a", "a_x_2", &[]));
    agg.push(row("a", "a_x_1", &[]));

    let order: Vec<_> = agg.rows_sorted().iter().map(|r| r.variant.as_str()).collect();
    assert_eq!(order, vec!["a_x_1", "a_x_2", "b_x_1"]);
    let pushed: Vec<_> = agg.rows().iter().map(|r| r.variant.as_str()).collect();
    assert_eq!(pushed, vec!["b_x_1", "a_x_2", "a_x_1"]);
  }

  #[test]
  fn writes_csv_with_empty_cells_for_missing_metrics() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("out").join("results.csv");

    let mut agg = ResultAggregator::new();
    agg.declare_labels(["throughput", "latency"]);
    agg.push(row(
      "bench",
      "bench_bs_1",
      &[
        ("throughput", MetricValue::Found(Scalar::Number(8.0))),
        ("latency", MetricValue::NotFound),
      ],
    ));
    agg.push(row(
      "bench",
      "bench_bs_2",
      &[("throughput", MetricValue::Failed("Expected exactly one match, found 2".into()))],
    ));

    let json_path = agg.write(&csv_path).unwrap();
    let csv = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(
      lines[0],
      "benchmark,variant,throughput,latency,status,exit_code,duration_s"
    );
    assert_eq!(lines[1], "bench,bench_bs_1,8,,passed,0,0.500");
    assert_eq!(lines[2], "bench,bench_bs_2,,,passed,0,0.500");

    let json: serde_json::Value =
      serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(json["columns"][0], "throughput");
    assert_eq!(json["rows"][0]["metrics"]["throughput"]["value"], 8.0);
    assert_eq!(json["rows"][1]["metrics"]["throughput"]["status"], "failed");
  }
}
