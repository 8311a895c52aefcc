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
#![cfg(unix)]
use assert_cmd::cargo;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use tempfile::tempdir;

use fs_extra::dir::CopyOptions;
use fs_extra::dir::copy;
use std::fs;

use serde_json::Value;

/// Copies ./tests/fixtures into a fresh temp dir.
fn workspace() -> TempDir {
  let temp = tempdir().unwrap();
  copy("tests/fixtures", temp.path(), &CopyOptions::new()).unwrap();
  temp
}

fn sweep(dir: &Path) -> Command {
  let mut cmd = Command::new(cargo::cargo_bin!("sweep"));
  cmd
    .current_dir(dir)
    .env("CLICOLOR", "0")
    .env_remove("SWEEP_LOG_FILE")
    .env_remove("RUST_LOG");
  cmd
}

#[test]
fn test_run_phase_sweep() {
  let temp = workspace();

  sweep(temp.path())
    .arg("run")
    .arg("--spec")
    .arg("fixtures/benchmarks.yml")
    .arg("--output")
    .arg("out/results.csv")
    .arg("--log-dir")
    .arg("logs")
    .assert()
    .success()
    .stdout(predicate::str::contains("PASSED bench::bench_phase_128"))
    .stdout(predicate::str::contains("PASSED bench::bench_phase_384"))
    .stdout(predicate::str::contains("0 failed, 2 passed"));

  let csv = fs::read_to_string(temp.path().join("out/results.csv")).unwrap();
  let mut lines = csv.lines();
  assert_eq!(
    lines.next().unwrap(),
    "benchmark,variant,samples_per_sec,status,exit_code,duration_s"
  );
  assert!(lines.next().unwrap().starts_with("bench,bench_phase_128,128,passed,0,"));
  assert!(lines.next().unwrap().starts_with("bench,bench_phase_384,384,passed,0,"));
  assert!(lines.next().is_none());

  let stdout = fs::read_to_string(temp.path().join("logs/bench_phase_128/stdout.log")).unwrap();
  assert!(stdout.contains("run --config 128_config"));
  assert!(stdout.contains("FOO=1 MODE=base"));

  let json: Value =
    serde_json::from_str(&fs::read_to_string(temp.path().join("out/results.json")).unwrap())
      .unwrap();
  assert_eq!(json["columns"][0], "samples_per_sec");
  assert_eq!(json["rows"][1]["params"]["phase"], "384");
}

#[test]
fn test_failures_stay_with_their_variant() {
  let temp = workspace();

  sweep(temp.path())
    .arg("run")
    .arg("--spec")
    .arg("fixtures/failing.yml")
    .arg("--output")
    .arg("results.csv")
    .assert()
    .failure()
    .stdout(predicate::str::contains("TIMEOUT slow::slow"))
    .stdout(predicate::str::contains("PASSED twice::twice"))
    .stderr(predicate::str::contains("1 timed out"));

  let json: Value =
    serde_json::from_str(&fs::read_to_string(temp.path().join("results.json")).unwrap()).unwrap();
  let rows = json["rows"].as_array().unwrap();
  assert_eq!(rows[0]["variant"], "slow");
  assert_eq!(rows[0]["status"], "timed_out");
  assert_eq!(rows[1]["metrics"]["x"]["status"], "failed");
}

#[test]
fn test_unknown_benchmark_is_skipped() {
  let temp = workspace();

  sweep(temp.path())
    .arg("run")
    .arg("--spec")
    .arg("fixtures/*.yml")
    .arg("--benchmark")
    .arg("ghost")
    .arg("--benchmark")
    .arg("bench")
    .assert()
    .failure()
    .stdout(predicate::str::contains("SKIPPED ghost"))
    .stdout(predicate::str::contains("PASSED bench::bench_phase_128"))
    .stdout(predicate::str::contains("slow").not());

  assert!(temp.path().join("benchmark_results.csv").is_file());
}

#[test]
fn test_list_does_not_execute() {
  let temp = workspace();

  sweep(temp.path())
    .arg("list")
    .arg("--spec")
    .arg("fixtures/benchmarks.yml")
    .assert()
    .success()
    .stdout(predicate::str::contains("bench_phase_384"))
    .stdout(predicate::str::contains(
      "cmd: echo run --config 384_config; echo \"FOO=$FOO MODE=$MODE\"; echo 'throughput: 384'",
    ))
    .stdout(predicate::str::contains("env: FOO=1"));

  assert!(!temp.path().join("benchmark_results.csv").exists());
}

#[test]
fn test_settings_file_and_missing_specs() {
  let temp = workspace();
  fs::write(
    temp.path().join("sweep.toml"),
    "specs = [\"fixtures/benchmarks.yml\"]\noutput = \"from_toml.csv\"\n",
  )
  .unwrap();

  sweep(temp.path()).arg("run").assert().success();
  assert!(temp.path().join("from_toml.csv").is_file());

  sweep(temp.path())
    .arg("run")
    .arg("--spec")
    .arg("nowhere/*.yml")
    .assert()
    .failure()
    .stderr(predicate::str::contains("No benchmark spec document found"));
}
