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
//! Loading benchmark spec documents and resolving shared blocks.
//!
//! A document is a YAML mapping from name to definition. Entries whose name
//! contains `options`, or which set `shared: true`, are shared blocks: they
//! are never run, only inherited from, either by name (`extends`) or through
//! a YAML merge key (`<<: *anchor`). Inheritance is an explicit field-level
//! merge: local fields win over inherited ones, later blocks over earlier
//! ones, and `env`/`data` merge key by key.
use crate::command::CommandTemplate;
use crate::error::SpecError;
use crate::metrics::Metric;
use crate::metrics::MetricDefinition;
use crate::variant::ParameterSet;
use crate::variant::scalar_to_string;
use globset::GlobBuilder;
use serde::Deserialize;
use serde_yaml::Mapping;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use walkdir::WalkDir;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
  One(String),
  Many(Vec<String>),
}

/// A definition as written, before inheritance.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawDefinition {
  cmd: Option<String>,
  description: Option<String>,
  parameters: Option<Value>,
  #[serde(default)]
  env: Mapping,
  #[serde(default)]
  data: Mapping,
  output: Option<Vec<(String, String)>>,
  extends: Option<OneOrMany>,
  #[serde(rename = "<<")]
  merge: Option<Value>,
  #[serde(default)]
  shared: bool,
  timeout: Option<f64>,
  location: Option<PathBuf>,
}

impl RawDefinition {
  /// Lays `over` on top of `self`.
  fn overlay(mut self, over: RawDefinition) -> RawDefinition {
    if over.cmd.is_some() {
      self.cmd = over.cmd;
    }
    if over.description.is_some() {
      self.description = over.description;
    }
    if over.parameters.is_some() {
      self.parameters = over.parameters;
    }
    if over.output.is_some() {
      self.output = over.output;
    }
    if over.timeout.is_some() {
      self.timeout = over.timeout;
    }
    if over.location.is_some() {
      self.location = over.location;
    }
    for (key, value) in over.env {
      self.env.insert(key, value);
    }
    for (key, value) in over.data {
      self.data.insert(key, value);
    }
    self
  }

  /// This definition's own fields, without its inheritance references.
  fn own_fields(&self) -> RawDefinition {
    RawDefinition {
      extends: None,
      merge: None,
      shared: false,
      ..self.clone()
    }
  }

  fn extends(&self) -> Vec<String> {
    match &self.extends {
      None => Vec::new(),
      Some(OneOrMany::One(name)) => vec![name.clone()],
      Some(OneOrMany::Many(names)) => names.clone(),
    }
  }

  /// Blocks pulled in with `<<`, in declaration order.
  fn inline_blocks(&self, source: &Path) -> Result<Vec<RawDefinition>, SpecError> {
    let values = match &self.merge {
      None => return Ok(Vec::new()),
      Some(Value::Sequence(items)) => items.clone(),
      Some(other) => vec![other.clone()],
    };
    values
      .into_iter()
      .map(|value| serde_yaml::from_value(value).map_err(|e| parse_error(source, &e)))
      .collect()
  }
}

/// One `[metric, label]` pair of a benchmark's `output` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
  pub metric: String,
  pub label: String,
}

/// A fully resolved benchmark definition.
#[derive(Debug, Clone)]
pub struct BenchmarkSpec {
  pub name: String,
  /// Document this benchmark was declared in.
  pub source: PathBuf,
  pub description: Option<String>,
  pub cmd: CommandTemplate,
  pub parameters: Option<ParameterSet>,
  /// Environment overlay; values may reference parameters.
  pub env: BTreeMap<String, CommandTemplate>,
  pub metrics: Vec<Metric>,
  pub outputs: Vec<OutputColumn>,
  pub timeout: Option<Duration>,
  /// Working directory, already resolved against the document's directory.
  pub location: Option<PathBuf>,
}

impl BenchmarkSpec {
  pub fn metric(&self, name: &str) -> Option<&Metric> {
    self.metrics.iter().find(|metric| metric.name == name)
  }
}

/// A benchmark (or whole document, when `name` is `None`) that could not be
/// loaded.
#[derive(Debug)]
pub struct Rejected {
  pub name: Option<String>,
  pub error: SpecError,
}

/// Everything loaded from one set of spec sources.
#[derive(Debug, Default)]
pub struct SpecSet {
  /// Benchmarks in document order, then declaration order.
  pub benchmarks: Vec<BenchmarkSpec>,
  pub rejected: Vec<Rejected>,
  pub documents: Vec<PathBuf>,
}

impl SpecSet {
  pub fn get(&self, name: &str) -> Option<&BenchmarkSpec> {
    self.benchmarks.iter().find(|spec| spec.name == name)
  }

  pub fn rejection(&self, name: &str) -> Option<&Rejected> {
    self
      .rejected
      .iter()
      .find(|rejected| rejected.name.as_deref() == Some(name))
  }
}

struct Entry {
  name: String,
  source: PathBuf,
  raw: RawDefinition,
}

impl Entry {
  fn is_shared(&self) -> bool {
    self.raw.shared || self.name.contains("options")
  }
}

/// Loads and resolves every benchmark found in `sources` (paths or globs).
///
/// Fails as a whole only when no document could be read and parsed; problems
/// confined to one benchmark or one document end up in `SpecSet::rejected`.
pub fn load_specs<S: AsRef<str>>(sources: &[S]) -> Result<SpecSet, SpecError> {
  let mut set = SpecSet::default();

  for pattern in sources {
    match resolve_source(pattern.as_ref()) {
      Ok(paths) => {
        for path in paths {
          if !set.documents.contains(&path) {
            set.documents.push(path);
          }
        }
      }
      Err(error) => {
        tracing::error!(pattern = pattern.as_ref(), error = %error, "Spec source skipped");
        set.rejected.push(Rejected { name: None, error });
      }
    }
  }

  if set.documents.is_empty() {
    return Err(match set.rejected.into_iter().next() {
      Some(rejected) => rejected.error,
      None => SpecError::SpecNotFound {
        source_pattern: String::new(),
      },
    });
  }

  let mut entries = Vec::new();
  let mut parsed_any = false;
  let mut first_error = None;

  for path in &set.documents {
    tracing::debug!(path = %path.display(), "Examining spec document");
    match read_document(path) {
      Ok(definitions) => {
        parsed_any = true;
        for (name, raw) in definitions {
          match raw {
            Ok(raw) => entries.push(Entry {
              name,
              source: path.clone(),
              raw,
            }),
            Err(error) => set.rejected.push(Rejected {
              name: Some(name),
              error,
            }),
          }
        }
      }
      Err(error) => {
        tracing::error!(path = %path.display(), error = %error, "Spec document skipped");
        if first_error.is_none() {
          first_error = Some(error);
        } else {
          set.rejected.push(Rejected { name: None, error });
        }
      }
    }
  }

  if !parsed_any {
    return Err(first_error.unwrap_or(SpecError::SpecNotFound {
      source_pattern: String::new(),
    }));
  }
  if let Some(error) = first_error {
    set.rejected.push(Rejected { name: None, error });
  }

  let entries = reject_duplicates(entries, &mut set.rejected);

  let (blocks, benchmarks): (Vec<Entry>, Vec<Entry>) =
    entries.into_iter().partition(Entry::is_shared);
  let blocks: HashMap<String, Entry> = blocks
    .into_iter()
    .map(|entry| (entry.name.clone(), entry))
    .collect();

  for entry in benchmarks {
    let resolved = resolve(&entry.raw, &entry.name, &entry.source, &blocks, &mut Vec::new())
      .and_then(|raw| build(&entry.name, &entry.source, raw));
    match resolved {
      Ok(spec) => set.benchmarks.push(spec),
      Err(error) => {
        tracing::error!(benchmark = %entry.name, error = %error, "Benchmark rejected");
        set.rejected.push(Rejected {
          name: Some(entry.name),
          error,
        });
      }
    }
  }

  tracing::info!(
    documents = set.documents.len(),
    benchmarks = set.benchmarks.len(),
    rejected = set.rejected.len(),
    "Loaded benchmark specs"
  );
  Ok(set)
}

/// Drops every name defined more than once across the document set.
fn reject_duplicates(entries: Vec<Entry>, rejected: &mut Vec<Rejected>) -> Vec<Entry> {
  let mut first_seen: HashMap<&str, &Path> = HashMap::new();
  let mut duplicates: HashMap<String, (PathBuf, PathBuf)> = HashMap::new();

  for entry in &entries {
    match first_seen.get(entry.name.as_str()) {
      Some(first) => {
        duplicates
          .entry(entry.name.clone())
          .or_insert_with(|| (first.to_path_buf(), entry.source.clone()));
      }
      None => {
        first_seen.insert(&entry.name, &entry.source);
      }
    }
  }

  let mut reported = HashSet::new();
  let mut kept = Vec::with_capacity(entries.len());
  for entry in entries {
    match duplicates.get(&entry.name) {
      Some((first, second)) => {
        if reported.insert(entry.name.clone()) {
          rejected.push(Rejected {
            name: Some(entry.name.clone()),
            error: SpecError::DuplicateBenchmark {
              name: entry.name,
              first: first.clone(),
              second: second.clone(),
            },
          });
        }
      }
      None => kept.push(entry),
    }
  }
  kept
}

fn resolve(
  raw: &RawDefinition,
  benchmark: &str,
  source: &Path,
  blocks: &HashMap<String, Entry>,
  stack: &mut Vec<String>,
) -> Result<RawDefinition, SpecError> {
  let mut resolved = RawDefinition::default();

  for inline in raw.inline_blocks(source)? {
    let inherited = resolve(&inline, benchmark, source, blocks, stack)?;
    resolved = resolved.overlay(inherited);
  }

  for name in raw.extends() {
    if stack.contains(&name) {
      return Err(SpecError::InheritanceCycle { block: name });
    }
    let block = blocks
      .get(&name)
      .ok_or_else(|| SpecError::UnknownSharedBlock {
        benchmark: benchmark.to_string(),
        block: name.clone(),
      })?;
    stack.push(name);
    let inherited = resolve(&block.raw, benchmark, &block.source, blocks, stack);
    stack.pop();
    resolved = resolved.overlay(inherited?);
  }

  Ok(resolved.overlay(raw.own_fields()))
}

fn build(name: &str, source: &Path, raw: RawDefinition) -> Result<BenchmarkSpec, SpecError> {
  let invalid = |message: String| SpecError::SpecParse {
    path: source.to_path_buf(),
    location: None,
    message,
  };

  let cmd = raw
    .cmd
    .as_deref()
    .ok_or_else(|| SpecError::MissingCommand {
      benchmark: name.to_string(),
    })?;
  let cmd = CommandTemplate::parse(cmd)?;

  let parameters = match &raw.parameters {
    Some(value) => ParameterSet::from_yaml(value, name)?,
    None => None,
  };

  let param_names = parameters
    .as_ref()
    .map(ParameterSet::names)
    .unwrap_or_default();
  let mut env = BTreeMap::new();
  for (key, value) in &raw.env {
    let key = scalar_to_string(key)
      .ok_or_else(|| invalid(format!("env keys of '{name}' must be scalars")))?;
    let value = scalar_to_string(value)
      .ok_or_else(|| invalid(format!("env '{key}' of '{name}' must be a scalar")))?;
    env.insert(key, CommandTemplate::parse_env(&value, &param_names));
  }

  let mut metrics = Vec::with_capacity(raw.data.len());
  for (key, value) in raw.data {
    let metric = scalar_to_string(&key)
      .ok_or_else(|| invalid(format!("metric names of '{name}' must be scalars")))?;
    let definition: MetricDefinition = serde_yaml::from_value(value)
      .map_err(|e| invalid(format!("metric '{metric}' of '{name}': {e}")))?;
    let compiled = Metric::compile(&metric, definition).map_err(|source| SpecError::InvalidRegex {
      benchmark: name.to_string(),
      metric: metric.clone(),
      source,
    })?;
    metrics.push(compiled);
  }

  let outputs = match raw.output {
    Some(pairs) => pairs
      .into_iter()
      .map(|(metric, label)| OutputColumn { metric, label })
      .collect(),
    None => metrics
      .iter()
      .map(|metric| OutputColumn {
        metric: metric.name.clone(),
        label: metric.name.clone(),
      })
      .collect::<Vec<_>>(),
  };
  if let Some(column) = outputs
    .iter()
    .find(|column| !metrics.iter().any(|metric| metric.name == column.metric))
  {
    return Err(SpecError::UnknownOutputMetric {
      benchmark: name.to_string(),
      metric: column.metric.clone(),
      label: column.label.clone(),
    });
  }

  let timeout = raw
    .timeout
    .map(|secs| {
      Duration::try_from_secs_f64(secs).map_err(|_| {
        invalid(format!(
          "timeout of '{name}' must be a non-negative number of seconds"
        ))
      })
    })
    .transpose()?;

  let location = raw.location.map(|location| {
    source
      .parent()
      .map(|dir| dir.join(&location))
      .unwrap_or(location)
  });

  Ok(BenchmarkSpec {
    name: name.to_string(),
    source: source.to_path_buf(),
    description: raw.description,
    cmd,
    parameters,
    env,
    metrics,
    outputs,
    timeout,
    location,
  })
}

type Definitions = Vec<(String, Result<RawDefinition, SpecError>)>;

fn read_document(path: &Path) -> Result<Definitions, SpecError> {
  let text = fs::read_to_string(path).map_err(|source| SpecError::ReadSpec {
    path: path.to_path_buf(),
    source,
  })?;
  let document: Value = serde_yaml::from_str(&text).map_err(|e| parse_error(path, &e))?;

  let mapping = match document {
    Value::Null => return Ok(Vec::new()),
    Value::Mapping(mapping) => mapping,
    _ => {
      return Err(SpecError::SpecParse {
        path: path.to_path_buf(),
        location: None,
        message: "top level must map benchmark names to definitions".to_string(),
      });
    }
  };

  let mut definitions = Vec::with_capacity(mapping.len());
  for (key, value) in mapping {
    let Some(name) = scalar_to_string(&key) else {
      return Err(SpecError::SpecParse {
        path: path.to_path_buf(),
        location: None,
        message: "benchmark names must be scalars".to_string(),
      });
    };
    let raw = serde_yaml::from_value::<RawDefinition>(value).map_err(|e| SpecError::SpecParse {
      path: path.to_path_buf(),
      location: None,
      message: format!("'{name}': {e}"),
    });
    definitions.push((name, raw));
  }
  Ok(definitions)
}

fn parse_error(path: &Path, error: &serde_yaml::Error) -> SpecError {
  SpecError::SpecParse {
    path: path.to_path_buf(),
    location: error.location().map(|l| (l.line(), l.column())),
    message: error.to_string(),
  }
}

fn is_glob(pattern: &str) -> bool {
  pattern.contains(['*', '?', '[', '{'])
}

/// Expands a path or glob into the documents it names, sorted.
fn resolve_source(pattern: &str) -> Result<Vec<PathBuf>, SpecError> {
  let not_found = || SpecError::SpecNotFound {
    source_pattern: pattern.to_string(),
  };

  if !is_glob(pattern) {
    let path = PathBuf::from(pattern);
    return if path.is_file() {
      Ok(vec![path])
    } else {
      Err(not_found())
    };
  }

  let matcher = GlobBuilder::new(pattern)
    .literal_separator(true)
    .build()
    .map_err(|source| SpecError::InvalidGlob {
      pattern: pattern.to_string(),
      source,
    })?
    .compile_matcher();

  let root: PathBuf = Path::new(pattern)
    .components()
    .take_while(|component| !is_glob(&component.as_os_str().to_string_lossy()))
    .collect();
  let walk_root = if root.as_os_str().is_empty() {
    PathBuf::from(".")
  } else {
    root.clone()
  };

  let mut found: Vec<PathBuf> = WalkDir::new(&walk_root)
    .into_iter()
    .filter_map(Result::ok)
    .filter(|entry| entry.file_type().is_file())
    .map(|entry| entry.into_path())
    .filter(|path| {
      let candidate = if root.as_os_str().is_empty() {
        path.strip_prefix(".").unwrap_or(path)
      } else {
        path.as_path()
      };
      matcher.is_match(candidate)
    })
    .collect();
  found.sort();

  if found.is_empty() {
    Err(not_found())
  } else {
    Ok(found)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  fn write(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
  }

  fn env_of(spec: &BenchmarkSpec, key: &str) -> String {
    spec.env[key].as_str().to_string()
  }

  #[test]
  fn local_env_overrides_shared_block() {
    let dir = TempDir::new().unwrap();
    let path = write(
      &dir,
      "benchmarks.yml",
      r#"
common_options:
  env:
    FOO: "1"
    BAR: "shared"

keeps_foo:
  extends: common_options
  cmd: echo keep

overrides_foo:
  extends: [common_options]
  cmd: echo override
  env:
    FOO: "2"
"#,
    );

    let set = load_specs(&[path]).unwrap();
    assert_eq!(set.benchmarks.len(), 2);
    let keeps = set.get("keeps_foo").unwrap();
    let overrides = set.get("overrides_foo").unwrap();
    assert_eq!(env_of(keeps, "FOO"), "1");
    assert_eq!(env_of(overrides, "FOO"), "2");
    assert_eq!(env_of(overrides, "BAR"), "shared");
    assert!(set.get("common_options").is_none());
  }

  #[test]
  fn later_blocks_override_earlier_ones() {
    let dir = TempDir::new().unwrap();
    let path = write(
      &dir,
      "benchmarks.yml",
      r#"
a_options:
  cmd: echo a
  env: {X: a, ONLY_A: "1"}
b_options:
  cmd: echo b
  env: {X: b}
bench:
  extends: [a_options, b_options]
"#,
    );

    let set = load_specs(&[path]).unwrap();
    let bench = set.get("bench").unwrap();
    assert_eq!(bench.cmd.as_str(), "echo b");
    assert_eq!(env_of(bench, "X"), "b");
    assert_eq!(env_of(bench, "ONLY_A"), "1");
  }

  #[test]
  fn yaml_merge_keys_are_inherited() {
    let dir = TempDir::new().unwrap();
    let path = write(
      &dir,
      "benchmarks.yml",
      r#"
shared_env: &shared_env
  shared: true
  env:
    FOO: "1"
  data:
    throughput:
      regexp: 'throughput: (\d+)'

bench:
  <<: *shared_env
  cmd: echo hi
"#,
    );

    let set = load_specs(&[path]).unwrap();
    let bench = set.get("bench").unwrap();
    assert_eq!(env_of(bench, "FOO"), "1");
    assert_eq!(bench.outputs.len(), 1);
    assert_eq!(bench.outputs[0].label, "throughput");
    assert!(set.get("shared_env").is_none());
  }

  #[test]
  fn unknown_block_and_cycles_reject_only_that_benchmark() {
    let dir = TempDir::new().unwrap();
    let path = write(
      &dir,
      "benchmarks.yml",
      r#"
loop_options:
  extends: loop_options
good:
  cmd: echo ok
missing:
  extends: nope_options
  cmd: echo missing
cyclic:
  extends: loop_options
  cmd: echo cyclic
"#,
    );

    let set = load_specs(&[path]).unwrap();
    assert!(set.get("good").is_some());
    assert!(matches!(
      set.rejection("missing").unwrap().error,
      SpecError::UnknownSharedBlock { .. }
    ));
    assert!(matches!(
      set.rejection("cyclic").unwrap().error,
      SpecError::InheritanceCycle { .. }
    ));
  }

  #[test]
  fn duplicate_names_across_documents() {
    let dir = TempDir::new().unwrap();
    let first = write(&dir, "a.yml", "bench:\n  cmd: echo a\nonly_a:\n  cmd: echo a\n");
    let second = write(&dir, "b.yml", "bench:\n  cmd: echo b\n");

    let set = load_specs(&[first, second]).unwrap();
    assert!(set.get("bench").is_none());
    assert!(set.get("only_a").is_some());
    assert!(matches!(
      set.rejection("bench").unwrap().error,
      SpecError::DuplicateBenchmark { .. }
    ));
  }

  #[test]
  fn glob_sources_are_expanded_in_order() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("specs")).unwrap();
    write(&dir, "specs/b.yml", "second:\n  cmd: echo 2\n");
    write(&dir, "specs/a.yml", "first:\n  cmd: echo 1\n");
    write(&dir, "specs/notes.txt", "not a spec");

    let pattern = format!("{}/specs/*.yml", dir.path().display());
    let set = load_specs(&[pattern]).unwrap();
    let names: Vec<_> = set.benchmarks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
  }

  #[test]
  fn missing_sources_fail_the_load() {
    let err = load_specs(&["/definitely/not/here.yml"]).unwrap_err();
    assert!(matches!(err, SpecError::SpecNotFound { .. }));
  }

  #[test]
  fn malformed_document_is_isolated() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "good.yml", "bench:\n  cmd: echo ok\n");
    let bad = write(&dir, "bad.yml", "bench2:\n  cmd: [unclosed\n");

    let set = load_specs(&[good, bad.clone()]).unwrap();
    assert!(set.get("bench").is_some());
    assert!(set.rejected.iter().any(|r| matches!(
      &r.error,
      SpecError::SpecParse { path, location: Some(_), .. } if path.to_string_lossy() == bad
    )));

    let err = load_specs(&[bad]).unwrap_err();
    assert!(matches!(err, SpecError::SpecParse { .. }));
  }

  #[test]
  fn invalid_definitions_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(
      &dir,
      "benchmarks.yml",
      r#"
no_cmd:
  description: nothing to run
bad_regex:
  cmd: echo hi
  data:
    throughput:
      regexp: '(unclosed'
bad_output:
  cmd: echo hi
  output: [[latency, "Latency (ms)"]]
"#,
    );

    let set = load_specs(&[path]).unwrap();
    assert!(set.benchmarks.is_empty());
    assert!(matches!(
      set.rejection("no_cmd").unwrap().error,
      SpecError::MissingCommand { .. }
    ));
    assert!(matches!(
      set.rejection("bad_regex").unwrap().error,
      SpecError::InvalidRegex { .. }
    ));
    assert!(matches!(
      set.rejection("bad_output").unwrap().error,
      SpecError::UnknownOutputMetric { .. }
    ));
  }

  #[test]
  fn location_is_relative_to_the_document() {
    let dir = TempDir::new().unwrap();
    let path = write(
      &dir,
      "benchmarks.yml",
      "bench:\n  cmd: echo hi\n  location: app\n  timeout: 2.5\n  env: {N: 4}\n",
    );

    let set = load_specs(&[path]).unwrap();
    let bench = set.get("bench").unwrap();
    assert_eq!(bench.location.as_deref(), Some(dir.path().join("app").as_path()));
    assert_eq!(bench.timeout, Some(Duration::from_millis(2500)));
    assert_eq!(env_of(bench, "N"), "4");
  }

  #[test]
  fn json_env_values_survive_expansion() {
    let dir = TempDir::new().unwrap();
    let path = write(
      &dir,
      "benchmarks.yml",
      r#"
bench:
  parameters:
    batch: "8,16"
  cmd: echo {batch}
  env:
    POPLAR_ENGINE_OPTIONS: '{"autoReport.all":"true"}'
    REPORT_DIR: 'reports/{batch}'
"#,
    );

    let set = load_specs(&[path]).unwrap();
    let bench = set.get("bench").unwrap();
    let variants = crate::variant::expand(bench).unwrap();
    assert_eq!(variants.len(), 2);
    assert_eq!(
      variants[0].env["POPLAR_ENGINE_OPTIONS"],
      r#"{"autoReport.all":"true"}"#
    );
    assert_eq!(variants[1].env["REPORT_DIR"], "reports/16");
  }
}
