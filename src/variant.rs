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
//! Parameter declarations and their expansion into named variants.
use crate::command::Assignment;
use crate::error::SpecError;
use crate::spec::BenchmarkSpec;
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::collections::HashSet;

/// A benchmark's `parameters`, in one of three explicitly distinct shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterSet {
  /// One parameter, one variant per value.
  SubField { name: String, values: Vec<String> },
  /// Parallel columns: row `i` of every column is used together.
  Paired {
    names: Vec<String>,
    rows: Vec<Vec<String>>,
  },
  /// Independent columns combined by full cartesian product, first column
  /// varying slowest.
  Product { columns: Vec<(String, Vec<String>)> },
}

impl ParameterSet {
  /// Interprets a YAML `parameters` value.
  ///
  /// Accepted shapes:
  /// - `{paired: [[a, b], [1, 2], ...]}` and `{product: {a: [..], b: ..}}`
  /// - a mapping of `name: "v1,v2"` / `name: [v1, v2]` (one key: sub-field,
  ///   several keys: product)
  /// - a sequence whose first row names the columns (paired)
  ///
  /// Returns `Ok(None)` for an empty declaration.
  pub fn from_yaml(value: &Value, benchmark: &str) -> Result<Option<Self>, SpecError> {
    let ambiguous = |reason: String| SpecError::AmbiguousParameters {
      benchmark: benchmark.to_string(),
      reason,
    };

    match value {
      Value::Null => Ok(None),
      Value::Sequence(rows) => parse_paired(rows, benchmark),
      Value::Mapping(map) if map.is_empty() => Ok(None),
      Value::Mapping(map) => {
        if let (1, Some((key, inner))) = (map.len(), map.iter().next()) {
          match (key.as_str(), inner) {
            (Some("paired"), Value::Sequence(rows)) => return parse_paired(rows, benchmark),
            (Some("paired"), _) => {
              return Err(ambiguous("'paired' must be a sequence of rows".to_string()));
            }
            (Some("product"), Value::Mapping(columns)) => {
              return parse_columns(columns, benchmark).map(|columns| {
                if columns.is_empty() {
                  None
                } else {
                  Some(ParameterSet::Product { columns })
                }
              });
            }
            (Some("product"), _) => {
              return Err(ambiguous(
                "'product' must map parameter names to values".to_string(),
              ));
            }
            _ => {}
          }
        }

        let mut columns = parse_columns(map, benchmark)?;
        if columns.len() == 1 {
          let (name, values) = columns.remove(0);
          Ok(Some(ParameterSet::SubField { name, values }))
        } else {
          Ok(Some(ParameterSet::Product { columns }))
        }
      }
      Value::Tagged(tagged) => Self::from_yaml(&tagged.value, benchmark),
      _ => Err(ambiguous(
        "expected a mapping of parameter values or a sequence of rows".to_string(),
      )),
    }
  }

  pub fn names(&self) -> Vec<&str> {
    match self {
      ParameterSet::SubField { name, .. } => vec![name.as_str()],
      ParameterSet::Paired { names, .. } => names.iter().map(String::as_str).collect(),
      ParameterSet::Product { columns } => columns.iter().map(|(n, _)| n.as_str()).collect(),
    }
  }

  /// Every assignment this set describes, in expansion order.
  pub fn assignments(&self) -> Vec<Assignment> {
    match self {
      ParameterSet::SubField { name, values } => values
        .iter()
        .map(|value| vec![(name.clone(), value.clone())])
        .collect(),
      ParameterSet::Paired { names, rows } => rows
        .iter()
        .map(|row| names.iter().cloned().zip(row.iter().cloned()).collect())
        .collect(),
      ParameterSet::Product { columns } => {
        let mut combos: Vec<Assignment> = vec![Vec::new()];
        for (name, values) in columns {
          combos = combos
            .into_iter()
            .flat_map(|prefix| {
              values.iter().map(move |value| {
                let mut next = prefix.clone();
                next.push((name.clone(), value.clone()));
                next
              })
            })
            .collect();
        }
        combos
      }
    }
  }
}

fn parse_paired(rows: &[Value], benchmark: &str) -> Result<Option<ParameterSet>, SpecError> {
  let ambiguous = |reason: &str| SpecError::AmbiguousParameters {
    benchmark: benchmark.to_string(),
    reason: reason.to_string(),
  };

  let Some((header, body)) = rows.split_first() else {
    return Ok(None);
  };
  let Value::Sequence(header) = header else {
    return Err(ambiguous(concat!(
      "a flat list is neither a paired table nor a value list; ",
      "use `paired:` with a header row, or `name: \"v1,v2\"`"
    )));
  };
  let names = header
    .iter()
    .map(|cell| cell.as_str().map(str::to_string))
    .collect::<Option<Vec<_>>>()
    .ok_or_else(|| ambiguous("the first row of a paired table must list parameter names"))?;

  let mut parsed = Vec::with_capacity(body.len());
  for (index, row) in body.iter().enumerate() {
    let Value::Sequence(cells) = row else {
      return Err(ambiguous("every row after the header must be a sequence"));
    };
    if cells.len() != names.len() {
      return Err(SpecError::RaggedParameterRows {
        benchmark: benchmark.to_string(),
        row: index + 1,
        expected: names.len(),
        found: cells.len(),
      });
    }
    let values = cells
      .iter()
      .map(scalar_to_string)
      .collect::<Option<Vec<_>>>()
      .ok_or_else(|| ambiguous("paired rows may only contain scalar values"))?;
    parsed.push(values);
  }

  Ok(Some(ParameterSet::Paired {
    names,
    rows: parsed,
  }))
}

fn parse_columns(
  map: &serde_yaml::Mapping,
  benchmark: &str,
) -> Result<Vec<(String, Vec<String>)>, SpecError> {
  let ambiguous = |reason: String| SpecError::AmbiguousParameters {
    benchmark: benchmark.to_string(),
    reason,
  };

  let mut columns = Vec::with_capacity(map.len());
  for (key, value) in map {
    let name = scalar_to_string(key)
      .ok_or_else(|| ambiguous("parameter names must be scalars".to_string()))?;
    let values = match value {
      Value::Sequence(items) => items
        .iter()
        .map(scalar_to_string)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ambiguous(format!("values of '{name}' must be scalars")))?,
      other => {
        let joined = scalar_to_string(other).ok_or_else(|| {
          ambiguous(format!(
            "values of '{name}' must be a list or a comma-separated string"
          ))
        })?;
        joined
          .split(',')
          .map(str::trim)
          .filter(|value| !value.is_empty())
          .map(str::to_string)
          .collect()
      }
    };
    columns.push((name, values));
  }
  Ok(columns)
}

/// Renders a YAML scalar as the string it stands for.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Null => Some(String::new()),
    Value::Tagged(tagged) => scalar_to_string(&tagged.value),
    Value::Sequence(_) | Value::Mapping(_) => None,
  }
}

/// One fully bound, executable instance of a benchmark.
#[derive(Debug, Clone, Serialize)]
pub struct Variant {
  pub benchmark: String,
  pub name: String,
  pub params: Assignment,
  pub command: String,
  pub env: BTreeMap<String, String>,
}

/// `bench` + `_<name>_<value>` for every parameter, in declaration order.
pub fn variant_name(benchmark: &str, assignment: &Assignment) -> String {
  let mut name = benchmark.to_string();
  for (param, value) in assignment {
    name.push('_');
    name.push_str(param);
    name.push('_');
    name.push_str(value);
  }
  name
}

/// Expands a resolved benchmark into its ordered variants, rendering the
/// command and environment of each.
pub fn expand(spec: &BenchmarkSpec) -> Result<Vec<Variant>, SpecError> {
  let assignments = match &spec.parameters {
    Some(parameters) => parameters.assignments(),
    None => vec![Vec::new()],
  };

  let mut seen = HashSet::with_capacity(assignments.len());
  let mut variants = Vec::with_capacity(assignments.len());

  for params in assignments {
    let name = variant_name(&spec.name, &params);
    if !seen.insert(name.clone()) {
      return Err(SpecError::VariantNameCollision {
        benchmark: spec.name.clone(),
        variant: name,
      });
    }

    let command = spec.cmd.render(&params, &name)?;
    let env = spec
      .env
      .iter()
      .map(|(key, template)| Ok((key.clone(), template.render(&params, &name)?)))
      .collect::<Result<BTreeMap<_, _>, SpecError>>()?;

    variants.push(Variant {
      benchmark: spec.name.clone(),
      name,
      params,
      command,
      env,
    });
  }

  tracing::debug!(benchmark = %spec.name, count = variants.len(), "Expanded variants");
  Ok(variants)
}
