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
//! Metric extraction: regex matches over captured output reduced to one
//! scalar per metric.
use crate::error::ExtractionError;
use regex::Regex;
use regex::RegexBuilder;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// How the surviving matches of a metric collapse into one scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
  #[default]
  Mean,
  Final,
  Min,
  Value,
}

/// One entry of a benchmark's `data` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
  pub regexp: String,
  /// Leading matches dropped before reduction (warm-up iterations).
  #[serde(default)]
  pub skip: usize,
  #[serde(default)]
  pub reduction_type: Reduction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
  Number(f64),
  Text(String),
}

impl Scalar {
  fn from_match(text: &str) -> Self {
    match parse_number(text) {
      Some(n) => Scalar::Number(n),
      None => Scalar::Text(text.to_string()),
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Scalar::Number(n) => Some(*n),
      Scalar::Text(_) => None,
    }
  }
}

impl fmt::Display for Scalar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Scalar::Number(n) => write!(f, "{n}"),
      Scalar::Text(t) => f.write_str(t),
    }
  }
}

/// The recorded outcome of one metric for one variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
  Found(Scalar),
  NotFound,
  Failed(String),
}

impl MetricValue {
  pub fn scalar(&self) -> Option<&Scalar> {
    match self {
      MetricValue::Found(scalar) => Some(scalar),
      _ => None,
    }
  }
}

/// A named metric with its compiled pattern.
#[derive(Debug, Clone)]
pub struct Metric {
  pub name: String,
  pub definition: MetricDefinition,
  pattern: Regex,
}

impl Metric {
  /// Compiles the definition's regexp in multi-line mode so `^`/`$` anchor at
  /// line boundaries of the captured log.
  pub fn compile(name: &str, definition: MetricDefinition) -> Result<Self, regex::Error> {
    let pattern = RegexBuilder::new(&definition.regexp)
      .multi_line(true)
      .build()?;
    Ok(Self {
      name: name.to_string(),
      definition,
      pattern,
    })
  }

  /// All non-overlapping matches in order of occurrence. A match contributes
  /// its first capture group if the pattern has one, else the whole match.
  pub fn matches<'t>(&self, text: &'t str) -> Vec<&'t str> {
    if self.pattern.captures_len() > 1 {
      self
        .pattern
        .captures_iter(text)
        .filter_map(|caps| {
          caps
            .iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str())
        })
        .collect()
    } else {
      self.pattern.find_iter(text).map(|m| m.as_str()).collect()
    }
  }

  /// Extracts the metric from a single block of text.
  pub fn extract(&self, text: &str) -> Result<Option<Scalar>, ExtractionError> {
    reduce(
      &self.matches(text),
      self.definition.skip,
      self.definition.reduction_type,
    )
  }

  /// Evaluates the metric over a variant's stdout followed by its stderr.
  pub fn evaluate(&self, stdout: &str, stderr: &str) -> MetricValue {
    let mut found = self.matches(stdout);
    found.extend(self.matches(stderr));

    match reduce(&found, self.definition.skip, self.definition.reduction_type) {
      Ok(Some(scalar)) => MetricValue::Found(scalar),
      Ok(None) => MetricValue::NotFound,
      Err(e) => MetricValue::Failed(e.to_string()),
    }
  }
}

/// Discards the first `skip` matches and reduces the rest.
///
/// `Ok(None)` means nothing survived the skip, which callers record as
/// "not found". `Value` is the exception: it needs exactly one survivor.
pub fn reduce(
  matches: &[&str],
  skip: usize,
  reduction: Reduction,
) -> Result<Option<Scalar>, ExtractionError> {
  let surviving = matches.get(skip..).unwrap_or_default();

  match reduction {
    Reduction::Value => match surviving {
      [only] => Ok(Some(Scalar::from_match(only))),
      _ => Err(ExtractionError::UnexpectedMatchCount {
        found: surviving.len(),
      }),
    },
    _ if surviving.is_empty() => Ok(None),
    Reduction::Final => Ok(surviving.last().map(|last| Scalar::from_match(last))),
    Reduction::Mean => {
      let numbers = numeric(surviving)?;
      let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
      Ok(Some(Scalar::Number(mean)))
    }
    Reduction::Min => {
      let numbers = numeric(surviving)?;
      let min = numbers.into_iter().fold(f64::INFINITY, f64::min);
      Ok(Some(Scalar::Number(min)))
    }
  }
}

fn numeric(matches: &[&str]) -> Result<Vec<f64>, ExtractionError> {
  matches
    .iter()
    .map(|text| {
      parse_number(text).ok_or_else(|| ExtractionError::NonNumericMatch {
        text: text.to_string(),
      })
    })
    .collect()
}

fn parse_number(text: &str) -> Option<f64> {
  text.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn metric(regexp: &str, skip: usize, reduction_type: Reduction) -> Metric {
    Metric::compile(
      "throughput",
      MetricDefinition {
        regexp: regexp.to_string(),
        skip,
        reduction_type,
      },
    )
    .unwrap()
  }

  const LOG: &str = "epoch 0 throughput: 5\nepoch 1 throughput: 7\nepoch 2 throughput: 9\n";

  #[test]
  fn reductions_after_skip() {
    let regexp = r"throughput: (\d+)";
    assert_eq!(
      metric(regexp, 1, Reduction::Mean).extract(LOG).unwrap(),
      Some(Scalar::Number(8.0))
    );
    assert_eq!(
      metric(regexp, 1, Reduction::Final).extract(LOG).unwrap(),
      Some(Scalar::Number(9.0))
    );
    assert_eq!(
      metric(regexp, 1, Reduction::Min).extract(LOG).unwrap(),
      Some(Scalar::Number(7.0))
    );
  }

  #[test]
  fn value_requires_exactly_one_match() {
    let m = metric(r"throughput: (\d+)", 0, Reduction::Value);
    assert_eq!(
      m.extract(LOG),
      Err(ExtractionError::UnexpectedMatchCount { found: 3 })
    );
    assert_eq!(
      m.extract("nothing here"),
      Err(ExtractionError::UnexpectedMatchCount { found: 0 })
    );

    let single = metric(r"model: (\w+)", 0, Reduction::Value);
    assert_eq!(
      single.extract("model: bert\n").unwrap(),
      Some(Scalar::Text("bert".to_string()))
    );
  }

  #[test]
  fn skipping_everything_is_not_found() {
    let m = metric(r"throughput: (\d+)", 3, Reduction::Mean);
    assert_eq!(m.extract(LOG).unwrap(), None);
    assert_eq!(m.evaluate(LOG, ""), MetricValue::NotFound);
  }

  #[test]
  fn pattern_without_group_uses_whole_match() {
    let m = metric(r"\d+\.\d+", 0, Reduction::Min);
    assert_eq!(
      m.extract("a 3.5 b 1.25 c 2.0").unwrap(),
      Some(Scalar::Number(1.25))
    );
  }

  #[test]
  fn mean_rejects_non_numeric_matches() {
    let m = metric(r"status: (\w+)", 0, Reduction::Mean);
    assert!(matches!(
      m.extract("status: ok"),
      Err(ExtractionError::NonNumericMatch { .. })
    ));
  }

  #[test]
  fn stdout_matches_precede_stderr_matches() {
    let m = metric(r"latency: (\d+)", 0, Reduction::Final);
    let value = m.evaluate("latency: 1\n", "latency: 2\n");
    assert_eq!(value, MetricValue::Found(Scalar::Number(2.0)));
  }

  #[test]
  fn anchors_apply_per_line() {
    let m = metric(r"^loss (\S+)$", 0, Reduction::Final);
    assert_eq!(
      m.extract("step 1\nloss 0.5\nstep 2\nloss 0.25\n").unwrap(),
      Some(Scalar::Number(0.25))
    );
  }

  #[test]
  fn failed_extraction_is_recorded_not_raised() {
    let m = metric(r"throughput: (\d+)", 0, Reduction::Value);
    assert!(matches!(m.evaluate(LOG, ""), MetricValue::Failed(_)));
  }

  #[test]
  fn definition_defaults() {
    let def: MetricDefinition = serde_yaml::from_str("regexp: 'x (\\d+)'").unwrap();
    assert_eq!(def.skip, 0);
    assert_eq!(def.reduction_type, Reduction::Mean);
  }
}
