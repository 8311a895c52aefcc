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
//! Command templates: `{name}` placeholders substituted with a variant's
//! parameter values.
use crate::error::SpecError;
use regex::RegexBuilder;
use std::collections::BTreeMap;

/// One concrete parameter assignment, in declaration order.
pub type Assignment = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
  Text(String),
  Placeholder(String),
}

/// A parsed command (or environment value) template.
///
/// Template text is whitespace-normalised at parse time so that folded YAML
/// commands spanning several lines render as a single shell line. Values are
/// substituted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
  source: String,
  tokens: Vec<Token>,
}

impl CommandTemplate {
  pub fn parse(template: &str) -> Result<Self, SpecError> {
    let normalised = template.split_whitespace().collect::<Vec<_>>().join(" ");
    Self::parse_exact(&normalised)
  }

  fn parse_exact(template: &str) -> Result<Self, SpecError> {
    let malformed = |reason: &str| SpecError::MalformedTemplate {
      template: template.to_string(),
      reason: reason.to_string(),
    };

    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
      match c {
        '{' if chars.peek() == Some(&'{') => {
          chars.next();
          text.push('{');
        }
        '}' if chars.peek() == Some(&'}') => {
          chars.next();
          text.push('}');
        }
        '{' => {
          let mut name = String::new();
          loop {
            match chars.next() {
              Some('}') => break,
              Some('{') => return Err(malformed("nested '{' inside a placeholder")),
              Some(c) => name.push(c),
              None => return Err(malformed("unterminated '{'")),
            }
          }
          let name = name.trim();
          if name.is_empty() {
            return Err(malformed("empty placeholder '{}'"));
          }
          if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(&mut text)));
          }
          tokens.push(Token::Placeholder(name.to_string()));
        }
        '}' => return Err(malformed("single '}' outside a placeholder")),
        c => text.push(c),
      }
    }
    if !text.is_empty() {
      tokens.push(Token::Text(text));
    }

    Ok(Self {
      source: template.to_string(),
      tokens,
    })
  }

  /// Parses an environment value. Only `{name}` where `name` is one of
  /// `params` becomes a placeholder; every other brace is kept verbatim, so
  /// JSON values pass through untouched.
  pub fn parse_env(value: &str, params: &[&str]) -> Self {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut rest = value;

    while let Some(open) = rest.find('{') {
      text.push_str(&rest[..open]);
      let after = &rest[open + 1..];
      match after.find('}') {
        Some(close) if params.contains(&after[..close].trim()) => {
          if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(&mut text)));
          }
          tokens.push(Token::Placeholder(after[..close].trim().to_string()));
          rest = &after[close + 1..];
        }
        _ => {
          text.push('{');
          rest = after;
        }
      }
    }
    text.push_str(rest);
    if !text.is_empty() {
      tokens.push(Token::Text(text));
    }

    Self {
      source: value.to_string(),
      tokens,
    }
  }

  pub fn as_str(&self) -> &str {
    &self.source
  }

  pub fn tokens(&self) -> &[Token] {
    &self.tokens
  }

  /// Placeholder names in order of first appearance.
  pub fn placeholders(&self) -> Vec<&str> {
    let mut seen = Vec::new();
    for token in &self.tokens {
      if let Token::Placeholder(name) = token {
        if !seen.contains(&name.as_str()) {
          seen.push(name.as_str());
        }
      }
    }
    seen
  }

  /// Substitutes every placeholder. `variant` only names the variant in the
  /// error.
  pub fn render(&self, assignment: &Assignment, variant: &str) -> Result<String, SpecError> {
    let mut out = String::with_capacity(self.source.len());
    for token in &self.tokens {
      match token {
        Token::Text(text) => out.push_str(text),
        Token::Placeholder(name) => {
          let value = assignment
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
            .ok_or_else(|| SpecError::UnboundPlaceholder {
              variant: variant.to_string(),
              placeholder: name.clone(),
            })?;
          out.push_str(value);
        }
      }
    }
    Ok(out)
  }

  /// Matches a rendered string back against this template and returns the
  /// placeholder values, or `None` if it cannot have come from this template.
  pub fn recover(&self, rendered: &str) -> Option<BTreeMap<String, String>> {
    let mut pattern = String::from("^");
    let mut order: Vec<&str> = Vec::new();

    for token in &self.tokens {
      match token {
        Token::Text(text) => pattern.push_str(&regex::escape(text)),
        Token::Placeholder(name) => {
          order.push(name.as_str());
          pattern.push_str("(.*?)");
        }
      }
    }
    pattern.push('$');

    let re = RegexBuilder::new(&pattern)
      .dot_matches_new_line(true)
      .build()
      .ok()?;
    let caps = re.captures(rendered)?;

    let mut values = BTreeMap::new();
    for (index, name) in order.iter().enumerate() {
      let value = caps.get(index + 1).map(|m| m.as_str()).unwrap_or_default();
      match values.get(*name) {
        Some(existing) if existing != value => return None,
        Some(_) => {}
        None => {
          values.insert((*name).to_string(), value.to_string());
        }
      }
    }
    Some(values)
  }
}
