use std::collections::HashMap;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::backlog::issue::{normalize_line_endings, BacklogIssue};
use crate::error::{BacklogError, Result};

pub fn load(path: &Path) -> Result<Vec<BacklogIssue>> {
  if !path.exists() {
    return Err(BacklogError::BacklogNotFound(path.to_path_buf()));
  }
  let content = std::fs::read_to_string(path)?;
  let issues = parse(&content)?;
  info!("loaded {} backlog issue(s) from {}", issues.len(), path.display());
  Ok(issues)
}

pub fn parse(document: &str) -> Result<Vec<BacklogIssue>> {
  let root: Value = serde_yaml::from_str(document)?;

  let entries = root
    .get("issues")
    .and_then(Value::as_sequence)
    .ok_or_else(|| invalid("backlog document must contain an `issues` array"))?;

  let mut issues = Vec::with_capacity(entries.len());
  let mut seen_codes: HashMap<String, usize> = HashMap::new();

  for (index, entry) in entries.iter().enumerate() {
    let map = entry
      .as_mapping()
      .ok_or_else(|| invalid(format!("issues[{index}] must be an object")))?;

    let issue = parse_issue(index, map)?;

    if let Some(first) = seen_codes.insert(issue.code.to_lowercase(), index) {
      warn!(
        "issues[{index}] shares code `{}` with issues[{first}], lookups will match the same GitHub issue",
        issue.code
      );
    }

    debug!("parsed {issue}");
    issues.push(issue);
  }

  Ok(issues)
}

fn parse_issue(index: usize, map: &Mapping) -> Result<BacklogIssue> {
  let title = match map.get("title") {
    Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
    _ => {
      return Err(invalid(format!(
        "issues[{index}].title is required and must be a non-empty string"
      )))
    }
  };

  let body = match map.get("body") {
    Some(Value::String(s)) => normalize_line_endings(s),
    _ => {
      return Err(invalid(format!(
        "issues[{index}].body is required and must be a string"
      )))
    }
  };

  let labels = string_list(index, map, "labels")?;
  let assignees = string_list(index, map, "assignees")?;

  let milestone = match map.get("milestone") {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
    Some(_) => {
      return Err(invalid(format!(
        "issues[{index}].milestone must be a non-empty string"
      )))
    }
  };

  let explicit_code = match map.get("code") {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) => Some(s.trim().to_string()).filter(|c| !c.is_empty()),
    Some(_) => {
      return Err(invalid(format!("issues[{index}].code must be a string")));
    }
  };

  let code = explicit_code
    .or_else(|| code_from_title(&title))
    .ok_or_else(|| {
      invalid(format!(
        "issues[{index}] has no code and none can be derived from title `{title}`"
      ))
    })?;

  Ok(BacklogIssue {
    code,
    title,
    body,
    labels,
    assignees,
    milestone,
    priority: ranking_field(map, "priority"),
    impact: ranking_field(map, "impact"),
    estimate: ranking_field(map, "estimate"),
  })
}

/// Ranking hints are advisory: anything other than a non-blank string is ignored.
fn ranking_field(map: &Mapping, field: &str) -> Option<String> {
  map
    .get(field)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

/// `WEB-01: Login page` -> `WEB-01`. Titles without a colon yield nothing.
fn code_from_title(title: &str) -> Option<String> {
  let (prefix, _) = title.split_once(':')?;
  let prefix = prefix.trim();
  if prefix.is_empty() {
    None
  } else {
    Some(prefix.to_string())
  }
}

fn string_list(index: usize, map: &Mapping, field: &str) -> Result<Vec<String>> {
  let items = match map.get(field) {
    None | Some(Value::Null) => return Ok(Vec::new()),
    Some(Value::Sequence(items)) => items,
    Some(_) => {
      return Err(invalid(format!(
        "issues[{index}].{field} must be an array of strings"
      )))
    }
  };

  let mut values = Vec::with_capacity(items.len());
  for (i, item) in items.iter().enumerate() {
    let s = item.as_str().ok_or_else(|| {
      invalid(format!("issues[{index}].{field}[{i}] must be a string"))
    })?;
    let s = s.trim();
    if !s.is_empty() {
      values.push(s.to_string());
    }
  }
  Ok(values)
}

fn invalid(message: impl Into<String>) -> BacklogError {
  BacklogError::Validation(message.into())
}
