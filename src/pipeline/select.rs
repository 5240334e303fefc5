use std::cmp::Reverse;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::backlog::BacklogIssue;
use crate::error::Result;

pub const DEFAULT_LIMIT: usize = 10;

const DEFAULT_PRIORITY: &str = "P3";
const DEFAULT_IMPACT: &str = "LOW";
const DEFAULT_ESTIMATE: &str = "M";

/// Ranking inputs of one issue, upper-cased, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rank {
  pub priority: String,
  pub impact: String,
  pub estimate: String,
}

impl Rank {
  /// The `priority`/`impact` fields win over `priority:`/`impact:` labels.
  /// Estimates only come from the `estimate` field.
  pub fn of(issue: &BacklogIssue) -> Self {
    let priority = issue
      .priority
      .clone()
      .or_else(|| label_value(&issue.labels, "priority:"))
      .unwrap_or_else(|| DEFAULT_PRIORITY.into());
    let impact = issue
      .impact
      .clone()
      .or_else(|| label_value(&issue.labels, "impact:"))
      .unwrap_or_else(|| DEFAULT_IMPACT.into());
    let estimate = issue.estimate.clone().unwrap_or_else(|| DEFAULT_ESTIMATE.into());

    Self {
      priority: priority.to_uppercase(),
      impact: impact.to_uppercase(),
      estimate: estimate.to_uppercase(),
    }
  }

  /// Higher priority and impact first, then smaller estimates.
  /// Unknown values score like the defaults.
  fn sort_key(&self) -> (Reverse<u8>, Reverse<u8>, u8) {
    let priority = match self.priority.as_str() {
      "P1" => 3,
      "P2" => 2,
      _ => 1,
    };
    let impact = match self.impact.as_str() {
      "HIGH" => 3,
      "MEDIUM" => 2,
      _ => 1,
    };
    let estimate = match self.estimate.as_str() {
      "XS" => 1,
      "S" => 2,
      "L" => 4,
      "XL" => 5,
      _ => 3,
    };
    (Reverse(priority), Reverse(impact), estimate)
  }
}

fn label_value(labels: &[String], prefix: &str) -> Option<String> {
  labels.iter().find_map(|label| {
    let head = label.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
      Some(label[prefix.len()..].trim().to_string())
    } else {
      None
    }
  })
}

#[derive(Debug, Serialize)]
struct Selection<'a> {
  issues: Vec<&'a BacklogIssue>,
}

/// Returns the `limit` best-ranked issues. Ties keep backlog order.
pub fn select_top(issues: &[BacklogIssue], limit: usize) -> Vec<&BacklogIssue> {
  let mut ranked: Vec<(Rank, &BacklogIssue)> = issues.iter().map(|i| (Rank::of(i), i)).collect();
  ranked.sort_by_key(|(rank, _)| rank.sort_key());

  ranked
    .into_iter()
    .take(limit)
    .map(|(rank, issue)| {
      debug!(
        "selected {} (priority {}, impact {}, estimate {})",
        issue.code, rank.priority, rank.impact, rank.estimate
      );
      issue
    })
    .collect()
}

/// Renders a selection as a backlog document with a top-level `issues` array.
pub fn to_yaml(selected: &[&BacklogIssue]) -> Result<String> {
  let selection = Selection {
    issues: selected.to_vec(),
  };
  Ok(serde_yaml::to_string(&selection)?)
}

pub fn write_selection(path: &Path, selected: &[&BacklogIssue]) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, to_yaml(selected)?)?;
  info!("wrote {} issue(s) to {}", selected.len(), path.display());
  Ok(())
}
