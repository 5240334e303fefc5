use serde::Serialize;
use tracing::{debug, warn};

use crate::backlog::BacklogIssue;
use crate::error::Result;
use crate::github::IssueGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
  NotFound,
  StillOpen,
}

impl std::fmt::Display for MismatchReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      MismatchReason::NotFound => write!(f, "Issue not found on GitHub"),
      MismatchReason::StillOpen => write!(f, "Issue still open on GitHub"),
    }
  }
}

/// JSON output carries the same sentence as the text report.
impl Serialize for MismatchReason {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Mismatch {
  pub code: String,
  pub title: String,
  pub reason: MismatchReason,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub issue_url: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct VerifySummary {
  pub checked: usize,
  pub mismatches: Vec<Mismatch>,
}

impl std::fmt::Display for VerifySummary {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "checked={}, mismatches={}",
      self.checked,
      self.mismatches.len()
    )
  }
}

/// Checks that every DoD-complete backlog issue is closed on GitHub.
/// Incomplete issues are skipped without a lookup.
pub async fn verify_backlog(issues: &[BacklogIssue], gateway: &dyn IssueGateway) -> Result<VerifySummary> {
  let mut summary = VerifySummary::default();

  for issue in issues.iter().filter(|i| i.dod_complete()) {
    summary.checked += 1;

    match gateway.find_issue_by_code(&issue.code).await? {
      None => {
        warn!("{} is done but has no issue on GitHub", issue.code);
        summary.mismatches.push(Mismatch {
          code: issue.code.clone(),
          title: issue.title.clone(),
          reason: MismatchReason::NotFound,
          issue_url: None,
        });
      }
      Some(remote) if !remote.is_closed() => {
        warn!("{} is done but #{} is still open", issue.code, remote.number);
        summary.mismatches.push(Mismatch {
          code: issue.code.clone(),
          title: issue.title.clone(),
          reason: MismatchReason::StillOpen,
          issue_url: Some(remote.html_url),
        });
      }
      Some(remote) => debug!("{} verified closed as #{}", issue.code, remote.number),
    }
  }

  Ok(summary)
}
