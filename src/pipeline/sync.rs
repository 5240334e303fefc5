use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backlog::issue::{label_set, normalize_line_endings};
use crate::backlog::BacklogIssue;
use crate::error::Result;
use crate::github::{GithubIssue, IssueGateway, IssueUpdate};

#[derive(Debug, Default, Serialize)]
pub struct SyncSummary {
  pub updated: usize,
  pub unchanged: usize,
  pub missing: Vec<BacklogIssue>,
  pub changes: Vec<IssueChange>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IssueChange {
  pub code: String,
  pub number: u64,
  pub fields: Vec<&'static str>,
}

impl std::fmt::Display for SyncSummary {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "updated={}, unchanged={}, missing={}",
      self.updated,
      self.unchanged,
      self.missing.len()
    )
  }
}

/// Reconciles `issues` with their remote counterparts.
///
/// Labels are ensured once, up front, for the whole batch. Each issue is then
/// looked up by code and patched with only the fields that drifted. Issues
/// without a remote counterpart are returned in `missing`; they are never
/// created. The first gateway error aborts the run.
pub async fn sync_backlog(issues: &[BacklogIssue], gateway: &dyn IssueGateway) -> Result<SyncSummary> {
  let all_labels: Vec<String> = issues
    .iter()
    .flat_map(|i| i.labels.iter().cloned())
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect();
  gateway.ensure_labels(&all_labels).await?;

  let mut summary = SyncSummary::default();

  for issue in issues {
    let Some(remote) = gateway.find_issue_by_code(&issue.code).await? else {
      warn!("{} has no matching issue on GitHub", issue.code);
      summary.missing.push(issue.clone());
      continue;
    };

    let update = diff(issue, &remote);
    if update.is_empty() {
      debug!("{} is in sync with #{}", issue.code, remote.number);
      summary.unchanged += 1;
      continue;
    }

    let fields = update.fields();
    info!("{} drifted from #{}: {}", issue.code, remote.number, fields.join(", "));
    gateway.update_issue(remote.number, &update).await?;
    summary.updated += 1;
    summary.changes.push(IssueChange {
      code: issue.code.clone(),
      number: remote.number,
      fields,
    });
  }

  Ok(summary)
}

/// Fields of `local` that differ from `remote`, as a partial update.
pub fn diff(local: &BacklogIssue, remote: &GithubIssue) -> IssueUpdate {
  let mut update = IssueUpdate::default();

  if local.title != remote.title {
    update.title = Some(local.title.clone());
  }

  let local_body = normalize_line_endings(&local.body);
  if local_body != normalize_line_endings(&remote.body) {
    update.body = Some(local_body);
  }

  let local_labels = local.label_set();
  if local_labels != label_set(&remote.labels) {
    update.labels = Some(local_labels);
  }

  update
}
