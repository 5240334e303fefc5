use std::fmt::Write;

use serde::Serialize;

use crate::backlog::BacklogIssue;
use crate::error::Result;
use crate::pipeline::sync::SyncSummary;
use crate::pipeline::verify::VerifySummary;

#[derive(Debug, Serialize)]
pub struct CheckSummary {
  pub issues: usize,
  pub dod_complete: usize,
  pub codes: Vec<String>,
}

impl CheckSummary {
  pub fn from_issues(issues: &[BacklogIssue]) -> Self {
    Self {
      issues: issues.len(),
      dod_complete: issues.iter().filter(|i| i.dod_complete()).count(),
      codes: issues.iter().map(|i| i.code.clone()).collect(),
    }
  }
}

pub fn to_json<T: Serialize>(summary: &T) -> Result<String> {
  Ok(serde_json::to_string_pretty(summary)?)
}

pub fn render_sync(summary: &SyncSummary, dry_run: bool) -> String {
  let mut out = String::new();
  let heading = if dry_run { "Backlog sync (dry run)" } else { "Backlog sync" };
  let _ = writeln!(out, "{heading}");
  let _ = writeln!(out, "{}", "=".repeat(heading.len()));
  let _ = writeln!(out, "Updated:   {}", summary.updated);
  let _ = writeln!(out, "Unchanged: {}", summary.unchanged);
  let _ = writeln!(out, "Missing:   {}", summary.missing.len());

  if !summary.changes.is_empty() {
    let _ = writeln!(out);
    for change in &summary.changes {
      let _ = writeln!(
        out,
        "  ~ {} (#{}): {}",
        change.code,
        change.number,
        change.fields.join(", ")
      );
    }
  }

  if !summary.missing.is_empty() {
    let _ = writeln!(out);
    let _ = writeln!(out, "Not found on GitHub:");
    for issue in &summary.missing {
      let _ = writeln!(out, "  - {issue}");
    }
  }

  out
}

pub fn render_verify(summary: &VerifySummary) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "Backlog verify");
  let _ = writeln!(out, "==============");
  let _ = writeln!(out, "Checked:    {}", summary.checked);
  let _ = writeln!(out, "Mismatches: {}", summary.mismatches.len());

  for mismatch in &summary.mismatches {
    let url = mismatch
      .issue_url
      .as_ref()
      .map(|u| format!(" ({u})"))
      .unwrap_or_default();
    let _ = writeln!(
      out,
      "  ! [{}] {}: {}{url}",
      mismatch.code, mismatch.title, mismatch.reason
    );
  }

  out
}

pub fn render_check(summary: &CheckSummary) -> String {
  format!(
    "Backlog OK: {} issue(s), {} with Definition of Done complete\n",
    summary.issues, summary.dod_complete
  )
}
