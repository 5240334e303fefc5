use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BacklogIssue {
  pub code: String,
  pub title: String,
  pub body: String,
  pub labels: Vec<String>,
  pub assignees: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub milestone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub impact: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub estimate: Option<String>,
}

impl BacklogIssue {
  /// Definition of Done: every checklist item in the body is checked.
  pub fn dod_complete(&self) -> bool {
    checklist_complete(&self.body)
  }

  /// Labels sorted and deduplicated, the form compared against remote issues.
  pub fn label_set(&self) -> Vec<String> {
    label_set(&self.labels)
  }
}

impl std::fmt::Display for BacklogIssue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{}] {}", self.code, self.title)
  }
}

static CHECKBOX_RE: OnceLock<Regex> = OnceLock::new();

fn checkbox_re() -> &'static Regex {
  CHECKBOX_RE
    .get_or_init(|| Regex::new(r"-[ \t]*\[([ xX])\]").expect("checkbox pattern is valid"))
}

/// True iff `body` has at least one `- [ ]`/`- [x]` marker and all of them are checked.
/// A body without markers is never complete.
pub fn checklist_complete(body: &str) -> bool {
  let mut seen = 0usize;
  for cap in checkbox_re().captures_iter(body) {
    seen += 1;
    if !cap[1].eq_ignore_ascii_case("x") {
      return false;
    }
  }
  seen > 0
}

pub fn normalize_line_endings(text: &str) -> String {
  text.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn label_set(labels: &[String]) -> Vec<String> {
  let mut set: Vec<String> = labels.to_vec();
  set.sort();
  set.dedup();
  set
}
