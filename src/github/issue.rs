use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
  Open,
  Closed,
}

/// A remote issue as last fetched. Never cached across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct GithubIssue {
  pub number: u64,
  pub title: String,
  pub state: IssueState,
  pub body: String,
  pub labels: Vec<String>,
  pub html_url: String,
}

impl GithubIssue {
  pub fn is_closed(&self) -> bool {
    self.state == IssueState::Closed
  }
}

impl std::fmt::Display for GithubIssue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}: {}", self.number, self.title)
  }
}

/// Partial issue update. Only the fields that are `Some` are sent.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct IssueUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub body: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub labels: Option<Vec<String>>,
}

impl IssueUpdate {
  pub fn is_empty(&self) -> bool {
    self.title.is_none() && self.body.is_none() && self.labels.is_none()
  }

  pub fn fields(&self) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if self.title.is_some() {
      fields.push("title");
    }
    if self.body.is_some() {
      fields.push("body");
    }
    if self.labels.is_some() {
      fields.push("labels");
    }
    fields
  }
}
