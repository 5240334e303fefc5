use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::github::issue::{GithubIssue, IssueUpdate};

/// Remote issue tracker operations the sync and verify pipelines depend on.
#[async_trait]
pub trait IssueGateway: Send + Sync {
  /// Finds the issue whose title mentions `code` as a whole word.
  async fn find_issue_by_code(&self, code: &str) -> Result<Option<GithubIssue>>;

  /// Creates every label in `labels` that does not exist yet.
  async fn ensure_labels(&self, labels: &[String]) -> Result<()>;

  /// Applies `update` to issue `number`. Empty updates send nothing.
  async fn update_issue(&self, number: u64, update: &IssueUpdate) -> Result<()>;
}

/// Forwards lookups and logs writes instead of sending them.
pub struct ReadOnlyGateway<'a> {
  inner: &'a dyn IssueGateway,
}

impl<'a> ReadOnlyGateway<'a> {
  pub fn new(inner: &'a dyn IssueGateway) -> Self {
    Self { inner }
  }
}

#[async_trait]
impl IssueGateway for ReadOnlyGateway<'_> {
  async fn find_issue_by_code(&self, code: &str) -> Result<Option<GithubIssue>> {
    self.inner.find_issue_by_code(code).await
  }

  async fn ensure_labels(&self, labels: &[String]) -> Result<()> {
    info!("dry run: would ensure {} label(s)", labels.len());
    Ok(())
  }

  async fn update_issue(&self, number: u64, update: &IssueUpdate) -> Result<()> {
    info!("dry run: would update #{number} ({})", update.fields().join(", "));
    Ok(())
  }
}
