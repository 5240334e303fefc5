use std::path::PathBuf;

use crate::error::{BacklogError, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_BACKLOG_PATH: &str = "docs/backlog/issues.yaml";
pub const DEFAULT_PER_PAGE: u32 = 100;
pub const DEFAULT_LABEL_COLOR: &str = "ededed";

#[derive(Debug, Clone)]
pub struct Config {
  pub repo: String,
  pub token: Option<String>,
  pub backlog_path: PathBuf,
  pub api_url: String,
  pub per_page: u32,
  pub label_color: String,
}

impl Config {
  pub fn new(repo: impl Into<String>) -> Self {
    Self {
      repo: repo.into(),
      token: None,
      backlog_path: PathBuf::from(DEFAULT_BACKLOG_PATH),
      api_url: DEFAULT_API_URL.to_string(),
      per_page: DEFAULT_PER_PAGE,
      label_color: DEFAULT_LABEL_COLOR.to_string(),
    }
  }

  pub fn validate(&self) -> Result<()> {
    match self.repo.split_once('/') {
      Some((owner, name)) if !owner.trim().is_empty() && !name.trim().is_empty() => {
        if name.contains('/') {
          return Err(BacklogError::Config(format!(
            "repository must be in owner/repo format: {}",
            self.repo
          )));
        }
      }
      _ => {
        return Err(BacklogError::Config(format!(
          "repository must be in owner/repo format: {}",
          self.repo
        )));
      }
    }

    if self.per_page == 0 || self.per_page > 100 {
      return Err(BacklogError::Config(format!(
        "labels page size must be between 1 and 100: {}",
        self.per_page
      )));
    }

    let color = self.label_color.trim_start_matches('#');
    if color.len() != 6 || !color.chars().all(|c| c.is_ascii_hexdigit()) {
      return Err(BacklogError::Config(format!(
        "label color must be six hex digits: {}",
        self.label_color
      )));
    }

    if self.api_url.trim().is_empty() {
      return Err(BacklogError::Config("api url must not be empty".into()));
    }

    Ok(())
  }

  /// Splits `owner/repo`. Only meaningful after `validate` succeeded.
  pub fn owner_repo(&self) -> (&str, &str) {
    self.repo.split_once('/').unwrap_or((self.repo.as_str(), ""))
  }

  pub fn label_color(&self) -> &str {
    self.label_color.trim_start_matches('#')
  }
}
