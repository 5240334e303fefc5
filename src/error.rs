use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BacklogError {
  #[error("config error: {0}")]
  Config(String),

  #[error("invalid backlog: {0}")]
  Validation(String),

  #[error("backlog file not found: {0}")]
  BacklogNotFound(PathBuf),

  #[error("{method} {url} failed with status {status}: {body}")]
  Http {
    method: String,
    url: String,
    status: u16,
    body: String,
  },

  #[error("request error: {0}")]
  Request(#[from] reqwest::Error),

  #[error("cancelled")]
  Cancelled,

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("yaml error: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BacklogError>;
