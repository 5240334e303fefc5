use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{BacklogError, Result};
use crate::github::gateway::IssueGateway;
use crate::github::issue::{GithubIssue, IssueState, IssueUpdate};

const USER_AGENT: &str = concat!("backlog-tools/", env!("CARGO_PKG_VERSION"));
const SEARCH_PAGE_SIZE: &str = "30";

pub struct GitHubClient {
  http: reqwest::Client,
  api_url: String,
  owner: String,
  repo: String,
  per_page: u32,
  label_color: String,
  /// Filled on the first `ensure_labels` call, then kept for the life of the client.
  known_labels: Mutex<Option<HashSet<String>>>,
}

#[derive(Deserialize)]
struct SearchResponse {
  items: Vec<RawIssue>,
}

#[derive(Deserialize)]
struct RawIssue {
  number: u64,
  title: String,
  state: IssueState,
  body: Option<String>,
  #[serde(default)]
  labels: Vec<RawLabel>,
  html_url: String,
  pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawLabel {
  name: String,
}

impl From<RawIssue> for GithubIssue {
  fn from(raw: RawIssue) -> Self {
    GithubIssue {
      number: raw.number,
      title: raw.title,
      state: raw.state,
      body: raw.body.unwrap_or_default(),
      labels: raw.labels.into_iter().map(|l| l.name).collect(),
      html_url: raw.html_url,
    }
  }
}

impl GitHubClient {
  pub fn new(config: &Config) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(
      ACCEPT,
      HeaderValue::from_static("application/vnd.github+json"),
    );
    headers.insert(
      "x-github-api-version",
      HeaderValue::from_static("2022-11-28"),
    );
    if let Some(token) = &config.token {
      let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| BacklogError::Config("token contains invalid characters".into()))?;
      value.set_sensitive(true);
      headers.insert(AUTHORIZATION, value);
    }

    let http = reqwest::Client::builder()
      .user_agent(USER_AGENT)
      .default_headers(headers)
      .build()?;

    let (owner, repo) = config.owner_repo();

    Ok(Self {
      http,
      api_url: config.api_url.trim_end_matches('/').to_string(),
      owner: owner.to_string(),
      repo: repo.to_string(),
      per_page: config.per_page,
      label_color: config.label_color().to_string(),
      known_labels: Mutex::new(None),
    })
  }

  fn repo_url(&self, path: &str) -> String {
    format!("{}/repos/{}/{}{path}", self.api_url, self.owner, self.repo)
  }

  async fn send(&self, method: Method, url: &str, request: RequestBuilder) -> Result<Response> {
    debug!("{method} {url}");
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BacklogError::Http {
      method: method.to_string(),
      url: url.to_string(),
      status: status.as_u16(),
      body,
    })
  }

  async fn search(&self, code: &str) -> Result<Vec<RawIssue>> {
    let url = format!("{}/search/issues", self.api_url);
    let query = format!(
      "\"{code}\" in:title repo:{}/{} type:issue",
      self.owner, self.repo
    );
    let request = self
      .http
      .get(&url)
      .query(&[("q", query.as_str()), ("per_page", SEARCH_PAGE_SIZE)]);
    let response = self.send(Method::GET, &url, request).await?;
    let result: SearchResponse = response.json().await?;
    Ok(result.items)
  }

  async fn get_issue(&self, number: u64) -> Result<GithubIssue> {
    let url = self.repo_url(&format!("/issues/{number}"));
    let request = self.http.get(&url);
    let response = self.send(Method::GET, &url, request).await?;
    let raw: RawIssue = response.json().await?;
    Ok(raw.into())
  }

  async fn fetch_labels(&self) -> Result<HashSet<String>> {
    let url = self.repo_url("/labels");
    let per_page = self.per_page.to_string();
    let mut labels = HashSet::new();
    let mut page = 1u32;

    loop {
      let page_str = page.to_string();
      let request = self.http.get(&url).query(&[
        ("per_page", per_page.as_str()),
        ("page", page_str.as_str()),
      ]);
      let response = self.send(Method::GET, &url, request).await?;
      let batch: Vec<RawLabel> = response.json().await?;
      if batch.is_empty() {
        break;
      }
      debug!("labels page {page}: {} label(s)", batch.len());
      labels.extend(batch.into_iter().map(|l| l.name));
      page += 1;
    }

    info!(
      "found {} existing label(s) in {}/{}",
      labels.len(),
      self.owner,
      self.repo
    );
    Ok(labels)
  }

  /// Returns `false` when the label already existed upstream.
  async fn create_label(&self, name: &str) -> Result<bool> {
    let url = self.repo_url("/labels");
    let request = self.http.post(&url).json(&serde_json::json!({
      "name": name,
      "color": self.label_color,
    }));
    match self.send(Method::POST, &url, request).await {
      Ok(_) => Ok(true),
      Err(BacklogError::Http { status, body, .. }) if is_duplicate_label(status, &body) => {
        debug!("label {name} already exists");
        Ok(false)
      }
      Err(e) => Err(e),
    }
  }
}

#[async_trait]
impl IssueGateway for GitHubClient {
  async fn find_issue_by_code(&self, code: &str) -> Result<Option<GithubIssue>> {
    let items = self.search(code).await?;
    let Some(hit) = pick_match(code, &items) else {
      debug!("no issue found for {code}");
      return Ok(None);
    };
    let issue = self.get_issue(hit.number).await?;
    debug!("{code} -> {issue}");
    Ok(Some(issue))
  }

  async fn ensure_labels(&self, labels: &[String]) -> Result<()> {
    if labels.is_empty() {
      return Ok(());
    }

    let mut known = self.known_labels.lock().await;
    if known.is_none() {
      *known = Some(self.fetch_labels().await?);
    }
    let known = known.get_or_insert_with(HashSet::new);

    for label in labels {
      if known.contains(label) {
        continue;
      }
      if self.create_label(label).await? {
        info!("created label {label}");
      }
      known.insert(label.clone());
    }

    Ok(())
  }

  async fn update_issue(&self, number: u64, update: &IssueUpdate) -> Result<()> {
    if update.is_empty() {
      debug!("nothing to update for #{number}");
      return Ok(());
    }

    let url = self.repo_url(&format!("/issues/{number}"));
    let request = self.http.patch(&url).json(update);
    self.send(Method::PATCH, &url, request).await?;
    info!("updated #{number}: {}", update.fields().join(", "));
    Ok(())
  }
}

fn is_duplicate_label(status: u16, body: &str) -> bool {
  status == StatusCode::CONFLICT.as_u16()
    || (status == StatusCode::UNPROCESSABLE_ENTITY.as_u16() && body.contains("already_exists"))
}

/// Prefers a title of the form `CODE: ...` (or exactly `CODE`), then any whole-word mention.
fn pick_match<'a>(code: &str, items: &'a [RawIssue]) -> Option<&'a RawIssue> {
  let candidates: Vec<&RawIssue> = items
    .iter()
    .filter(|i| i.pull_request.is_none())
    .filter(|i| mentions_code(&i.title, code))
    .collect();

  candidates
    .iter()
    .find(|i| is_exact_hit(&i.title, code))
    .or_else(|| candidates.first())
    .copied()
}

fn is_exact_hit(title: &str, code: &str) -> bool {
  let title = title.trim().to_ascii_lowercase();
  let code = code.to_ascii_lowercase();
  title == code || title.starts_with(&format!("{code}:"))
}

/// Case-insensitive whole-word search for `code` in `title`.
fn mentions_code(title: &str, code: &str) -> bool {
  if code.is_empty() {
    return false;
  }
  let haystack = title.to_ascii_lowercase();
  let needle = code.to_ascii_lowercase();
  let bytes = haystack.as_bytes();

  haystack.match_indices(&needle).any(|(start, m)| {
    let end = start + m.len();
    let before_ok = start == 0 || !is_word_byte(bytes[start - 1]);
    let after_ok = end == bytes.len() || !is_word_byte(bytes[end]);
    before_ok && after_ok
  })
}

fn is_word_byte(b: u8) -> bool {
  b.is_ascii_alphanumeric() || b == b'_'
}
