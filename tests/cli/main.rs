use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use mockito::{Matcher, Server, ServerGuard};
use predicates::prelude::*;
use serde_json::json;
use tempfile::NamedTempFile;

const BACKLOG: &str = r#"
issues:
  - code: SYNC-01
    title: "SYNC-01: Reconcile labels"
    body: "line1\n- [x] done"
    labels: ["priority:P1", "area:web"]
  - title: "WEB-02: Login page"
    body: "- [ ] form"
"#;

fn backlog_file(content: &str) -> NamedTempFile {
  let mut file = NamedTempFile::new().unwrap();
  file.write_all(content.as_bytes()).unwrap();
  file
}

fn backlog_tools(api_url: &str, backlog: &Path) -> Command {
  let mut cmd = Command::cargo_bin("backlog-tools").unwrap();
  cmd
    .env_remove("GITHUB_TOKEN")
    .env_remove("GH_TOKEN")
    .env_remove("BACKLOG_ALLOW_MISSING")
    .env("RUST_LOG", "info")
    .env("GITHUB_REPOSITORY", "owner/repo")
    .env("GITHUB_API_URL", api_url)
    .env("BACKLOG_PATH", backlog);
  cmd
}

fn issue_json(number: u64, title: &str, state: &str, body: &str, labels: &[&str]) -> serde_json::Value {
  json!({
    "number": number,
    "title": title,
    "state": state,
    "body": body,
    "labels": labels.iter().map(|l| json!({ "name": l })).collect::<Vec<_>>(),
    "html_url": format!("https://github.com/owner/repo/issues/{number}"),
  })
}

fn mock_labels(server: &mut ServerGuard, existing: &[&str]) {
  let page1: Vec<_> = existing.iter().map(|l| json!({ "name": l })).collect();
  server
    .mock("GET", "/repos/owner/repo/labels")
    .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
    .with_status(200)
    .with_body(json!(page1).to_string())
    .create();
  server
    .mock("GET", "/repos/owner/repo/labels")
    .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
    .with_status(200)
    .with_body("[]")
    .create();
}

fn mock_search(server: &mut ServerGuard, code: &str, items: Vec<serde_json::Value>) {
  server
    .mock("GET", "/search/issues")
    .match_query(Matcher::UrlEncoded(
      "q".into(),
      format!("\"{code}\" in:title repo:owner/repo type:issue"),
    ))
    .with_status(200)
    .with_body(json!({ "items": items }).to_string())
    .create();
}

fn mock_issue(server: &mut ServerGuard, issue: &serde_json::Value) {
  let number = issue["number"].as_u64().unwrap();
  server
    .mock("GET", format!("/repos/owner/repo/issues/{number}").as_str())
    .with_status(200)
    .with_body(issue.to_string())
    .create();
}

#[test]
fn check_reports_issue_counts_without_network() {
  let backlog = backlog_file(BACKLOG);
  Command::cargo_bin("backlog-tools")
    .unwrap()
    .env_remove("GITHUB_REPOSITORY")
    .args(["check", "--backlog"])
    .arg(backlog.path())
    .assert()
    .success()
    .stdout(predicate::str::contains(
      "Backlog OK: 2 issue(s), 1 with Definition of Done complete",
    ));
}

#[test]
fn check_rejects_invalid_backlog() {
  let backlog = backlog_file("issues:\n  - title: ''\n    body: x\n");
  Command::cargo_bin("backlog-tools")
    .unwrap()
    .args(["check", "--backlog"])
    .arg(backlog.path())
    .assert()
    .code(1)
    .stderr(predicate::str::contains("issues[0].title"));
}

#[test]
fn sync_requires_repository() {
  let backlog = backlog_file(BACKLOG);
  backlog_tools("http://127.0.0.1:9", backlog.path())
    .env_remove("GITHUB_REPOSITORY")
    .arg("sync")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("GITHUB_REPOSITORY"));
}

#[test]
fn sync_patches_drifted_issue_and_fails_on_missing() {
  let mut server = Server::new();
  mock_labels(&mut server, &["priority:P1"]);
  let create = server
    .mock("POST", "/repos/owner/repo/labels")
    .match_body(Matcher::PartialJson(json!({ "name": "area:web" })))
    .with_status(201)
    .with_body("{}")
    .expect(1)
    .create();

  let remote = issue_json(
    12,
    "SYNC-01: Reconcile labels",
    "open",
    "line1\n- [ ] todo",
    &["priority:P1"],
  );
  mock_search(&mut server, "SYNC-01", vec![remote.clone()]);
  mock_issue(&mut server, &remote);
  mock_search(&mut server, "WEB-02", vec![]);

  let patch = server
    .mock("PATCH", "/repos/owner/repo/issues/12")
    .match_body(Matcher::Json(json!({
      "body": "line1\n- [x] done",
      "labels": ["area:web", "priority:P1"],
    })))
    .with_status(200)
    .with_body(remote.to_string())
    .expect(1)
    .create();

  let backlog = backlog_file(BACKLOG);
  backlog_tools(&server.url(), backlog.path())
    .arg("sync")
    .assert()
    .code(1)
    .stdout(predicate::str::contains("Updated:   1"))
    .stdout(predicate::str::contains("  ~ SYNC-01 (#12): body, labels"))
    .stdout(predicate::str::contains("  - [WEB-02] WEB-02: Login page"))
    .stderr(predicate::str::contains("missing on GitHub"));

  create.assert();
  patch.assert();
}

#[test]
fn sync_allow_missing_succeeds() {
  let mut server = Server::new();
  mock_labels(&mut server, &["priority:P1", "area:web"]);
  let remote = issue_json(
    12,
    "SYNC-01: Reconcile labels",
    "open",
    "line1\n- [x] done",
    &["area:web", "priority:P1"],
  );
  mock_search(&mut server, "SYNC-01", vec![remote.clone()]);
  mock_issue(&mut server, &remote);
  mock_search(&mut server, "WEB-02", vec![]);
  let patch = server.mock("PATCH", Matcher::Any).expect(0).create();

  let backlog = backlog_file(BACKLOG);
  backlog_tools(&server.url(), backlog.path())
    .env("BACKLOG_ALLOW_MISSING", "true")
    .args(["sync", "--json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"unchanged\": 1"))
    .stdout(predicate::str::contains("\"updated\": 0"));

  patch.assert();
}

#[test]
fn sync_dry_run_sends_no_writes() {
  let mut server = Server::new();
  let labels = server
    .mock("GET", "/repos/owner/repo/labels")
    .match_query(Matcher::Any)
    .expect(0)
    .create();
  let create = server.mock("POST", Matcher::Any).expect(0).create();
  let patch = server.mock("PATCH", Matcher::Any).expect(0).create();

  let remote = issue_json(12, "SYNC-01: Reconcile labels", "open", "old", &[]);
  mock_search(&mut server, "SYNC-01", vec![remote.clone()]);
  mock_issue(&mut server, &remote);
  mock_search(&mut server, "WEB-02", vec![]);

  let backlog = backlog_file(BACKLOG);
  backlog_tools(&server.url(), backlog.path())
    .args(["sync", "--dry-run", "--allow-missing"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Backlog sync (dry run)"))
    .stdout(predicate::str::contains("  ~ SYNC-01 (#12): body, labels"));

  labels.assert();
  create.assert();
  patch.assert();
}

#[test]
fn verify_flags_open_issue() {
  let mut server = Server::new();
  let remote = issue_json(12, "SYNC-01: Reconcile labels", "open", "", &[]);
  mock_search(&mut server, "SYNC-01", vec![remote.clone()]);
  mock_issue(&mut server, &remote);
  let web = server
    .mock("GET", "/search/issues")
    .match_query(Matcher::Regex("WEB-02".into()))
    .expect(0)
    .create();

  let backlog = backlog_file(BACKLOG);
  backlog_tools(&server.url(), backlog.path())
    .arg("verify")
    .assert()
    .code(1)
    .stdout(predicate::str::contains("Checked:    1"))
    .stdout(predicate::str::contains(
      "  ! [SYNC-01] SYNC-01: Reconcile labels: Issue still open on GitHub (https://github.com/owner/repo/issues/12)",
    ));

  web.assert();
}

#[test]
fn verify_passes_when_done_issues_are_closed() {
  let mut server = Server::new();
  let remote = issue_json(12, "SYNC-01: Reconcile labels", "closed", "", &[]);
  mock_search(&mut server, "SYNC-01", vec![remote.clone()]);
  mock_issue(&mut server, &remote);

  let backlog = backlog_file(BACKLOG);
  backlog_tools(&server.url(), backlog.path())
    .args(["verify", "--json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"checked\": 1"))
    .stdout(predicate::str::contains("\"mismatches\": []"));
}

#[test]
fn api_errors_fail_the_command() {
  let mut server = Server::new();
  server
    .mock("GET", "/search/issues")
    .match_query(Matcher::Any)
    .with_status(401)
    .with_body("Bad credentials")
    .create();

  let backlog = backlog_file(BACKLOG);
  backlog_tools(&server.url(), backlog.path())
    .arg("verify")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("401"))
    .stderr(predicate::str::contains("Bad credentials"));
}

#[test]
fn top_writes_ranked_selection() {
  let backlog = backlog_file(
    r#"
issues:
  - title: "LOW-1: someday"
    body: ""
  - title: "HOT-1: urgent"
    body: ""
    labels: ["priority:P1"]
  - title: "MID-1: soon"
    body: ""
    priority: P2
"#,
  );
  let dir = tempfile::tempdir().unwrap();
  let target = dir.path().join("out/top.yaml");

  Command::cargo_bin("backlog-tools")
    .unwrap()
    .env_remove("GITHUB_REPOSITORY")
    .args(["top", "--limit", "2", "--backlog"])
    .arg(backlog.path())
    .arg("--output")
    .arg(&target)
    .assert()
    .success()
    .stdout(predicate::str::contains("Top 2 issue(s) written to"));

  let written = std::fs::read_to_string(&target).unwrap();
  let hot = written.find("HOT-1").unwrap();
  let mid = written.find("MID-1").unwrap();
  assert!(hot < mid, "{written}");
  assert!(!written.contains("LOW-1"), "{written}");
}
