pub mod client;
pub mod gateway;
pub mod issue;

pub use client::GitHubClient;
pub use gateway::{IssueGateway, ReadOnlyGateway};
pub use issue::{GithubIssue, IssueUpdate};
