//! Collaborator contracts consumed by the summary pipeline, and the concrete
//! clients that implement them.

pub mod github;
pub mod jira;
pub mod linear;
pub mod pagerduty;
pub mod slack;

use crate::error::Result;
use crate::model::{Incident, ProjectComment, ProjectIssue, PullRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Issue, milestone and comment retrieval over Jira or Linear
#[async_trait]
pub trait ProjectManagementApi: Send + Sync {
    /// Fetch issues by key
    async fn get_issues(&self, keys: &[String]) -> Result<Vec<ProjectIssue>>;

    /// Fetch the direct (non-recursive) children of one issue
    async fn get_direct_child_issues(&self, parent_key: &str) -> Result<Vec<ProjectIssue>>;

    /// Fetch up to `max_results` comments on an issue, newest first
    async fn get_recent_comments(
        &self,
        issue_key: &str,
        max_results: usize,
    ) -> Result<Vec<ProjectComment>>;

    /// Issues assigned to `user_id` and completed in `[start, end)`
    async fn get_issues_resolved(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProjectIssue>>;

    /// Number of issues assigned to `user_id` and completed in `[start, end)`
    async fn get_issues_resolved_count(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize>;

    /// All descendants of the given parents.
    ///
    /// Walks the hierarchy breadth first with an explicit frontier; keys already
    /// expanded are never fetched twice, so a cyclic hierarchy terminates.
    async fn get_child_issues(&self, parent_keys: &[String]) -> Result<Vec<ProjectIssue>> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<String> = parent_keys.iter().cloned().collect();
        let mut descendants: BTreeSet<ProjectIssue> = BTreeSet::new();

        while let Some(key) = frontier.pop_front() {
            if !visited.insert(key.clone()) {
                continue;
            }
            for child in self.get_direct_child_issues(&key).await? {
                if !visited.contains(&child.key) {
                    frontier.push_back(child.key.clone());
                }
                descendants.insert(child);
            }
        }

        Ok(descendants.into_iter().collect())
    }
}

/// Merged pull request search
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// PRs authored by `user_id` and merged in the window, across the given orgs
    async fn get_merged_pull_requests(
        &self,
        user_id: &str,
        org_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PullRequest>>;

    /// Merged PRs whose title or body mentions `text`
    async fn search_pull_requests_by_text(
        &self,
        text: &str,
        org_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PullRequest>>;
}

/// Incident retrieval
#[async_trait]
pub trait PagerDutyApi: Send + Sync {
    /// Incidents on one service created in `[start_inclusive, end_exclusive)`
    async fn get_service_pages(
        &self,
        service_id: &str,
        start_inclusive: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
    ) -> Result<Vec<Incident>>;
}

/// Free text to a short bullet summary
#[async_trait]
pub trait TextSummarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Turn a non-success response into an API error carrying the body text
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(crate::error::DigestError::api(
        service,
        format!("request failed with status {}: {}", status, error_text),
    ))
}
