use crate::api::{check_status, GitHubApi};
use crate::error::Result;
use crate::model::PullRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const SERVICE: &str = "GitHub";
const GITHUB_API_URL: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;
/// The search API stops at 1000 results
const MAX_PAGES: usize = 10;

/// GitHub REST client
pub struct GitHubClient {
    token: Option<String>,
    client: Client,
    pr_url: Regex,
}

impl GitHubClient {
    /// Create a new GitHub client; a token is optional but raises rate limits
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("eng-digest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            token,
            client,
            pr_url: Regex::new(r"github\.com/([^/]+)/([^/]+)/pull/(\d+)")?,
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<PullRequest>> {
        let mut pull_requests = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut request = self
                .client
                .get(format!("{}/search/issues", GITHUB_API_URL))
                .header("Accept", "application/vnd.github+json")
                .query(&[
                    ("q", query.to_string()),
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ]);
            if let Some(ref token) = self.token {
                request = request.bearer_auth(token);
            }

            let response = check_status(SERVICE, request.send().await?).await?;
            let results: SearchResponse = response.json().await?;
            let fetched = results.items.len();
            pull_requests.extend(results.items.into_iter().filter_map(|item| self.to_pull_request(item)));

            if fetched < PAGE_SIZE {
                break;
            }
        }
        tracing::debug!(query, count = pull_requests.len(), "github search");
        Ok(pull_requests)
    }

    fn to_pull_request(&self, item: SearchItem) -> Option<PullRequest> {
        let (repository, number) = parse_pull_request_url(&self.pr_url, &item.html_url)?;
        Some(PullRequest {
            repository,
            number,
            title: item.title,
            url: item.html_url,
            author: item.user.map(|u| u.login),
            created_at: item.created_at,
            merged_at: item.pull_request.and_then(|pr| pr.merged_at),
        })
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn get_merged_pull_requests(
        &self,
        user_id: &str,
        org_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PullRequest>> {
        self.search(&merged_query(&format!("author:{}", user_id), org_ids, start, end))
            .await
    }

    async fn search_pull_requests_by_text(
        &self,
        text: &str,
        org_ids: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PullRequest>> {
        self.search(&merged_query(&format!("\"{}\"", text), org_ids, start, end))
            .await
    }
}

/// Search query for merged PRs in the given orgs and window
pub fn merged_query(term: &str, org_ids: &[String], start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let mut query = format!("{} is:pr is:merged", term);
    for org in org_ids {
        query.push_str(&format!(" org:{}", org));
    }
    query.push_str(&format!(
        " merged:{}..{}",
        start.format("%Y-%m-%dT%H:%M:%SZ"),
        end.format("%Y-%m-%dT%H:%M:%SZ")
    ));
    query
}

/// Extract "owner/repo" and the PR number from a pull request URL
pub fn parse_pull_request_url(pattern: &Regex, url: &str) -> Option<(String, u64)> {
    let captures = pattern.captures(url.trim())?;
    let owner = captures.get(1)?.as_str();
    let repo = captures.get(2)?.as_str();
    let number = captures.get(3)?.as_str().parse().ok()?;
    Some((format!("{}/{}", owner, repo), number))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: String,
    html_url: String,
    created_at: DateTime<Utc>,
    user: Option<SearchUser>,
    pull_request: Option<PullRequestRef>,
}

#[derive(Debug, Deserialize)]
struct SearchUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    merged_at: Option<DateTime<Utc>>,
}
