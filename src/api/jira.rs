//! REST client for Jira Cloud.
//!
//! Uses the v2 API so descriptions and comments come back as plain text.

use crate::api::{check_status, ProjectManagementApi};
use crate::error::Result;
use crate::model::{ProjectComment, ProjectIssue, StatusCategory};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const SERVICE: &str = "Jira";
const PAGE_SIZE: usize = 100;
const ISSUE_FIELDS: &str = "summary,description,status,issuetype,priority,timeoriginalestimate,\
                            assignee,creator,parent,created,updated,resolutiondate,duedate";

/// Jira Cloud client
pub struct JiraClient {
    base_url: String,
    email: String,
    api_token: String,
    client: Client,
}

impl JiraClient {
    /// Create a new Jira client for `https://<site>.atlassian.net`
    pub fn new(base_url: String, email: String, api_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
            api_token,
            client,
        })
    }

    async fn search_page(&self, jql: &str, start_at: usize, max_results: usize) -> Result<SearchResponse> {
        let response = self
            .client
            .get(format!("{}/rest/api/2/search", self.base_url))
            .basic_auth(&self.email, Some(&self.api_token))
            .query(&[
                ("jql", jql),
                ("fields", ISSUE_FIELDS),
                ("startAt", start_at.to_string().as_str()),
                ("maxResults", max_results.to_string().as_str()),
            ])
            .send()
            .await?;

        Ok(check_status(SERVICE, response).await?.json().await?)
    }

    /// Run a JQL search and follow pagination to the end
    async fn search(&self, jql: &str) -> Result<Vec<ProjectIssue>> {
        let mut issues = Vec::new();
        let mut start_at = 0;
        loop {
            let page = self.search_page(jql, start_at, PAGE_SIZE).await?;
            let fetched = page.issues.len();
            for raw in page.issues {
                issues.push(self.to_project_issue(raw)?);
            }
            start_at += fetched;
            if fetched == 0 || start_at >= page.total {
                break;
            }
        }
        tracing::debug!(jql, count = issues.len(), "jira search");
        Ok(issues)
    }

    fn to_project_issue(&self, raw: JiraIssue) -> Result<ProjectIssue> {
        let fields = raw.fields;
        let status_category = match fields.status.status_category.key.as_str() {
            "done" => StatusCategory::Done,
            "indeterminate" => StatusCategory::InProgress,
            _ => StatusCategory::Todo,
        };

        Ok(ProjectIssue {
            id: raw.id,
            url: format!("{}/browse/{}", self.base_url, raw.key),
            key: raw.key,
            title: fields.summary,
            description: fields.description,
            status: fields.status.name,
            status_category,
            issue_type: fields.issuetype.name,
            priority: fields.priority.map(|p| p.name),
            estimate: fields.timeoriginalestimate.map(|seconds| (seconds / 3600) as u32),
            assignee_id: fields.assignee.as_ref().and_then(|u| u.account_id.clone()),
            assignee_name: fields.assignee.map(|u| u.display_name),
            creator_id: fields.creator.as_ref().and_then(|u| u.account_id.clone()),
            creator_name: fields.creator.map(|u| u.display_name),
            parent_key: fields.parent.map(|p| p.key),
            created_at: parse_timestamp(&fields.created)?,
            updated_at: parse_timestamp(&fields.updated)?,
            completed_at: fields
                .resolutiondate
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            due_date: fields.duedate.as_deref().map(parse_date).transpose()?,
        })
    }
}

#[async_trait]
impl ProjectManagementApi for JiraClient {
    async fn get_issues(&self, keys: &[String]) -> Result<Vec<ProjectIssue>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.search(&format!("key in ({})", keys.join(","))).await
    }

    async fn get_direct_child_issues(&self, parent_key: &str) -> Result<Vec<ProjectIssue>> {
        self.search(&format!("parent = {}", parent_key)).await
    }

    async fn get_recent_comments(
        &self,
        issue_key: &str,
        max_results: usize,
    ) -> Result<Vec<ProjectComment>> {
        let response = self
            .client
            .get(format!("{}/rest/api/2/issue/{}/comment", self.base_url, issue_key))
            .basic_auth(&self.email, Some(&self.api_token))
            .query(&[
                ("orderBy", "-created".to_string()),
                ("maxResults", max_results.to_string()),
            ])
            .send()
            .await?;
        let page: CommentPage = check_status(SERVICE, response).await?.json().await?;

        page.comments
            .into_iter()
            .map(|raw| {
                Ok(ProjectComment {
                    id: raw.id,
                    body: raw.body,
                    author_id: raw.author.as_ref().and_then(|u| u.account_id.clone()),
                    author_name: raw.author.map(|u| u.display_name),
                    created_at: parse_timestamp(&raw.created)?,
                    updated_at: parse_timestamp(&raw.updated)?,
                })
            })
            .collect()
    }

    async fn get_issues_resolved(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProjectIssue>> {
        let issues = self.search(&resolved_jql(user_id, start, end)).await?;
        Ok(resolved_between(issues, start, end))
    }

    async fn get_issues_resolved_count(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize> {
        Ok(self.get_issues_resolved(user_id, start, end).await?.len())
    }
}

/// JQL datetimes are read in the API user's profile timezone, so the query
/// uses whole days padded on both sides; `resolved_between` trims the excess.
fn resolved_jql(user_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "assignee = \"{}\" AND resolved >= \"{}\" AND resolved < \"{}\"",
        user_id,
        (start - ChronoDuration::days(1)).format("%Y-%m-%d"),
        (end + ChronoDuration::days(2)).format("%Y-%m-%d")
    )
}

/// Keep issues completed in `[start, end)`
fn resolved_between(
    issues: Vec<ProjectIssue>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<ProjectIssue> {
    issues
        .into_iter()
        .filter(|issue| matches!(issue.completed_at, Some(at) if at >= start && at < end))
        .collect()
}

/// Jira timestamps look like `2024-01-15T10:30:00.000+0000`
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")?.with_timezone(&Utc))
}

/// Due dates are plain `YYYY-MM-DD`, taken as midnight UTC
fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Debug, Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    fields: JiraFields,
}

#[derive(Debug, Deserialize)]
struct JiraFields {
    summary: String,
    description: Option<String>,
    status: JiraStatus,
    issuetype: Named,
    priority: Option<Named>,
    timeoriginalestimate: Option<u64>,
    assignee: Option<JiraUser>,
    creator: Option<JiraUser>,
    parent: Option<ParentRef>,
    created: String,
    updated: String,
    resolutiondate: Option<String>,
    duedate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JiraStatus {
    name: String,
    #[serde(rename = "statusCategory")]
    status_category: StatusCategoryRef,
}

#[derive(Debug, Deserialize)]
struct StatusCategoryRef {
    key: String,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct JiraUser {
    #[serde(rename = "accountId")]
    account_id: Option<String>,
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct ParentRef {
    key: String,
}

#[derive(Debug, Deserialize)]
struct CommentPage {
    #[serde(default)]
    comments: Vec<JiraComment>,
}

#[derive(Debug, Deserialize)]
struct JiraComment {
    id: String,
    body: String,
    author: Option<JiraUser>,
    created: String,
    updated: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{issue, resolved};
    use chrono::TimeZone;

    fn client() -> JiraClient {
        JiraClient::new(
            "https://acme.atlassian.net/".to_string(),
            "bot@acme.com".to_string(),
            "token".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        let parsed = parse_timestamp("2024-01-15T10:30:00.000+0100").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_due_date() {
        let parsed = parse_date("2024-03-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_resolved_jql() {
        let start = Utc.with_ymd_and_hms(2024, 6, 7, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 14, 12, 0, 0).unwrap();
        assert_eq!(
            resolved_jql("abc123", start, end),
            "assignee = \"abc123\" AND resolved >= \"2024-06-06\" AND resolved < \"2024-06-16\""
        );
    }

    #[test]
    fn test_resolved_between_trims_padded_days() {
        let start = Utc.with_ymd_and_hms(2024, 6, 7, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 14, 12, 0, 0).unwrap();
        let issues = vec![
            resolved("ENG-1", "Bug", Utc.with_ymd_and_hms(2024, 6, 7, 3, 0, 0).unwrap()),
            resolved("ENG-2", "Bug", start),
            resolved("ENG-3", "Story", Utc.with_ymd_and_hms(2024, 6, 14, 11, 59, 0).unwrap()),
            resolved("ENG-4", "Story", end),
            issue("ENG-5", "Task"),
        ];

        let keys: Vec<String> = resolved_between(issues, start, end)
            .into_iter()
            .map(|issue| issue.key)
            .collect();
        assert_eq!(keys, vec!["ENG-2".to_string(), "ENG-3".to_string()]);
    }

    #[test]
    fn test_issue_mapping() {
        let raw: JiraIssue = serde_json::from_value(serde_json::json!({
            "id": "10001",
            "key": "ENG-7",
            "fields": {
                "summary": "Fix login",
                "description": null,
                "status": { "name": "Done", "statusCategory": { "key": "done" } },
                "issuetype": { "name": "Bug" },
                "priority": { "name": "High" },
                "timeoriginalestimate": 7200,
                "assignee": { "accountId": "abc", "displayName": "Ada" },
                "creator": null,
                "parent": { "key": "ENG-1" },
                "created": "2024-06-01T09:00:00.000+0000",
                "updated": "2024-06-10T09:00:00.000+0000",
                "resolutiondate": "2024-06-10T09:00:00.000+0000",
                "duedate": null
            }
        }))
        .unwrap();

        let issue = client().to_project_issue(raw).unwrap();
        assert_eq!(issue.url, "https://acme.atlassian.net/browse/ENG-7");
        assert_eq!(issue.status_category, StatusCategory::Done);
        assert_eq!(issue.estimate, Some(2));
        assert_eq!(issue.assignee_name.as_deref(), Some("Ada"));
        assert_eq!(issue.parent_key.as_deref(), Some("ENG-1"));
        assert!(issue.is_completed());
        assert!(issue.is_issue_or_bug());
    }
}
