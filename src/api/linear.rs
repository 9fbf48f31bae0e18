//! GraphQL client for the Linear API.
//!
//! Linear has no issue types, so a label naming a known type is used; issues
//! with sub-issues are treated as milestones.

use crate::api::{check_status, ProjectManagementApi};
use crate::error::{DigestError, Result};
use crate::model::{IssueKind, ProjectComment, ProjectIssue, StatusCategory};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;

const SERVICE: &str = "Linear";
const LINEAR_API_URL: &str = "https://api.linear.app/graphql";
const PAGE_SIZE: usize = 250;
const PAGE_INFO: &str = "pageInfo { hasNextPage endCursor }";

const ISSUE_FIELDS: &str = r#"
fragment IssueFields on Issue {
    id identifier url title description
    priorityLabel estimate
    state { name type }
    labels { nodes { name } }
    assignee { id name }
    creator { id name }
    parent { identifier }
    children(first: 1) { nodes { id } }
    createdAt updatedAt completedAt dueDate
}"#;

/// Linear client
pub struct LinearClient {
    api_key: String,
    client: Client,
}

impl LinearClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { api_key, client })
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let body = json!({ "query": query, "variables": variables });
        let response = self
            .client
            .post(LINEAR_API_URL)
            .header("Authorization", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let json: Value = check_status(SERVICE, response).await?.json().await?;
        if let Some(errors) = json.get("errors") {
            return Err(DigestError::api(SERVICE, format!("GraphQL errors: {}", errors)));
        }
        let data = json
            .get("data")
            .cloned()
            .ok_or_else(|| DigestError::api(SERVICE, "missing 'data' in response"))?;

        Ok(serde_json::from_value(data)?)
    }

    async fn get_issue(&self, key: &str) -> Result<Option<ProjectIssue>> {
        #[derive(Deserialize)]
        struct Response {
            issue: Option<IssueNode>,
        }

        let query = format!(
            "query($id: String!) {{ issue(id: $id) {{ ...IssueFields }} }}{}",
            ISSUE_FIELDS
        );
        let response: Response = self.graphql(&query, json!({ "id": key })).await?;
        response.issue.map(IssueNode::into_project_issue).transpose()
    }

    async fn child_page(
        &self,
        parent_key: &str,
        after: Option<String>,
    ) -> Result<Connection<IssueNode>> {
        #[derive(Deserialize)]
        struct Response {
            issue: Option<ChildrenNode>,
        }
        #[derive(Deserialize)]
        struct ChildrenNode {
            children: Connection<IssueNode>,
        }

        let query = format!(
            "query($id: String!, $first: Int!, $after: String) {{ issue(id: $id) {{ \
             children(first: $first, after: $after) {{ nodes {{ ...IssueFields }} {} }} }} }}{}",
            PAGE_INFO, ISSUE_FIELDS
        );
        let response: Response = self
            .graphql(
                &query,
                json!({ "id": parent_key, "first": PAGE_SIZE, "after": after }),
            )
            .await?;

        Ok(response
            .issue
            .map(|node| node.children)
            .unwrap_or_else(Connection::empty))
    }

    async fn resolved_page(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        after: Option<String>,
    ) -> Result<Connection<IssueNode>> {
        #[derive(Deserialize)]
        struct Response {
            issues: Connection<IssueNode>,
        }

        let query = format!(
            "query($user: ID!, $start: DateTimeOrDuration!, $end: DateTimeOrDuration!, $first: Int!, $after: String) {{ \
             issues(first: $first, after: $after, filter: {{ assignee: {{ id: {{ eq: $user }} }}, completedAt: {{ gte: $start, lt: $end }} }}) \
             {{ nodes {{ ...IssueFields }} {} }} }}{}",
            PAGE_INFO, ISSUE_FIELDS
        );
        let response: Response = self
            .graphql(
                &query,
                json!({
                    "user": user_id,
                    "start": start.to_rfc3339(),
                    "end": end.to_rfc3339(),
                    "first": PAGE_SIZE,
                    "after": after,
                }),
            )
            .await?;

        Ok(response.issues)
    }
}

/// Follow `pageInfo` cursors until the connection is exhausted
async fn collect_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Connection<T>>>,
{
    let mut nodes = Vec::new();
    let mut after = None;
    loop {
        let page = fetch_page(after.take()).await?;
        let next = page.next_cursor();
        let fetched = page.nodes.len();
        nodes.extend(page.nodes);
        match next {
            Some(cursor) if fetched > 0 => after = Some(cursor),
            _ => break,
        }
    }
    Ok(nodes)
}

#[async_trait]
impl ProjectManagementApi for LinearClient {
    async fn get_issues(&self, keys: &[String]) -> Result<Vec<ProjectIssue>> {
        let mut issues = Vec::with_capacity(keys.len());
        for key in keys {
            match self.get_issue(key).await? {
                Some(issue) => issues.push(issue),
                None => tracing::warn!(key = %key, "linear issue not found"),
            }
        }
        Ok(issues)
    }

    async fn get_direct_child_issues(&self, parent_key: &str) -> Result<Vec<ProjectIssue>> {
        collect_pages(move |after| self.child_page(parent_key, after))
            .await?
            .into_iter()
            .map(IssueNode::into_project_issue)
            .collect()
    }

    async fn get_recent_comments(
        &self,
        issue_key: &str,
        max_results: usize,
    ) -> Result<Vec<ProjectComment>> {
        #[derive(Deserialize)]
        struct Response {
            issue: Option<CommentsNode>,
        }
        #[derive(Deserialize)]
        struct CommentsNode {
            comments: Connection<CommentNode>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct CommentNode {
            id: String,
            body: String,
            user: Option<UserRef>,
            created_at: DateTime<Utc>,
            updated_at: DateTime<Utc>,
        }

        let query = "query($id: String!, $first: Int!) { issue(id: $id) { comments(first: $first, orderBy: createdAt) { nodes { id body createdAt updatedAt user { id name } } } } }";
        let response: Response = self
            .graphql(query, json!({ "id": issue_key, "first": PAGE_SIZE }))
            .await?;

        let mut comments: Vec<ProjectComment> = response
            .issue
            .map(|node| node.comments.nodes)
            .unwrap_or_default()
            .into_iter()
            .map(|node| ProjectComment {
                id: node.id,
                body: node.body,
                author_id: node.user.as_ref().map(|u| u.id.clone()),
                author_name: node.user.map(|u| u.name),
                created_at: node.created_at,
                updated_at: node.updated_at,
            })
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments.truncate(max_results);
        Ok(comments)
    }

    async fn get_issues_resolved(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProjectIssue>> {
        collect_pages(move |after| self.resolved_page(user_id, start, end, after))
            .await?
            .into_iter()
            .map(IssueNode::into_project_issue)
            .collect()
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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    nodes: Vec<T>,
    #[serde(default)]
    page_info: Option<PageInfo>,
}

impl<T> Connection<T> {
    fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            page_info: None,
        }
    }

    fn next_cursor(&self) -> Option<String> {
        self.page_info
            .as_ref()
            .filter(|info| info.has_next_page)
            .and_then(|info| info.end_cursor.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct StateRef {
    name: String,
    #[serde(rename = "type")]
    state_type: String,
}

#[derive(Debug, Deserialize)]
struct LabelRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ParentRef {
    identifier: String,
}

#[derive(Debug, Deserialize)]
struct ChildRef {
    #[allow(dead_code)]
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    id: String,
    identifier: String,
    url: String,
    title: String,
    description: Option<String>,
    priority_label: Option<String>,
    estimate: Option<f64>,
    state: StateRef,
    labels: Connection<LabelRef>,
    assignee: Option<UserRef>,
    creator: Option<UserRef>,
    parent: Option<ParentRef>,
    children: Connection<ChildRef>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    due_date: Option<String>,
}

impl IssueNode {
    fn issue_type(&self) -> String {
        let labelled = self
            .labels
            .nodes
            .iter()
            .find(|label| IssueKind::classify(&label.name) != IssueKind::Unknown);
        match labelled {
            Some(label) => label.name.clone(),
            None if !self.children.nodes.is_empty() => "Milestone".to_string(),
            None => "Issue".to_string(),
        }
    }

    fn into_project_issue(self) -> Result<ProjectIssue> {
        let issue_type = self.issue_type();
        let status_category = match self.state.state_type.as_str() {
            "completed" | "canceled" => StatusCategory::Done,
            "started" => StatusCategory::InProgress,
            _ => StatusCategory::Todo,
        };
        let due_date = match self.due_date {
            Some(ref date) => Some(
                NaiveDate::parse_from_str(date, "%Y-%m-%d")?
                    .and_hms_opt(0, 0, 0)
                    .unwrap_or_default()
                    .and_utc(),
            ),
            None => None,
        };

        Ok(ProjectIssue {
            id: self.id,
            key: self.identifier,
            url: self.url,
            title: self.title,
            description: self.description,
            status: self.state.name,
            status_category,
            issue_type,
            priority: self.priority_label,
            estimate: self.estimate.map(|points| points.round() as u32),
            assignee_id: self.assignee.as_ref().map(|u| u.id.clone()),
            assignee_name: self.assignee.map(|u| u.name),
            creator_id: self.creator.as_ref().map(|u| u.id.clone()),
            creator_name: self.creator.map(|u| u.name),
            parent_key: self.parent.map(|p| p.identifier),
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
            due_date,
        })
    }
}
