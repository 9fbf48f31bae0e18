//! In-memory fakes of the collaborator traits shared by unit tests.

use crate::api::{GitHubApi, PagerDutyApi, ProjectManagementApi, TextSummarizer};
use crate::error::{DigestError, Result};
use crate::model::{
    Incident, Project, ProjectComment, ProjectIssue, PullRequest, StatusCategory, User,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A timestamp well outside any test window
pub fn long_ago() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

pub fn issue(key: &str, issue_type: &str) -> ProjectIssue {
    ProjectIssue {
        id: format!("id-{}", key),
        key: key.to_string(),
        url: format!("https://acme.atlassian.net/browse/{}", key),
        title: format!("Title of {}", key),
        description: None,
        status: "To Do".to_string(),
        status_category: StatusCategory::Todo,
        issue_type: issue_type.to_string(),
        priority: None,
        estimate: None,
        assignee_id: None,
        assignee_name: None,
        creator_id: None,
        creator_name: None,
        parent_key: None,
        created_at: long_ago(),
        updated_at: long_ago(),
        completed_at: None,
        due_date: None,
    }
}

pub fn resolved(key: &str, issue_type: &str, at: DateTime<Utc>) -> ProjectIssue {
    let mut item = issue(key, issue_type);
    item.status = "Done".to_string();
    item.status_category = StatusCategory::Done;
    item.completed_at = Some(at);
    item.updated_at = at;
    item
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", id),
        pm_id: None,
        github_id: Some(format!("gh-{}", id)),
        slack_id: None,
        misc: true,
    }
}

pub fn project(id: i64, title: &str, keys: &[&str]) -> Project {
    Project {
        id,
        title: title.to_string(),
        parent_id: None,
        links: vec![],
        lead_user_id: None,
        tag_milestone_owners: false,
        issue_keys: keys.iter().map(|k| k.to_string()).collect(),
    }
}

pub fn pull_request(repository: &str, number: u64) -> PullRequest {
    PullRequest {
        repository: repository.to_string(),
        number,
        title: format!("PR {}", number),
        url: format!("https://github.com/{}/pull/{}", repository, number),
        author: None,
        created_at: long_ago(),
        merged_at: None,
    }
}

pub fn comment(id: &str, author: &str, at: DateTime<Utc>) -> ProjectComment {
    ProjectComment {
        id: id.to_string(),
        body: format!("comment {}", id),
        author_id: None,
        author_name: Some(author.to_string()),
        created_at: at,
        updated_at: at,
    }
}

#[derive(Default)]
pub struct FakePm {
    issues: HashMap<String, ProjectIssue>,
    children: HashMap<String, Vec<ProjectIssue>>,
    comments: HashMap<String, Vec<ProjectComment>>,
    resolved: HashMap<String, Vec<ProjectIssue>>,
    direct_child_calls: AtomicUsize,
    expanded: Mutex<Vec<String>>,
    resolved_calls: Mutex<Vec<String>>,
}

impl FakePm {
    pub fn add_issue(&mut self, issue: ProjectIssue) {
        self.issues.insert(issue.key.clone(), issue);
    }

    pub fn add_child(&mut self, parent_key: &str, child: ProjectIssue) {
        self.children
            .entry(parent_key.to_string())
            .or_default()
            .push(child);
    }

    pub fn add_comment(&mut self, issue_key: &str, comment: ProjectComment) {
        self.comments
            .entry(issue_key.to_string())
            .or_default()
            .push(comment);
    }

    pub fn add_resolved(&mut self, user_id: &str, issue: ProjectIssue) {
        self.add_issue(issue.clone());
        self.resolved
            .entry(user_id.to_string())
            .or_default()
            .push(issue);
    }

    pub fn direct_child_calls(&self) -> usize {
        self.direct_child_calls.load(Ordering::SeqCst)
    }

    /// Parent keys passed to `get_direct_child_issues`, in call order
    pub fn expanded_keys(&self) -> Vec<String> {
        self.expanded.lock().unwrap().clone()
    }

    pub fn resolved_calls(&self) -> Vec<String> {
        self.resolved_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProjectManagementApi for FakePm {
    async fn get_issues(&self, keys: &[String]) -> Result<Vec<ProjectIssue>> {
        Ok(keys
            .iter()
            .filter_map(|key| self.issues.get(key).cloned())
            .collect())
    }

    async fn get_direct_child_issues(&self, parent_key: &str) -> Result<Vec<ProjectIssue>> {
        self.direct_child_calls.fetch_add(1, Ordering::SeqCst);
        self.expanded.lock().unwrap().push(parent_key.to_string());
        Ok(self.children.get(parent_key).cloned().unwrap_or_default())
    }

    async fn get_recent_comments(
        &self,
        issue_key: &str,
        max_results: usize,
    ) -> Result<Vec<ProjectComment>> {
        let mut comments = self.comments.get(issue_key).cloned().unwrap_or_default();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments.truncate(max_results);
        Ok(comments)
    }

    async fn get_issues_resolved(
        &self,
        user_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<ProjectIssue>> {
        self.resolved_calls.lock().unwrap().push(user_id.to_string());
        Ok(self.resolved.get(user_id).cloned().unwrap_or_default())
    }

    async fn get_issues_resolved_count(
        &self,
        user_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<usize> {
        Ok(self.resolved.get(user_id).map(Vec::len).unwrap_or(0))
    }
}

#[derive(Default)]
pub struct FakeGitHub {
    by_text: HashMap<String, Vec<PullRequest>>,
    by_user: HashMap<String, Vec<PullRequest>>,
    user_calls: Mutex<Vec<String>>,
}

impl FakeGitHub {
    pub fn add_text_match(&mut self, text: &str, pr: PullRequest) {
        self.by_text.entry(text.to_string()).or_default().push(pr);
    }

    pub fn add_user_pr(&mut self, github_id: &str, pr: PullRequest) {
        self.by_user.entry(github_id.to_string()).or_default().push(pr);
    }

    pub fn user_calls(&self) -> Vec<String> {
        self.user_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn get_merged_pull_requests(
        &self,
        user_id: &str,
        _org_ids: &[String],
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<PullRequest>> {
        self.user_calls.lock().unwrap().push(user_id.to_string());
        Ok(self.by_user.get(user_id).cloned().unwrap_or_default())
    }

    async fn search_pull_requests_by_text(
        &self,
        text: &str,
        _org_ids: &[String],
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<PullRequest>> {
        Ok(self.by_text.get(text).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakePagerDuty {
    incidents: HashMap<String, Vec<Incident>>,
}

impl FakePagerDuty {
    pub fn add_incident(&mut self, service_id: &str, incident: Incident) {
        self.incidents
            .entry(service_id.to_string())
            .or_default()
            .push(incident);
    }
}

#[async_trait]
impl PagerDutyApi for FakePagerDuty {
    async fn get_service_pages(
        &self,
        service_id: &str,
        _start_inclusive: DateTime<Utc>,
        _end_exclusive: DateTime<Utc>,
    ) -> Result<Vec<Incident>> {
        Ok(self.incidents.get(service_id).cloned().unwrap_or_default())
    }
}

/// Echoes a fixed summary, or fails when `fail` is set
#[derive(Default)]
pub struct FakeSummarizer {
    pub fail: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextSummarizer for FakeSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(DigestError::claude_api("summarizer unavailable"));
        }
        Ok("• summarized".to_string())
    }
}
