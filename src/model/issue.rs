use crate::model::ReportWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue types that count as a container of work
const MILESTONE_TYPES: &[&str] = &["epic", "milestone"];

/// Issue types that count as a unit of work
const WORK_ITEM_TYPES: &[&str] = &[
    "bug",
    "story",
    "task",
    "sub-task",
    "subtask",
    "improvement",
    "new feature",
    "feature",
    "spike",
    "chore",
    "issue",
];

/// Coarse workflow state shared by Jira and Linear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCategory {
    Todo,
    InProgress,
    Done,
}

/// Classification of an issue type string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Milestone,
    WorkItem,
    Unknown,
}

impl IssueKind {
    pub fn classify(issue_type: &str) -> Self {
        let normalized = issue_type.trim().to_lowercase();
        if MILESTONE_TYPES.contains(&normalized.as_str()) {
            IssueKind::Milestone
        } else if WORK_ITEM_TYPES.contains(&normalized.as_str()) {
            IssueKind::WorkItem
        } else {
            IssueKind::Unknown
        }
    }
}

/// An issue from Jira or Linear
///
/// Equality, hashing and ordering are by value so issue collections can be
/// merged and subtracted as sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectIssue {
    pub id: String,
    /// Human readable key, e.g. `ENG-123`
    pub key: String,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub status_category: StatusCategory,
    /// Raw type name, e.g. "Epic" or "Bug"
    pub issue_type: String,
    pub priority: Option<String>,
    pub estimate: Option<u32>,
    pub assignee_id: Option<String>,
    pub assignee_name: Option<String>,
    pub creator_id: Option<String>,
    pub creator_name: Option<String>,
    pub parent_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

impl ProjectIssue {
    pub fn kind(&self) -> IssueKind {
        IssueKind::classify(&self.issue_type)
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_milestone(&self) -> bool {
        self.kind() == IssueKind::Milestone
    }

    /// Unknown issue types are counted as work
    pub fn is_issue_or_bug(&self) -> bool {
        match self.kind() {
            IssueKind::WorkItem => true,
            IssueKind::Milestone => false,
            IssueKind::Unknown => {
                tracing::debug!(key = %self.key, issue_type = %self.issue_type, "unknown issue type counted as work");
                true
            }
        }
    }

    pub fn completed_within(&self, window: &ReportWindow) -> bool {
        self.completed_at
            .map(|completed| window.contains(&completed))
            .unwrap_or(false)
    }

    pub fn created_within(&self, window: &ReportWindow) -> bool {
        window.contains(&self.created_at)
    }

    /// Completed or created inside the window
    pub fn changed_within(&self, window: &ReportWindow) -> bool {
        self.completed_within(window) || self.created_within(window)
    }

    /// Slack link to the issue, labelled with its key
    pub fn slack_link(&self) -> String {
        format!("<{}|{}>", self.url, self.key)
    }
}

/// A comment on an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectComment {
    pub id: String,
    pub body: String,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A merged GitHub pull request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PullRequest {
    /// Repository in "owner/repo" format
    pub repository: String,
    pub number: u64,
    pub title: String,
    /// HTML URL for browser
    pub url: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// Return a short reference in the format "owner/repo#123"
    pub fn short_ref(&self) -> String {
        format!("{}#{}", self.repository, self.number)
    }

    pub fn slack_link(&self) -> String {
        format!("<{}|{}>", self.url, self.short_ref())
    }
}

/// A PagerDuty incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub service: Option<String>,
    pub status: String,
    pub urgency: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::issue;
    use chrono::Duration;

    #[test]
    fn test_epic_is_milestone() {
        let epic = issue("ENG-1", "Epic");
        assert!(epic.is_milestone());
        assert!(!epic.is_issue_or_bug());

        let linear_milestone = issue("ENG-2", "Milestone");
        assert!(linear_milestone.is_milestone());
    }

    #[test]
    fn test_work_items_are_not_milestones() {
        for issue_type in ["Bug", "Story", "Task"] {
            let item = issue("ENG-3", issue_type);
            assert!(item.is_issue_or_bug(), "{issue_type} should count as work");
            assert!(!item.is_milestone(), "{issue_type} is not a milestone");
        }
    }

    #[test]
    fn test_unknown_type_counts_as_work() {
        let odd = issue("ENG-4", "Research Thing");
        assert_eq!(odd.kind(), IssueKind::Unknown);
        assert!(odd.is_issue_or_bug());
        assert!(!odd.is_milestone());
    }

    #[test]
    fn test_window_predicates() {
        let window = ReportWindow::days_back(7);
        let mut item = issue("ENG-5", "Bug");
        item.created_at = window.end - Duration::days(30);
        assert!(!item.changed_within(&window));

        item.completed_at = Some(window.end - Duration::days(1));
        assert!(item.is_completed());
        assert!(item.completed_within(&window));
        assert!(item.changed_within(&window));
    }

    #[test]
    fn test_pull_request_short_ref() {
        let pr = PullRequest {
            repository: "acme/api".to_string(),
            number: 42,
            title: "Fix login".to_string(),
            url: "https://github.com/acme/api/pull/42".to_string(),
            author: None,
            created_at: Utc::now(),
            merged_at: None,
        };
        assert_eq!(pr.short_ref(), "acme/api#42");
        assert_eq!(pr.slack_link(), "<https://github.com/acme/api/pull/42|acme/api#42>");
    }
}
