pub mod issue;
pub mod summary;

pub use issue::{Incident, IssueKind, ProjectComment, ProjectIssue, PullRequest, StatusCategory};
pub use summary::{Milestone, MultiProjectSummary, ProjectSummary};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A logical grouping of work anchored to top-level issue keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Numeric project id
    pub id: i64,
    /// Display title (may start with an emoji)
    pub title: String,
    /// Parent project id, if this project is nested
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Links shown next to the title
    #[serde(default)]
    pub links: Vec<ProjectLink>,
    /// Lead user, matched against user emails when a milestone has no known assignee
    #[serde(default)]
    pub lead_user_id: Option<String>,
    /// Mention milestone owners in rendered output
    #[serde(default)]
    pub tag_milestone_owners: bool,
    /// Epics / initiatives that anchor this project
    #[serde(default)]
    pub issue_keys: Vec<String>,
}

impl Project {
    /// Title with leading non-alphanumeric characters (emoji, spaces) removed.
    /// Only used for ordering; the stored title is untouched.
    pub fn sort_title(&self) -> &str {
        self.title.trim_start_matches(|c: char| !c.is_alphanumeric())
    }
}

/// A named link rendered next to a project title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLink {
    pub name: String,
    pub url: String,
}

/// A tracked person across the project-management system, GitHub and Slack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Generic id (used when no project-management id is set)
    pub id: String,
    /// Display name, matched against issue assignee names
    pub name: String,
    pub email: String,
    /// Jira account id or Linear user id
    #[serde(default)]
    pub pm_id: Option<String>,
    /// GitHub login
    #[serde(default)]
    pub github_id: Option<String>,
    /// Slack member id, used for mentions
    #[serde(default)]
    pub slack_id: Option<String>,
    /// Collect untracked work for this user into the Misc project
    #[serde(default)]
    pub misc: bool,
}

impl User {
    /// Id used for project-management lookups
    pub fn pm_lookup_id(&self) -> &str {
        self.pm_id.as_deref().unwrap_or(&self.id)
    }

    /// Slack mention when a member id is known, plain name otherwise
    pub fn mention(&self) -> String {
        match self.slack_id {
            Some(ref id) => format!("<@{}>", id),
            None => self.name.clone(),
        }
    }
}

/// Trailing reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    /// Start date (inclusive)
    pub start: DateTime<Utc>,
    /// End date (inclusive)
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    /// Create a window covering the last `days` days
    pub fn days_back(days: u32) -> Self {
        Self::ending_at(Utc::now(), days)
    }

    /// Create a window of `days` days ending at `end`
    pub fn ending_at(end: DateTime<Utc>, days: u32) -> Self {
        let start = end - Duration::days(days as i64);
        Self { start, end }
    }

    /// Check if a date is within this window
    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        date >= &self.start && date <= &self.end
    }

    /// Whole days covered by the window
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}
