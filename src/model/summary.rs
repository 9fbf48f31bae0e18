use crate::model::{Incident, Project, ProjectComment, ProjectIssue, PullRequest, ReportWindow, User};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// An epic / milestone and the work directly under it
#[derive(Debug, Clone, Serialize)]
pub struct Milestone {
    pub owner: Option<User>,
    /// The anchor issue (type Epic or Milestone)
    pub issue: ProjectIssue,
    /// Direct child work items
    pub child_issues: BTreeSet<ProjectIssue>,
    /// Most recent comments on the anchor, newest first
    pub recent_comments: Vec<ProjectComment>,
    /// Children completed or created inside the window
    pub duration_issues: BTreeSet<ProjectIssue>,
    /// Never populated; PRs are attributed at project level
    pub merged_prs: BTreeSet<PullRequest>,
}

/// Everything known about one project for one window
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub project: Project,
    /// Natural-language rollup of resolved work
    pub duration_progress_summary: String,
    /// All work items under the project
    pub issues: BTreeSet<ProjectIssue>,
    /// Work items completed or created inside the window; always a subset of `issues`
    pub duration_issues: BTreeSet<ProjectIssue>,
    pub merged_prs: BTreeSet<PullRequest>,
    pub milestones: Vec<Milestone>,
    pub tag_owners: bool,
    pub window: ReportWindow,
}

impl ProjectSummary {
    /// Work items resolved inside the window
    pub fn resolved_in_window(&self) -> impl Iterator<Item = &ProjectIssue> {
        self.duration_issues
            .iter()
            .filter(|issue| issue.completed_within(&self.window))
    }

    /// Work items opened inside the window
    pub fn opened_in_window(&self) -> impl Iterator<Item = &ProjectIssue> {
        self.duration_issues
            .iter()
            .filter(|issue| issue.created_within(&self.window))
    }
}

/// Top-level output of one aggregation run
#[derive(Debug, Clone, Serialize)]
pub struct MultiProjectSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary_name: String,
    /// Sorted by title, ignoring leading emoji
    pub project_summaries: Vec<ProjectSummary>,
    /// `None` when PagerDuty is not configured, which is distinct from no incidents
    pub pager_duty_alerts: Option<Vec<Incident>>,
}
