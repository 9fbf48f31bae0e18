use crate::model::{Milestone, ProjectComment, ProjectIssue, ProjectSummary, PullRequest};
use crate::render::progress_bar;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;

/// Activity older than this is flagged with ⚠️
pub const STALE_AFTER_DAYS: i64 = 14;

/// Milestones completed this recently are listed as completed
pub const RECENTLY_COMPLETED_DAYS: i64 = 14;

/// Stale milestones due within this horizon get a nag line
pub const DUE_SOON_DAYS: i64 = 90;

/// Title line with project links
pub fn title_line(summary: &ProjectSummary) -> String {
    let mut line = format!("*{}*", summary.project.title);
    for link in &summary.project.links {
        line.push_str(&format!(" | <{}|{}>", link.url, link.name));
    }
    line
}

pub fn terse(summary: &ProjectSummary) -> String {
    format!(
        "{}\n{}",
        title_line(summary),
        progress_bar(&summary.issues, &summary.duration_issues, &summary.window)
    )
}

pub fn full(summary: &ProjectSummary) -> String {
    let mut lines = vec![
        title_line(summary),
        progress_bar(&summary.issues, &summary.duration_issues, &summary.window),
        summary.duration_progress_summary.clone(),
    ];

    let resolved: Vec<&ProjectIssue> = summary.resolved_in_window().collect();
    if !resolved.is_empty() {
        lines.push(format!("*Resolved:* {}", issue_links(resolved)));
    }
    let opened: Vec<&ProjectIssue> = summary.opened_in_window().collect();
    if !opened.is_empty() {
        lines.push(format!("*Opened:* {}", issue_links(opened)));
    }
    if !summary.merged_prs.is_empty() {
        lines.push(format!("*PRs:* {}", pr_links(&summary.merged_prs)));
    }

    let completed: Vec<&Milestone> = summary
        .milestones
        .iter()
        .filter(|m| recently_completed(m, summary.window.end))
        .collect();
    if !completed.is_empty() {
        lines.push("*Milestones completed:*".to_string());
        for milestone in completed {
            lines.push(format!(
                "• <{}|{}>{}",
                milestone.issue.url,
                milestone.issue.title,
                owner_suffix(milestone, summary.tag_owners)
            ));
        }
    }

    lines.join("\n")
}

pub fn verbose(summary: &ProjectSummary) -> String {
    let mut output = full(summary);
    for milestone in summary
        .milestones
        .iter()
        .filter(|m| !recently_completed(m, summary.window.end))
    {
        output.push_str("\n\n");
        output.push_str(&milestone_block(milestone, summary));
    }
    output
}

/// Detailed, quoted block for one milestone
pub fn milestone_block(milestone: &Milestone, summary: &ProjectSummary) -> String {
    let window = &summary.window;
    let now = window.end;
    let mut lines = vec![
        format!(
            "*<{}|{}>*{}",
            milestone.issue.url,
            milestone.issue.title,
            owner_suffix(milestone, summary.tag_owners)
        ),
        progress_bar(&milestone.child_issues, &milestone.duration_issues, window),
    ];

    let resolved: Vec<&ProjectIssue> = milestone
        .duration_issues
        .iter()
        .filter(|issue| issue.completed_within(window))
        .collect();

    let stale = if resolved.is_empty() {
        let activity = most_recent_activity(milestone);
        let stale = activity
            .as_ref()
            .map(|a| now - a.at() > Duration::days(STALE_AFTER_DAYS))
            .unwrap_or(true);
        let warning = if stale { " ⚠️" } else { "" };
        match activity {
            Some(activity) => lines.push(format!("{}{}", activity.describe(), warning)),
            None => lines.push(format!("_No recent activity_{}", warning)),
        }
        stale
    } else {
        lines.push(format!("*Resolved:* {}", issue_links(resolved)));
        false
    };

    if let Some(nag) = nag_line(milestone, stale, now, summary.tag_owners) {
        lines.push(nag);
    }

    let opened: Vec<&ProjectIssue> = milestone
        .duration_issues
        .iter()
        .filter(|issue| issue.created_within(window))
        .collect();
    if !opened.is_empty() {
        lines.push(format!("*Opened:* {}", issue_links(opened)));
    }
    if !milestone.merged_prs.is_empty() {
        lines.push(format!("*PRs:* {}", pr_links(&milestone.merged_prs)));
    }

    lines
        .iter()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Latest sign of life on a milestone
#[derive(Debug)]
pub enum Activity<'a> {
    Comment(&'a ProjectComment),
    Resolved(&'a ProjectIssue, DateTime<Utc>),
}

impl Activity<'_> {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Activity::Comment(comment) => comment.created_at,
            Activity::Resolved(_, at) => *at,
        }
    }

    fn describe(&self) -> String {
        match self {
            Activity::Comment(comment) => format!(
                "Most recent activity: comment from {} on {}",
                comment.author_name.as_deref().unwrap_or("someone"),
                self.at().format("%b %d")
            ),
            Activity::Resolved(issue, at) => format!(
                "Most recent activity: {} resolved on {}",
                issue.slack_link(),
                at.format("%b %d")
            ),
        }
    }
}

/// Newest comment or newest resolved child; the comment wins a tie
pub fn most_recent_activity(milestone: &Milestone) -> Option<Activity<'_>> {
    let last_comment = milestone
        .recent_comments
        .iter()
        .max_by_key(|comment| comment.created_at);
    let last_resolved = milestone
        .child_issues
        .iter()
        .filter_map(|issue| issue.completed_at.map(|at| (issue, at)))
        .max_by_key(|(_, at)| *at);

    match (last_comment, last_resolved) {
        (Some(comment), Some((issue, at))) => {
            if comment.created_at >= at {
                Some(Activity::Comment(comment))
            } else {
                Some(Activity::Resolved(issue, at))
            }
        }
        (Some(comment), None) => Some(Activity::Comment(comment)),
        (None, Some((issue, at))) => Some(Activity::Resolved(issue, at)),
        (None, None) => None,
    }
}

fn nag_line(milestone: &Milestone, stale: bool, now: DateTime<Utc>, tag_owners: bool) -> Option<String> {
    let anchor = &milestone.issue;
    let has_assignee = anchor.assignee_id.is_some() || anchor.assignee_name.is_some();
    let who = milestone
        .owner
        .as_ref()
        .map(|owner| if tag_owners { owner.mention() } else { owner.name.clone() })
        .or_else(|| anchor.assignee_name.clone());

    match anchor.due_date {
        None if !has_assignee => {
            Some("⚠️ _This milestone has no due date or assignee. Please add them._".to_string())
        }
        None => Some(format!(
            "⚠️ _This milestone has no due date. {}, please add one._",
            who.unwrap_or_else(|| "Owner".to_string())
        )),
        Some(due) if stale && due - now <= Duration::days(DUE_SOON_DAYS) => Some(format!(
            "⚠️ _Due {} with no recent activity. {}, please post an update._",
            due.format("%b %d"),
            who.unwrap_or_else(|| "Owner".to_string())
        )),
        Some(_) => None,
    }
}

fn recently_completed(milestone: &Milestone, now: DateTime<Utc>) -> bool {
    milestone
        .issue
        .completed_at
        .map(|at| at <= now && now - at <= Duration::days(RECENTLY_COMPLETED_DAYS))
        .unwrap_or(false)
}

fn owner_suffix(milestone: &Milestone, tag_owners: bool) -> String {
    match milestone.owner {
        Some(ref owner) if tag_owners => format!(" ({})", owner.mention()),
        Some(ref owner) => format!(" ({})", owner.name),
        None => String::new(),
    }
}

fn issue_links(issues: Vec<&ProjectIssue>) -> String {
    issues
        .iter()
        .map(|issue| issue.slack_link())
        .collect::<Vec<_>>()
        .join(", ")
}

fn pr_links(prs: &BTreeSet<PullRequest>) -> String {
    prs.iter()
        .map(PullRequest::slack_link)
        .collect::<Vec<_>>()
        .join(", ")
}
