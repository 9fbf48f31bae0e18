use crate::error::Result;
use crate::model::{Milestone, Project, ProjectIssue, ProjectSummary, PullRequest, ReportWindow, User};
use crate::summary::milestone::build_milestone;
use crate::summary::Services;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Placeholder rollup used when nothing was resolved in the window
pub fn no_updates_placeholder(window: &ReportWindow) -> String {
    format!("* No updates in the last {} days*", window.days())
}

/// Summarize one project.
///
/// With `parent_issues_are_children` the project's issue keys are treated as
/// a flat list of work items: no descendant expansion and no milestones. The
/// synthetic Misc project is built this way.
pub async fn summarize_project(
    project: Project,
    users: Arc<Vec<User>>,
    services: Services,
    window: ReportWindow,
    extra_prs: BTreeSet<PullRequest>,
    parent_issues_are_children: bool,
) -> Result<ProjectSummary> {
    tracing::debug!(project = %project.title, keys = project.issue_keys.len(), "summarizing project");

    let parent_issues = if project.issue_keys.is_empty() {
        Vec::new()
    } else {
        services.pm.get_issues(&project.issue_keys).await?
    };

    let child_issues = if parent_issues_are_children {
        parent_issues.clone()
    } else if project.issue_keys.is_empty() {
        Vec::new()
    } else {
        services.pm.get_child_issues(&project.issue_keys).await?
    };

    let resolved_child_issues: BTreeSet<ProjectIssue> = child_issues
        .iter()
        .filter(|issue| issue.completed_within(&window) && issue.is_issue_or_bug())
        .cloned()
        .collect();

    let duration_progress_summary = if resolved_child_issues.is_empty() {
        no_updates_placeholder(&window)
    } else {
        services
            .summarizer
            .summarize(&resolved_issues_markdown(&resolved_child_issues))
            .await?
    };

    let merged_prs = find_related_prs(&services, &window, &resolved_child_issues, extra_prs).await?;

    let milestones = if parent_issues_are_children {
        Vec::new()
    } else {
        let anchors: BTreeSet<ProjectIssue> = parent_issues
            .iter()
            .chain(child_issues.iter())
            .filter(|issue| issue.is_milestone())
            .cloned()
            .collect();
        build_milestones(anchors, &project, &users, &services, &window).await?
    };

    let issues: BTreeSet<ProjectIssue> = child_issues
        .into_iter()
        .filter(|issue| issue.is_issue_or_bug())
        .collect();
    let duration_issues = issues
        .iter()
        .filter(|issue| issue.changed_within(&window))
        .cloned()
        .collect();

    let tag_owners = project.tag_milestone_owners;
    Ok(ProjectSummary {
        project,
        duration_progress_summary,
        issues,
        duration_issues,
        merged_prs,
        milestones,
        tag_owners,
        window,
    })
}

/// Titled markdown block handed to the text summarizer
pub fn resolved_issues_markdown(issues: &BTreeSet<ProjectIssue>) -> String {
    let mut output = String::new();
    for issue in issues {
        output.push_str(&format!("### {}\n", issue.title));
        output.push_str(&format!(
            "Assignee: {}\n",
            issue.assignee_name.as_deref().unwrap_or("Unassigned")
        ));
        if let Some(ref description) = issue.description {
            let description = description.trim();
            if !description.is_empty() {
                output.push_str(description);
                output.push('\n');
            }
        }
        output.push('\n');
    }
    output
}

/// Seed PRs plus merged PRs mentioning any resolved issue key
async fn find_related_prs(
    services: &Services,
    window: &ReportWindow,
    resolved: &BTreeSet<ProjectIssue>,
    extra_prs: BTreeSet<PullRequest>,
) -> Result<BTreeSet<PullRequest>> {
    let mut searches = JoinSet::new();
    for issue in resolved {
        let github = services.github.clone();
        let org_ids = services.org_ids.clone();
        let key = issue.key.clone();
        let window = *window;
        searches.spawn(async move {
            github
                .search_pull_requests_by_text(&key, &org_ids, window.start, window.end)
                .await
        });
    }

    let mut merged_prs = extra_prs;
    while let Some(joined) = searches.join_next().await {
        merged_prs.extend(joined??);
    }
    Ok(merged_prs)
}

async fn build_milestones(
    anchors: BTreeSet<ProjectIssue>,
    project: &Project,
    users: &Arc<Vec<User>>,
    services: &Services,
    window: &ReportWindow,
) -> Result<Vec<Milestone>> {
    let mut builds = JoinSet::new();
    for anchor in anchors {
        let project = project.clone();
        let users = users.clone();
        let pm = services.pm.clone();
        let window = *window;
        builds.spawn(async move {
            build_milestone(anchor, &project, &users, pm.as_ref(), &window).await
        });
    }

    let mut milestones = Vec::new();
    while let Some(joined) = builds.join_next().await {
        milestones.push(joined??);
    }
    milestones.sort_by(|a, b| a.issue.cmp(&b.issue));
    Ok(milestones)
}
