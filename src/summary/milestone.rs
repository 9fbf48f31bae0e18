use crate::api::ProjectManagementApi;
use crate::error::Result;
use crate::model::{Milestone, Project, ProjectIssue, ReportWindow, User};
use std::collections::BTreeSet;

/// Comments fetched per milestone for "most recent activity"
pub const RECENT_COMMENT_LIMIT: usize = 5;

/// Build one milestone from its anchor issue.
///
/// API failures propagate to the caller.
pub async fn build_milestone(
    anchor: ProjectIssue,
    project: &Project,
    users: &[User],
    pm: &dyn ProjectManagementApi,
    window: &ReportWindow,
) -> Result<Milestone> {
    let child_issues: BTreeSet<ProjectIssue> = pm
        .get_direct_child_issues(&anchor.key)
        .await?
        .into_iter()
        .filter(|issue| issue.is_issue_or_bug())
        .collect();

    let owner = resolve_owner(&anchor, project, users);

    let recent_comments = if anchor.key.trim().is_empty() {
        Vec::new()
    } else {
        pm.get_recent_comments(&anchor.key, RECENT_COMMENT_LIMIT)
            .await?
    };

    let duration_issues = child_issues
        .iter()
        .filter(|issue| issue.changed_within(window))
        .cloned()
        .collect();

    tracing::debug!(
        milestone = %anchor.key,
        children = child_issues.len(),
        owner = owner.as_ref().map(|u| u.name.as_str()).unwrap_or("-"),
        "built milestone"
    );

    Ok(Milestone {
        owner,
        issue: anchor,
        child_issues,
        recent_comments,
        duration_issues,
        merged_prs: BTreeSet::new(),
    })
}

/// Assignee by display name first, then the project lead by email
fn resolve_owner(anchor: &ProjectIssue, project: &Project, users: &[User]) -> Option<User> {
    let by_assignee = anchor
        .assignee_name
        .as_deref()
        .and_then(|name| users.iter().find(|user| user.name == name));

    by_assignee
        .or_else(|| {
            project
                .lead_user_id
                .as_deref()
                .and_then(|lead| users.iter().find(|user| user.email == lead))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{comment, issue, project, resolved, user, FakePm};
    use chrono::Duration;

    #[tokio::test]
    async fn test_children_exclude_nested_epics() {
        let window = ReportWindow::days_back(7);
        let mut pm = FakePm::default();
        pm.add_child("ENG-1", issue("ENG-2", "Bug"));
        pm.add_child("ENG-1", issue("ENG-3", "Epic"));

        let milestone = build_milestone(
            issue("ENG-1", "Epic"),
            &project(1, "Core", &["ENG-1"]),
            &[],
            &pm,
            &window,
        )
        .await
        .unwrap();

        assert_eq!(milestone.child_issues.len(), 1);
        assert_eq!(milestone.child_issues.iter().next().unwrap().key, "ENG-2");
        assert!(milestone.merged_prs.is_empty());
        assert!(milestone.owner.is_none());
    }

    #[tokio::test]
    async fn test_duration_issues_are_recent_children() {
        let window = ReportWindow::days_back(7);
        let mut pm = FakePm::default();
        let mut opened = issue("ENG-2", "Task");
        opened.created_at = window.end - Duration::days(2);
        pm.add_child("ENG-1", opened);
        pm.add_child("ENG-1", resolved("ENG-3", "Bug", window.end - Duration::days(1)));
        pm.add_child("ENG-1", resolved("ENG-4", "Bug", window.end - Duration::days(40)));
        pm.add_child("ENG-1", issue("ENG-5", "Story"));

        let milestone = build_milestone(
            issue("ENG-1", "Epic"),
            &project(1, "Core", &["ENG-1"]),
            &[],
            &pm,
            &window,
        )
        .await
        .unwrap();

        let keys: Vec<&str> = milestone
            .duration_issues
            .iter()
            .map(|i| i.key.as_str())
            .collect();
        assert_eq!(keys, vec!["ENG-2", "ENG-3"]);
        assert!(milestone.duration_issues.is_subset(&milestone.child_issues));
    }

    #[tokio::test]
    async fn test_owner_prefers_assignee_name() {
        let window = ReportWindow::days_back(7);
        let pm = FakePm::default();
        let users = vec![user("ada", "Ada"), user("bob", "Bob")];
        let mut anchor = issue("ENG-1", "Epic");
        anchor.assignee_name = Some("Bob".to_string());
        let mut core = project(1, "Core", &["ENG-1"]);
        core.lead_user_id = Some("ada@example.com".to_string());

        let milestone = build_milestone(anchor, &core, &users, &pm, &window)
            .await
            .unwrap();
        assert_eq!(milestone.owner.unwrap().name, "Bob");
    }

    #[tokio::test]
    async fn test_owner_falls_back_to_project_lead() {
        let window = ReportWindow::days_back(7);
        let pm = FakePm::default();
        let users = vec![user("ada", "Ada"), user("bob", "Bob")];
        let mut anchor = issue("ENG-1", "Epic");
        anchor.assignee_name = Some("Someone Else".to_string());
        let mut core = project(1, "Core", &["ENG-1"]);
        core.lead_user_id = Some("ada@example.com".to_string());

        let milestone = build_milestone(anchor, &core, &users, &pm, &window)
            .await
            .unwrap();
        assert_eq!(milestone.owner.unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn test_recent_comments_limited() {
        let window = ReportWindow::days_back(7);
        let mut pm = FakePm::default();
        for n in 0..8 {
            pm.add_comment(
                "ENG-1",
                comment(&n.to_string(), "Ada", window.end - Duration::days(n)),
            );
        }

        let milestone = build_milestone(
            issue("ENG-1", "Epic"),
            &project(1, "Core", &["ENG-1"]),
            &[],
            &pm,
            &window,
        )
        .await
        .unwrap();

        assert_eq!(milestone.recent_comments.len(), RECENT_COMMENT_LIMIT);
        assert_eq!(milestone.recent_comments[0].id, "0");
    }

    #[tokio::test]
    async fn test_blank_anchor_key_skips_comments() {
        let window = ReportWindow::days_back(7);
        let mut pm = FakePm::default();
        pm.add_comment("", comment("1", "Ada", window.end));

        let milestone = build_milestone(
            issue("", "Milestone"),
            &project(1, "Core", &[]),
            &[],
            &pm,
            &window,
        )
        .await
        .unwrap();
        assert!(milestone.recent_comments.is_empty());
    }
}
