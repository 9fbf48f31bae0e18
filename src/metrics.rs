//! Per-user resolved-issue and merged-PR counts.

use crate::error::Result;
use crate::model::{ReportWindow, User};
use crate::summary::Services;
use tokio::task::JoinSet;

/// Activity counts for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMetrics {
    pub user: User,
    pub resolved_issues: usize,
    /// `None` when the user has no GitHub id
    pub merged_prs: Option<usize>,
}

/// Collect metrics for every user concurrently, sorted by name
pub async fn collect_user_metrics(
    services: &Services,
    users: &[User],
    window: ReportWindow,
) -> Result<Vec<UserMetrics>> {
    let mut tasks = JoinSet::new();
    for user in users {
        let user = user.clone();
        let services = services.clone();
        tasks.spawn(async move {
            let resolved_issues = services
                .pm
                .get_issues_resolved_count(user.pm_lookup_id(), window.start, window.end)
                .await?;
            let merged_prs = match user.github_id {
                Some(ref github_id) => Some(
                    services
                        .github
                        .get_merged_pull_requests(github_id, &services.org_ids, window.start, window.end)
                        .await?
                        .len(),
                ),
                None => None,
            };
            Ok::<_, crate::error::DigestError>(UserMetrics {
                user,
                resolved_issues,
                merged_prs,
            })
        });
    }

    let mut metrics = Vec::with_capacity(users.len());
    while let Some(joined) = tasks.join_next().await {
        metrics.push(joined??);
    }
    metrics.sort_by(|a, b| a.user.name.cmp(&b.user.name));
    Ok(metrics)
}

/// Slack list of user metrics
pub fn to_slack_markup(title: &str, window: &ReportWindow, metrics: &[UserMetrics]) -> String {
    let mut output = format!(
        "*{}* ({} - {})",
        title,
        window.start.format("%b %d"),
        window.end.format("%b %d, %Y")
    );
    for entry in metrics {
        let prs = entry
            .merged_prs
            .map(|count| count.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        output.push_str(&format!(
            "\n• {}: {} issues resolved, {} PRs merged",
            entry.user.name, entry.resolved_issues, prs
        ));
    }
    output
}
