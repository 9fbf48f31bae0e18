use crate::api::PagerDutyApi;
use crate::error::Result;
use crate::model::{
    Incident, MultiProjectSummary, Project, ProjectIssue, ProjectSummary, PullRequest,
    ReportWindow, User,
};
use crate::summary::{summarize_project, Services};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Id of the synthetic project collecting untracked work
pub const MISC_PROJECT_ID: i64 = 999_999;

/// Title of the synthetic project collecting untracked work
pub const MISC_PROJECT_TITLE: &str = "📋 Other (Misc)";

/// What one concurrent task hands back to the orchestrator
enum TaskOutput {
    Project(ProjectSummary),
    MiscIssues(Vec<ProjectIssue>),
    MiscPrs(Vec<PullRequest>),
}

/// Orchestrator for a multi-project summary run
pub struct Orchestrator {
    services: Services,
    pager_duty: Option<Arc<dyn PagerDutyApi>>,
    pager_duty_service_ids: Vec<String>,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(services: Services) -> Self {
        Self {
            services,
            pager_duty: None,
            pager_duty_service_ids: Vec::new(),
        }
    }

    /// Enable PagerDuty incidents for the given services
    pub fn with_pager_duty(mut self, api: Arc<dyn PagerDutyApi>, service_ids: Vec<String>) -> Self {
        self.pager_duty = Some(api);
        self.pager_duty_service_ids = service_ids;
        self
    }

    /// Summarize every project, plus untracked work of `misc_users` when
    /// `include_misc` is set.
    ///
    /// All project and misc-collection tasks run concurrently and must all
    /// finish before deduplication starts. The first failing task fails the
    /// run; tasks still in flight are aborted.
    pub async fn create_summary(
        &self,
        projects: &[Project],
        users: &[User],
        misc_users: &[User],
        summary_name: &str,
        window: ReportWindow,
        include_misc: bool,
    ) -> Result<MultiProjectSummary> {
        let users = Arc::new(users.to_vec());
        let mut tasks: JoinSet<Result<TaskOutput>> = JoinSet::new();

        for project in projects {
            let project = project.clone();
            let users = users.clone();
            let services = self.services.clone();
            tasks.spawn(async move {
                summarize_project(project, users, services, window, BTreeSet::new(), false)
                    .await
                    .map(TaskOutput::Project)
            });
        }

        if include_misc {
            for user in misc_users {
                self.spawn_misc_collection(&mut tasks, user, window);
            }
        }

        tracing::info!(
            projects = projects.len(),
            misc_users = if include_misc { misc_users.len() } else { 0 },
            tasks = tasks.len(),
            "collecting project summaries"
        );

        let mut project_summaries = Vec::with_capacity(projects.len() + 1);
        let mut misc_issues: BTreeSet<ProjectIssue> = BTreeSet::new();
        let mut misc_prs: BTreeSet<PullRequest> = BTreeSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined?? {
                TaskOutput::Project(summary) => project_summaries.push(summary),
                TaskOutput::MiscIssues(issues) => misc_issues.extend(issues),
                TaskOutput::MiscPrs(prs) => misc_prs.extend(prs),
            }
        }

        remove_tracked_work(&project_summaries, &mut misc_issues, &mut misc_prs);

        project_summaries.sort_by(|a, b| a.project.sort_title().cmp(b.project.sort_title()));

        if include_misc {
            tracing::info!(
                issues = misc_issues.len(),
                prs = misc_prs.len(),
                "summarizing untracked work"
            );
            let misc_project = misc_project(&misc_issues);
            let misc_summary = summarize_project(
                misc_project,
                users.clone(),
                self.services.clone(),
                window,
                misc_prs,
                true,
            )
            .await?;
            project_summaries.push(misc_summary);
        }

        let pager_duty_alerts = self.fetch_incidents(&window).await?;

        Ok(MultiProjectSummary {
            start: window.start,
            end: window.end,
            summary_name: summary_name.to_string(),
            project_summaries,
            pager_duty_alerts,
        })
    }

    fn spawn_misc_collection(
        &self,
        tasks: &mut JoinSet<Result<TaskOutput>>,
        user: &User,
        window: ReportWindow,
    ) {
        let pm = self.services.pm.clone();
        let pm_id = user.pm_lookup_id().to_string();
        tasks.spawn(async move {
            pm.get_issues_resolved(&pm_id, window.start, window.end)
                .await
                .map(TaskOutput::MiscIssues)
        });

        match user.github_id.clone() {
            Some(github_id) => {
                let github = self.services.github.clone();
                let org_ids = self.services.org_ids.clone();
                tasks.spawn(async move {
                    github
                        .get_merged_pull_requests(&github_id, &org_ids, window.start, window.end)
                        .await
                        .map(TaskOutput::MiscPrs)
                });
            }
            None => {
                tracing::warn!(user = %user.name, "no GitHub id configured, skipping misc PRs");
            }
        }
    }

    /// `None` when PagerDuty is not configured
    async fn fetch_incidents(&self, window: &ReportWindow) -> Result<Option<Vec<Incident>>> {
        let api = match self.pager_duty {
            Some(ref api) if !self.pager_duty_service_ids.is_empty() => api,
            _ => return Ok(None),
        };

        let mut incidents = Vec::new();
        for service_id in &self.pager_duty_service_ids {
            let pages = api
                .get_service_pages(service_id, window.start, window.end)
                .await?;
            tracing::debug!(service = %service_id, incidents = pages.len(), "fetched incidents");
            incidents.extend(pages);
        }
        Ok(Some(incidents))
    }
}

/// Drop misc items that a named project already accounts for
fn remove_tracked_work(
    summaries: &[ProjectSummary],
    misc_issues: &mut BTreeSet<ProjectIssue>,
    misc_prs: &mut BTreeSet<PullRequest>,
) {
    for summary in summaries {
        for issue in &summary.issues {
            misc_issues.remove(issue);
        }
        for milestone in &summary.milestones {
            misc_issues.remove(&milestone.issue);
            for child in &milestone.child_issues {
                misc_issues.remove(child);
            }
        }
        for pr in &summary.merged_prs {
            misc_prs.remove(pr);
        }
    }
}

fn misc_project(misc_issues: &BTreeSet<ProjectIssue>) -> Project {
    Project {
        id: MISC_PROJECT_ID,
        title: MISC_PROJECT_TITLE.to_string(),
        parent_id: None,
        links: Vec::new(),
        lead_user_id: None,
        tag_milestone_owners: false,
        issue_keys: misc_issues.iter().map(|issue| issue.key.clone()).collect(),
    }
}
