pub mod milestone;
pub mod project;

pub use project::summarize_project;

use crate::api::{GitHubApi, ProjectManagementApi, TextSummarizer};
use std::sync::Arc;

/// Collaborators shared by every summary task in a run
#[derive(Clone)]
pub struct Services {
    pub pm: Arc<dyn ProjectManagementApi>,
    pub github: Arc<dyn GitHubApi>,
    pub summarizer: Arc<dyn TextSummarizer>,
    /// GitHub organizations that scope PR searches
    pub org_ids: Arc<Vec<String>>,
}

impl Services {
    pub fn new(
        pm: Arc<dyn ProjectManagementApi>,
        github: Arc<dyn GitHubApi>,
        summarizer: Arc<dyn TextSummarizer>,
        org_ids: Vec<String>,
    ) -> Self {
        Self {
            pm,
            github,
            summarizer,
            org_ids: Arc::new(org_ids),
        }
    }
}
