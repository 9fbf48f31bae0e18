//! Slack-flavored markdown for completed summaries.
//!
//! Everything here is pure: rendering never touches the network.

pub mod progress;
pub mod project;

pub use progress::progress_bar;

use crate::model::{Incident, MultiProjectSummary, ProjectSummary};

/// Rendering of a summary into Slack markup
pub trait SlackMarkup {
    /// Title, progress, rollup, links and completed milestones
    fn to_slack_markup(&self) -> String;

    /// Title and progress only
    fn to_terse_slack_markup(&self) -> String;

    /// Full markup plus a detailed block per open milestone
    fn to_verbose_slack_markdown(&self) -> String;
}

impl SlackMarkup for ProjectSummary {
    fn to_slack_markup(&self) -> String {
        project::full(self)
    }

    fn to_terse_slack_markup(&self) -> String {
        project::terse(self)
    }

    fn to_verbose_slack_markdown(&self) -> String {
        project::verbose(self)
    }
}

impl SlackMarkup for MultiProjectSummary {
    fn to_slack_markup(&self) -> String {
        self.render_with(ProjectSummary::to_slack_markup, false)
    }

    fn to_terse_slack_markup(&self) -> String {
        self.render_with(ProjectSummary::to_terse_slack_markup, true)
    }

    fn to_verbose_slack_markdown(&self) -> String {
        self.render_with(ProjectSummary::to_verbose_slack_markdown, false)
    }
}

impl MultiProjectSummary {
    fn header(&self) -> String {
        format!(
            "*{}* ({} - {})",
            self.summary_name,
            self.start.format("%b %d"),
            self.end.format("%b %d, %Y")
        )
    }

    fn render_with(&self, project: fn(&ProjectSummary) -> String, terse: bool) -> String {
        let mut sections = vec![self.header()];
        sections.extend(self.project_summaries.iter().map(project));
        if let Some(ref incidents) = self.pager_duty_alerts {
            sections.push(incidents_section(incidents, terse));
        }
        sections.join("\n\n")
    }
}

fn incidents_section(incidents: &[Incident], terse: bool) -> String {
    if incidents.is_empty() {
        return "*PagerDuty:* No incidents 🎉".to_string();
    }

    let mut output = format!("*PagerDuty incidents:* {}", incidents.len());
    if terse {
        return output;
    }
    for incident in incidents {
        output.push_str(&format!(
            "\n• <{}|#{} {}>",
            incident.url, incident.number, incident.title
        ));
        let details: Vec<&str> = [incident.service.as_deref(), incident.urgency.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !details.is_empty() {
            output.push_str(&format!(" ({})", details.join(", ")));
        }
    }
    output
}
