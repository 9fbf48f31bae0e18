use crate::model::{ProjectIssue, ReportWindow};
use std::collections::BTreeSet;

/// Number of cells in a progress bar
pub const BAR_WIDTH: usize = 10;

const CLOSED_CELL: &str = "🟦";
const WINDOW_CELL: &str = "🟨";
const OPEN_CELL: &str = "⬜";

/// Counts behind one progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub closed: usize,
    pub resolved_in_window: usize,
    pub opened_in_window: usize,
}

impl Progress {
    pub fn from_issues(
        issues: &BTreeSet<ProjectIssue>,
        duration_issues: &BTreeSet<ProjectIssue>,
        window: &ReportWindow,
    ) -> Self {
        let work: Vec<&ProjectIssue> = issues.iter().filter(|i| i.is_issue_or_bug()).collect();
        let recent: Vec<&ProjectIssue> = duration_issues
            .iter()
            .filter(|i| i.is_issue_or_bug())
            .collect();

        Self {
            total: work.len(),
            closed: work.iter().filter(|i| i.is_completed()).count(),
            resolved_in_window: recent.iter().filter(|i| i.completed_within(window)).count(),
            opened_in_window: recent.iter().filter(|i| i.created_within(window)).count(),
        }
    }

    pub fn percent(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            self.closed * 100 / self.total
        }
    }

    /// Opened minus resolved inside the window
    pub fn net_change(&self) -> i64 {
        self.opened_in_window as i64 - self.resolved_in_window as i64
    }

    /// Ten cells: closed before the window, closed inside it, still open
    pub fn bar(&self) -> String {
        let (closed_cells, window_cells) = if self.total == 0 {
            (0, 0)
        } else {
            let closed = (self.closed * BAR_WIDTH / self.total).min(BAR_WIDTH);
            let window = (self.resolved_in_window * BAR_WIDTH / self.total).min(closed);
            (closed, window)
        };

        let mut bar = String::new();
        bar.push_str(&CLOSED_CELL.repeat(closed_cells - window_cells));
        bar.push_str(&WINDOW_CELL.repeat(window_cells));
        bar.push_str(&OPEN_CELL.repeat(BAR_WIDTH - closed_cells));
        bar
    }

    /// Net label; a positive net (more opened) is shown with 📉
    pub fn net_label(&self) -> String {
        let net = self.net_change();
        match net {
            0 => "⚖️ 0".to_string(),
            n if n > 0 => format!("📉 +{}", n),
            n => format!("📈 {}", n),
        }
    }

    pub fn render(&self) -> String {
        format!("{} {}% | {} net issues", self.bar(), self.percent(), self.net_label())
    }
}

/// Progress line for an issue set and its in-window subset
pub fn progress_bar(
    issues: &BTreeSet<ProjectIssue>,
    duration_issues: &BTreeSet<ProjectIssue>,
    window: &ReportWindow,
) -> String {
    Progress::from_issues(issues, duration_issues, window).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{issue, resolved};
    use chrono::{Duration, TimeZone, Utc};

    fn window() -> ReportWindow {
        ReportWindow::ending_at(Utc.with_ymd_and_hms(2024, 6, 14, 12, 0, 0).unwrap(), 7)
    }

    #[test]
    fn test_empty_is_zero_and_white() {
        let line = progress_bar(&BTreeSet::new(), &BTreeSet::new(), &window());
        assert_eq!(line, format!("{} 0% | ⚖️ 0 net issues", OPEN_CELL.repeat(10)));
    }

    #[test]
    fn test_all_closed_is_blue() {
        let old = window().start - Duration::days(30);
        let issues = BTreeSet::from([resolved("A-1", "Bug", old), resolved("A-2", "Task", old)]);

        let line = progress_bar(&issues, &BTreeSet::new(), &window());
        assert!(line.starts_with(&CLOSED_CELL.repeat(10)));
        assert!(line.contains(" 100% "));
        assert!(!line.contains(WINDOW_CELL));
    }

    #[test]
    fn test_window_delta_is_yellow() {
        let window = window();
        let recent = resolved("A-1", "Bug", window.end - Duration::days(1));
        let issues = BTreeSet::from([
            recent.clone(),
            resolved("A-2", "Bug", window.start - Duration::days(30)),
            issue("A-3", "Bug"),
            issue("A-4", "Bug"),
        ]);
        let duration = BTreeSet::from([recent]);

        let progress = Progress::from_issues(&issues, &duration, &window);
        assert_eq!(progress.percent(), 50);
        assert_eq!(
            progress.bar(),
            format!(
                "{}{}{}",
                CLOSED_CELL.repeat(3),
                WINDOW_CELL.repeat(2),
                OPEN_CELL.repeat(5)
            )
        );
        assert_eq!(progress.net_label(), "📈 -1");
    }

    #[test]
    fn test_more_opened_than_resolved() {
        let window = window();
        let mut opened = issue("A-1", "Bug");
        opened.created_at = window.end - Duration::days(2);
        let mut other = issue("A-2", "Story");
        other.created_at = window.end - Duration::days(3);
        let issues = BTreeSet::from([opened.clone(), other.clone()]);
        let duration = BTreeSet::from([opened, other]);

        let progress = Progress::from_issues(&issues, &duration, &window);
        assert_eq!(progress.net_change(), 2);
        assert_eq!(progress.net_label(), "📉 +2");
    }

    #[test]
    fn test_milestones_not_counted() {
        let issues = BTreeSet::from([issue("A-1", "Epic"), issue("A-2", "Bug")]);
        let progress = Progress::from_issues(&issues, &BTreeSet::new(), &window());
        assert_eq!(progress.total, 1);
    }
}
