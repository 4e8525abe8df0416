//! Admin dashboard assembly.
//!
//! Only the project counts are computed. The remaining figures and the
//! activity feed are fixed illustrative values.

use serde::{Deserialize, Serialize};
use shared::{ActivityItem, AdminDashboard, DashboardStat, Priority, Project, ProjectStatus};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub fn count_active(projects: &[Project]) -> usize {
    projects
        .iter()
        .filter(|p| p.status == ProjectStatus::Active)
        .count()
}

pub fn admin_dashboard(projects: &[Project]) -> AdminDashboard {
    let active = count_active(projects);

    let stat = |label: &str, value: String, change: &str| DashboardStat {
        label: label.to_string(),
        value,
        change: change.to_string(),
    };

    AdminDashboard {
        total_projects: projects.len(),
        active_projects: active,
        stats: vec![
            stat("Total Projects", projects.len().to_string(), "+12%"),
            stat("Active Projects", active.to_string(), "+5%"),
            stat("Team Members", "24".to_string(), "+2"),
            stat("Monthly Revenue", "$48,250".to_string(), "+18%"),
        ],
        recent_activities: recent_activities(),
    }
}

fn recent_activities() -> Vec<ActivityItem> {
    [
        ("Sarah Chen", "uploaded a new version of", "Homepage Mockups", "10 minutes ago"),
        ("Acme Corp", "approved", "Brand Guidelines v3", "1 hour ago"),
        ("Mike Johnson", "created project", "Mobile App Redesign", "3 hours ago"),
        ("Emma Wilson", "requested changes on", "Product Catalog", "5 hours ago"),
        ("David Park", "completed milestone", "Phase 1 Discovery", "yesterday"),
    ]
    .into_iter()
    .map(|(actor, action, target, time)| ActivityItem {
        actor: actor.to_string(),
        action: action.to_string(),
        target: target.to_string(),
        time: time.to_string(),
    })
    .collect()
}

/// Buttons on the admin dashboard. None of them does anything yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DashboardAction {
    CreateProject,
    InviteUser,
    ExportReport,
    ManageSettings,
}

impl DashboardAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardAction::CreateProject => "create-project",
            DashboardAction::InviteUser => "invite-user",
            DashboardAction::ExportReport => "export-report",
            DashboardAction::ManageSettings => "manage-settings",
        }
    }

    /// Log that the action was requested.
    pub fn trigger(&self) {
        tracing::info!(action = self.as_str(), "admin dashboard action requested");
    }
}

impl fmt::Display for DashboardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DashboardAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create-project" => Ok(DashboardAction::CreateProject),
            "invite-user" => Ok(DashboardAction::InviteUser),
            "export-report" => Ok(DashboardAction::ExportReport),
            "manage-settings" => Ok(DashboardAction::ManageSettings),
            other => Err(format!("unknown dashboard action '{}'", other)),
        }
    }
}

/// Mock projects shown when no backend is available.
pub fn sample_projects() -> Vec<Project> {
    [
        ("Website Redesign", ProjectStatus::Active, Priority::High, 65),
        ("Mobile App Launch", ProjectStatus::Active, Priority::Urgent, 40),
        ("Brand Refresh", ProjectStatus::Completed, Priority::Medium, 100),
        ("Q3 Marketing Campaign", ProjectStatus::Planning, Priority::Medium, 10),
        ("Customer Portal", ProjectStatus::OnHold, Priority::Low, 25),
    ]
    .into_iter()
    .map(|(name, status, priority, progress)| Project {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        status,
        priority,
        client_id: None,
        manager_id: None,
        progress,
        budget: None,
        start_date: None,
        due_date: None,
        created_at: None,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_only_active_projects() {
        let projects = sample_projects();
        assert_eq!(count_active(&projects), 2);

        let dashboard = admin_dashboard(&projects);
        assert_eq!(dashboard.total_projects, 5);
        assert_eq!(dashboard.active_projects, 2);
        assert_eq!(dashboard.stats[1].value, "2");
        assert_eq!(dashboard.recent_activities.len(), 5);
    }

    #[test]
    fn test_empty_project_list() {
        let dashboard = admin_dashboard(&[]);
        assert_eq!(dashboard.active_projects, 0);
        assert_eq!(dashboard.stats[0].value, "0");
        assert!(!dashboard.recent_activities.is_empty());
    }

    #[test]
    fn test_action_labels_round_trip() {
        for action in [
            DashboardAction::CreateProject,
            DashboardAction::InviteUser,
            DashboardAction::ExportReport,
            DashboardAction::ManageSettings,
        ] {
            assert_eq!(action.as_str().parse::<DashboardAction>().unwrap(), action);
        }
        assert!("delete-everything".parse::<DashboardAction>().is_err());
    }
}
