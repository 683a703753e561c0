use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit trail row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct ActivityEntry {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub action: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    #[serde(rename = "entityId")]
    pub entity_id: String,
    #[serde(rename = "targetUserId", skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub user_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub target_user_id: Option<String>,
}

impl CreateActivity {
    pub fn new(
        user_id: impl Into<String>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            target_user_id: None,
        }
    }

    pub fn with_target(mut self, user_id: impl Into<String>) -> Self {
        self.target_user_id = Some(user_id.into());
        self
    }
}

/// Raw counts behind the dashboard. `recent_*` counts the subset created
/// (or joined, or registered for) in the last 30 days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    pub total_projects: i64,
    pub recent_projects: i64,
    pub total_teams: i64,
    pub recent_teams: i64,
    pub total_papers: i64,
    pub recent_papers: i64,
    pub upcoming_events: i64,
    pub recent_events: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_projects: i64,
    pub total_teams: i64,
    pub total_papers: i64,
    pub upcoming_events: i64,
    pub projects_growth: i64,
    pub teams_growth: i64,
    pub papers_growth: i64,
    pub events_growth: i64,
}

/// Percentage of `total` that is `recent`, rounded; 0 when `total` is 0.
pub fn growth_percentage(recent: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    let recent = recent.clamp(0, total);
    ((recent as f64 / total as f64) * 100.0).round() as i64
}

impl From<DashboardCounts> for DashboardStats {
    fn from(c: DashboardCounts) -> Self {
        Self {
            total_projects: c.total_projects,
            total_teams: c.total_teams,
            total_papers: c.total_papers,
            upcoming_events: c.upcoming_events,
            projects_growth: growth_percentage(c.recent_projects, c.total_projects),
            teams_growth: growth_percentage(c.recent_teams, c.total_teams),
            papers_growth: growth_percentage(c.recent_papers, c.total_papers),
            events_growth: growth_percentage(c.recent_events, c.upcoming_events),
        }
    }
}
