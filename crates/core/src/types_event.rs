use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    #[serde(rename = "maxParticipants")]
    pub max_participants: Option<i32>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Whether an event with `registered` participants accepts another.
    pub fn has_capacity(&self, registered: usize) -> bool {
        match self.max_participants {
            Some(max) if max >= 0 => registered < max as usize,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct EventRegistration {
    pub id: String,
    #[serde(rename = "eventId")]
    pub event_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "registeredAt")]
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
    pub event_type: Option<String>,
    pub max_participants: Option<i32>,
    pub created_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<String>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    /// Events starting at or after this instant.
    pub starts_after: Option<DateTime<Utc>>,
    /// Events ending at or before this instant.
    pub ends_before: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(event_type) = &self.event_type
            && event.event_type.as_deref() != Some(event_type.as_str())
        {
            return false;
        }
        if let Some(from) = self.starts_after
            && event.start_date < from
        {
            return false;
        }
        if let Some(until) = self.ends_before
            && event.end_date > until
        {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = event.title.to_lowercase().contains(&needle)
                || event
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}
