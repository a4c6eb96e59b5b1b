use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Read model of a volunteer (or student) record, loaded fresh per request.
#[derive(Debug, Clone)]
pub struct VolunteerSnapshot {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub is_volunteer: bool,
    pub volunteer_partner_org: Option<String>,
    pub last_notification: Option<NotificationRef>,
    pub last_session: Option<SessionRef>,
    /// `None` when the sessions were never fetched, as opposed to fetched and empty.
    pub past_sessions: Option<Vec<SessionRecord>>,
    pub phone: Option<String>,
}

impl VolunteerSnapshot {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationRef {
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRef {
    pub created_at: DateTime<Utc>,
}

/// A past session. Only `id` is set when the session is an unpopulated reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    pub volunteer_joined_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn reference(id: Uuid) -> Self {
        Self {
            id,
            created_at: None,
            volunteer_joined_at: None,
            ended_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VolunteerRanking {
    pub volunteer_id: Uuid,
    pub volunteer_name: String,
    pub volunteer_email: String,
    pub partner_org: Option<String>,
    pub score: f64,
    pub past_session_count: usize,
}

#[derive(Debug, Clone)]
pub struct PartnerOrgSummary {
    pub partner_org: String,
    pub volunteer_count: usize,
    pub avg_score: f64,
}

/// Public profile view with every derived value attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerProfile {
    pub id: Uuid,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub is_volunteer: bool,
    pub created_at: DateTime<Utc>,
    pub phone: Option<String>,
    pub phone_pretty: Option<String>,
    pub num_past_sessions: usize,
    pub num_volunteer_session_hours: Option<String>,
    pub math_coaching_only: Option<bool>,
    pub volunteer_point_rank: Option<f64>,
}
