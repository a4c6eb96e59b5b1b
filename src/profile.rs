use chrono::{DateTime, Utc};

use crate::hours;
use crate::models::{VolunteerProfile, VolunteerSnapshot};
use crate::partner::{self, OrgManifests};
use crate::score;

/// Builds the public profile. `phone_pretty` comes from the phone read path so
/// that the caller decides whether a correction is fired.
pub fn build_profile(
    volunteer: &VolunteerSnapshot,
    phone_pretty: Option<String>,
    manifests: &OrgManifests,
    now: DateTime<Utc>,
) -> VolunteerProfile {
    let past_sessions = volunteer.past_sessions.as_deref();

    VolunteerProfile {
        id: volunteer.id,
        email: volunteer.email.clone(),
        firstname: volunteer.first_name.clone(),
        lastname: volunteer.last_name.clone(),
        is_volunteer: volunteer.is_volunteer,
        created_at: volunteer.created_at,
        phone: volunteer.phone.clone(),
        phone_pretty,
        num_past_sessions: hours::num_past_sessions(past_sessions),
        num_volunteer_session_hours: hours::verified_hours(past_sessions).map(hours::format_hours),
        math_coaching_only: partner::math_coaching_only(volunteer, manifests),
        volunteer_point_rank: score::volunteer_point_rank(volunteer, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionRecord;
    use crate::phone;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn snapshot() -> VolunteerSnapshot {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        VolunteerSnapshot {
            id: Uuid::new_v4(),
            email: "kiara@example.com".to_string(),
            first_name: "Kiara".to_string(),
            last_name: "Patel".to_string(),
            created_at,
            is_volunteer: true,
            volunteer_partner_org: Some("example".to_string()),
            last_notification: None,
            last_session: None,
            past_sessions: Some(vec![SessionRecord {
                id: Uuid::new_v4(),
                created_at: Some(created_at),
                volunteer_joined_at: Some(created_at),
                ended_at: Some(created_at + Duration::minutes(90)),
            }]),
            phone: Some("(555) 123-4567".to_string()),
        }
    }

    #[test]
    fn profile_carries_derived_values() {
        let volunteer = snapshot();
        let manifests =
            OrgManifests::from_json(r#"{ "example": { "mathCoachingOnly": true } }"#).expect("manifests parse");
        let now = volunteer.created_at + Duration::days(14);
        let pretty = phone::format_for_display(volunteer.phone.as_deref()).display;

        let profile = build_profile(&volunteer, pretty, &manifests, now);
        assert_eq!(profile.phone_pretty.as_deref(), Some("555-123-4567"));
        assert_eq!(profile.num_past_sessions, 1);
        assert_eq!(profile.num_volunteer_session_hours.as_deref(), Some("1.50"));
        assert_eq!(profile.math_coaching_only, Some(true));
        // partner org + 2 weeks since creation + 2 weeks with no last session
        assert_eq!(profile.volunteer_point_rank, Some(5.0));
    }

    #[test]
    fn student_profile_has_no_volunteer_values() {
        let mut student = snapshot();
        student.is_volunteer = false;
        let profile = build_profile(&student, None, &OrgManifests::default(), Utc::now());
        assert_eq!(profile.volunteer_point_rank, None);
        assert_eq!(profile.math_coaching_only, None);
    }

    #[test]
    fn profile_serializes_camel_case() {
        let volunteer = snapshot();
        let profile = build_profile(&volunteer, None, &OrgManifests::default(), volunteer.created_at);
        let json = serde_json::to_value(&profile).expect("profile serializes");
        assert_eq!(json["numPastSessions"], 1);
        assert_eq!(json["numVolunteerSessionHours"], "1.50");
        assert!(json["phonePretty"].is_null());
    }
}
