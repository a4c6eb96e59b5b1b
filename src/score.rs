use chrono::{DateTime, Utc};

use crate::hours;
use crate::models::{VolunteerRanking, VolunteerSnapshot};

const MS_PER_WEEK: f64 = 604_800_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;

const NEW_VOLUNTEER_POINTS: f64 = 2.0;
const PARTNER_ORG_POINTS: f64 = 1.0;
const LAST_SESSION_RATE: f64 = 0.5;
const RECENT_NOTIFICATION_MINUTES: f64 = 5.0;
const RECENT_NOTIFICATION_PENALTY: f64 = 10_000.0;

/// Outreach priority for a volunteer. Higher means contact sooner.
///
/// Panics when called for a record that is not a volunteer; gate with
/// [`volunteer_point_rank`] when the record type is not known up front.
pub fn compute_score(volunteer: &VolunteerSnapshot, now: DateTime<Utc>) -> f64 {
    assert!(
        volunteer.is_volunteer,
        "compute_score called for non-volunteer {}",
        volunteer.id
    );

    let mut points = 0.0;

    if hours::num_past_sessions(volunteer.past_sessions.as_deref()) == 0 {
        points += NEW_VOLUNTEER_POINTS;
    }

    if volunteer.volunteer_partner_org.is_some() {
        points += PARTNER_ORG_POINTS;
    }

    // 1 point per week since last notification
    let notified_at = volunteer
        .last_notification
        .map(|notification| notification.sent_at)
        .unwrap_or(volunteer.created_at);
    points += weeks_since(notified_at, now);

    // 1 point per 2 weeks since last session, full rate when there never was one
    match volunteer.last_session {
        Some(session) => points += LAST_SESSION_RATE * weeks_since(session.created_at, now),
        None => points += weeks_since(volunteer.created_at, now),
    }

    if let Some(notification) = volunteer.last_notification {
        if minutes_since(notification.sent_at, now) < RECENT_NOTIFICATION_MINUTES {
            points -= RECENT_NOTIFICATION_PENALTY;
        }
    }

    round_hundredths(points)
}

/// `None` for records that carry no meaningful rank.
pub fn volunteer_point_rank(volunteer: &VolunteerSnapshot, now: DateTime<Utc>) -> Option<f64> {
    if !volunteer.is_volunteer {
        return None;
    }
    Some(compute_score(volunteer, now))
}

pub fn rank_volunteers(volunteers: &[VolunteerSnapshot], now: DateTime<Utc>) -> Vec<VolunteerRanking> {
    let mut values: Vec<VolunteerRanking> = volunteers
        .iter()
        .filter_map(|volunteer| {
            let score = volunteer_point_rank(volunteer, now)?;
            Some(VolunteerRanking {
                volunteer_id: volunteer.id,
                volunteer_name: volunteer.full_name(),
                volunteer_email: volunteer.email.clone(),
                partner_org: volunteer.volunteer_partner_org.clone(),
                score,
                past_session_count: hours::num_past_sessions(volunteer.past_sessions.as_deref()),
            })
        })
        .collect();

    values.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    values
}

pub fn weeks_since(then: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - then).num_milliseconds() as f64 / MS_PER_WEEK
}

pub fn minutes_since(then: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - then).num_milliseconds() as f64 / MS_PER_MINUTE
}

/// Rounds half away from zero.
pub fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationRef, SessionRecord, SessionRef};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn sample_volunteer() -> VolunteerSnapshot {
        VolunteerSnapshot {
            id: Uuid::new_v4(),
            email: "avery@example.com".to_string(),
            first_name: "Avery".to_string(),
            last_name: "Lee".to_string(),
            created_at: created(),
            is_volunteer: true,
            volunteer_partner_org: None,
            last_notification: None,
            last_session: None,
            past_sessions: Some(Vec::new()),
            phone: Some("5551234567".to_string()),
        }
    }

    fn with_sessions(mut volunteer: VolunteerSnapshot, count: usize) -> VolunteerSnapshot {
        volunteer.past_sessions = Some(
            (0..count)
                .map(|_| SessionRecord::reference(Uuid::new_v4()))
                .collect(),
        );
        volunteer
    }

    #[test]
    fn new_volunteer_three_weeks_old_scores_eight() {
        let volunteer = sample_volunteer();
        let now = created() + Duration::days(21);
        assert_eq!(compute_score(&volunteer, now), 8.0);
    }

    #[test]
    fn new_volunteer_bonus_applies_only_without_sessions() {
        let now = created() + Duration::days(21);
        let fresh = compute_score(&sample_volunteer(), now);
        let experienced = compute_score(&with_sessions(sample_volunteer(), 3), now);
        assert!((fresh - experienced - 2.0).abs() < 1e-9);
    }

    #[test]
    fn unloaded_sessions_count_as_none() {
        let mut volunteer = sample_volunteer();
        volunteer.past_sessions = None;
        let now = created() + Duration::days(7);
        assert_eq!(compute_score(&volunteer, now), 4.0);
    }

    #[test]
    fn partner_org_adds_one_point() {
        let mut volunteer = sample_volunteer();
        volunteer.volunteer_partner_org = Some("example".to_string());
        assert_eq!(compute_score(&volunteer, created()), 3.0);
    }

    #[test]
    fn weeks_are_prorated_not_floored() {
        let volunteer = with_sessions(sample_volunteer(), 1);
        let now = created() + Duration::days(10) + Duration::hours(12);
        // 1.5 weeks counted twice
        assert_eq!(compute_score(&volunteer, now), 3.0);
    }

    #[test]
    fn last_session_accrues_at_half_rate() {
        let mut volunteer = with_sessions(sample_volunteer(), 2);
        let now = created() + Duration::days(28);
        volunteer.last_notification = Some(NotificationRef {
            sent_at: now - Duration::days(7),
        });
        volunteer.last_session = Some(SessionRef {
            created_at: now - Duration::days(14),
        });
        // 1 week since notification + 0.5 * 2 weeks since session
        assert_eq!(compute_score(&volunteer, now), 2.0);
    }

    #[test]
    fn recent_notification_vetoes_volunteer() {
        let mut volunteer = sample_volunteer();
        let now = created() + Duration::days(21);
        let baseline = compute_score(&volunteer, now);

        volunteer.last_notification = Some(NotificationRef {
            sent_at: now - Duration::minutes(2),
        });
        let penalized = compute_score(&volunteer, now);
        assert!(penalized <= baseline - 10_000.0);
    }

    #[test]
    fn notification_exactly_five_minutes_old_is_not_penalized() {
        let mut volunteer = sample_volunteer();
        let now = created() + Duration::days(7);
        volunteer.last_notification = Some(NotificationRef {
            sent_at: now - Duration::minutes(5),
        });
        assert!(compute_score(&volunteer, now) > 0.0);
    }

    #[test]
    fn score_rounds_to_two_decimals() {
        let volunteer = with_sessions(sample_volunteer(), 1);
        let now = created() + Duration::days(1);
        // 2 * (1 / 7) = 0.2857...
        assert_eq!(compute_score(&volunteer, now), 0.29);
    }

    #[test]
    fn non_volunteers_have_no_rank() {
        let mut student = sample_volunteer();
        student.is_volunteer = false;
        assert_eq!(volunteer_point_rank(&student, created()), None);
    }

    #[test]
    #[should_panic(expected = "non-volunteer")]
    fn compute_score_rejects_non_volunteers() {
        let mut student = sample_volunteer();
        student.is_volunteer = false;
        compute_score(&student, created());
    }

    #[test]
    fn rankings_sort_by_score_and_skip_students() {
        let now = created() + Duration::days(14);
        let veteran = with_sessions(sample_volunteer(), 4);
        let newcomer = sample_volunteer();
        let mut student = sample_volunteer();
        student.is_volunteer = false;

        let rankings = rank_volunteers(&[veteran, newcomer.clone(), student], now);
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0].volunteer_id, newcomer.id);
        assert_eq!(rankings[0].past_session_count, 0);
        assert_eq!(rankings[1].past_session_count, 4);
    }
}
