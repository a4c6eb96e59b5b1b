use crate::models::SessionRecord;
use crate::score::round_hundredths;

const MS_PER_HOUR: f64 = 3_600_000.0;
// Anything longer is a stuck session from an old glitch, not real tutoring time.
const MAX_SESSION_MS: i64 = 5 * 3_600_000;

pub fn num_past_sessions(past_sessions: Option<&[SessionRecord]>) -> usize {
    past_sessions.map_or(0, <[SessionRecord]>::len)
}

/// Total verified hours across past sessions.
///
/// Returns `None` when the sessions were not loaded, or were loaded only as
/// references without their timestamps.
pub fn verified_hours(past_sessions: Option<&[SessionRecord]>) -> Option<f64> {
    let sessions = past_sessions?;
    let first = match sessions.first() {
        Some(first) => first,
        None => return Some(0.0),
    };

    if first.created_at.is_none() {
        return None;
    }

    let total_ms: i64 = sessions.iter().map(verified_duration_ms).sum();
    Some(round_hundredths(total_ms as f64 / MS_PER_HOUR))
}

fn verified_duration_ms(session: &SessionRecord) -> i64 {
    let (Some(joined_at), Some(ended_at)) = (session.volunteer_joined_at, session.ended_at) else {
        return 0;
    };

    let duration_ms = (ended_at - joined_at).num_milliseconds();
    if !(0..=MAX_SESSION_MS).contains(&duration_ms) {
        return 0;
    }
    duration_ms
}

pub fn format_hours(hours: f64) -> String {
    format!("{hours:.2}")
}
