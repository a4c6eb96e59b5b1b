use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::hours;
use crate::models::{PartnerOrgSummary, VolunteerSnapshot};
use crate::phone;
use crate::score;

const NO_PARTNER: &str = "(no partner org)";

pub fn summarize_by_partner_org(volunteers: &[VolunteerSnapshot], now: DateTime<Utc>) -> Vec<PartnerOrgSummary> {
    let mut map: std::collections::HashMap<String, (usize, f64)> =
        std::collections::HashMap::new();

    for ranking in score::rank_volunteers(volunteers, now) {
        let key = ranking.partner_org.unwrap_or_else(|| NO_PARTNER.to_string());
        let entry = map.entry(key).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += ranking.score;
    }

    let mut summaries: Vec<PartnerOrgSummary> = map
        .into_iter()
        .map(|(partner_org, (count, total_score))| PartnerOrgSummary {
            partner_org,
            volunteer_count: count,
            avg_score: if count == 0 {
                0.0
            } else {
                total_score / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.volunteer_count
            .cmp(&a.volunteer_count)
            .then_with(|| a.partner_org.cmp(&b.partner_org))
    });
    summaries
}

pub fn build_report(
    partner_org: Option<&str>,
    volunteers: &[VolunteerSnapshot],
    now: DateTime<Utc>,
    limit: usize,
) -> String {
    let rankings = score::rank_volunteers(volunteers, now);
    let summaries = summarize_by_partner_org(volunteers, now);

    let mut output = String::new();
    let scope_label = partner_org.unwrap_or("all partner orgs");

    let _ = writeln!(output, "# Volunteer Outreach Report");
    let _ = writeln!(
        output,
        "Generated for {} at {}",
        scope_label,
        now.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Partner Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No volunteers found.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} volunteers (avg score {:.2})",
                summary.partner_org, summary.volunteer_count, summary.avg_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Outreach Priority");

    if rankings.is_empty() {
        let _ = writeln!(output, "No volunteers to rank.");
    } else {
        for ranking in rankings.iter().take(limit) {
            let _ = writeln!(
                output,
                "- {} ({}) score {:.2} across {} past sessions",
                ranking.volunteer_name,
                ranking.volunteer_email,
                ranking.score,
                ranking.past_session_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Verified Hours");

    let mut by_hours: Vec<(&VolunteerSnapshot, Option<f64>)> = volunteers
        .iter()
        .filter(|volunteer| volunteer.is_volunteer)
        .map(|volunteer| (volunteer, hours::verified_hours(volunteer.past_sessions.as_deref())))
        .collect();
    by_hours.sort_by(|a, b| {
        b.1.unwrap_or(-1.0)
            .partial_cmp(&a.1.unwrap_or(-1.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if by_hours.is_empty() {
        let _ = writeln!(output, "No volunteers to report.");
    } else {
        for (volunteer, verified) in by_hours.iter().take(limit) {
            let hours_label = verified.map_or_else(|| "unknown".to_string(), hours::format_hours);
            let phone_label = phone::format_for_display(volunteer.phone.as_deref())
                .display
                .unwrap_or_else(|| "no phone on file".to_string());
            let _ = writeln!(
                output,
                "- {} ({}): {} hours",
                volunteer.full_name(),
                phone_label,
                hours_label
            );
        }
    }

    output
}
