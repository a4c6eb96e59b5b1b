use std::collections::HashMap;
use std::future::Future;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{NotificationRef, SessionRecord, SessionRef, VolunteerSnapshot};
use crate::phone::{self, PhoneStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub enum VolunteerFilter<'a> {
    All,
    PartnerOrg(&'a str),
    Email(&'a str),
}

/// How much of each volunteer's session history to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDetail {
    /// Session ids only; enough to count, not enough to total hours.
    References,
    Full,
}

pub async fn fetch_snapshots(
    pool: &PgPool,
    filter: VolunteerFilter<'_>,
    detail: SessionDetail,
) -> anyhow::Result<Vec<VolunteerSnapshot>> {
    let mut query = String::from(
        "SELECT v.id, v.email, v.first_name, v.last_name, v.is_volunteer, \
         v.volunteer_partner_org, v.phone, v.created_at, \
         (SELECT MAX(n.sent_at) FROM volunteer_stats.notifications n \
          WHERE n.volunteer_id = v.id) AS last_notification_at, \
         (SELECT MAX(s.created_at) FROM volunteer_stats.sessions s \
          WHERE s.volunteer_id = v.id) AS last_session_at \
         FROM volunteer_stats.volunteers v",
    );

    match filter {
        VolunteerFilter::All => {}
        VolunteerFilter::PartnerOrg(_) => query.push_str(" WHERE v.volunteer_partner_org = $1"),
        VolunteerFilter::Email(_) => query.push_str(" WHERE v.email = $1"),
    }
    query.push_str(" ORDER BY v.created_at");

    let mut rows = sqlx::query(&query);
    match filter {
        VolunteerFilter::All => {}
        VolunteerFilter::PartnerOrg(org) => rows = rows.bind(org.to_string()),
        VolunteerFilter::Email(email) => rows = rows.bind(email.to_lowercase()),
    }

    let records = rows
        .fetch_all(pool)
        .await
        .context("failed to load volunteers")?;

    let ids: Vec<Uuid> = records
        .iter()
        .map(|row| row.try_get("id"))
        .collect::<Result<_, _>>()?;
    let mut sessions = fetch_sessions(pool, &ids, detail).await?;

    let mut snapshots = Vec::with_capacity(records.len());
    for row in records {
        let mut snapshot = snapshot_from_row(&row)?;
        snapshot.past_sessions = Some(sessions.remove(&snapshot.id).unwrap_or_default());
        snapshots.push(snapshot);
    }

    debug!(count = snapshots.len(), ?detail, "loaded volunteer snapshots");
    Ok(snapshots)
}

pub async fn fetch_snapshot_by_email(
    pool: &PgPool,
    email: &str,
    detail: SessionDetail,
) -> anyhow::Result<Option<VolunteerSnapshot>> {
    let snapshots = fetch_snapshots(pool, VolunteerFilter::Email(email), detail).await?;
    Ok(snapshots.into_iter().next())
}

fn snapshot_from_row(row: &PgRow) -> anyhow::Result<VolunteerSnapshot> {
    let last_notification_at: Option<DateTime<Utc>> = row.try_get("last_notification_at")?;
    let last_session_at: Option<DateTime<Utc>> = row.try_get("last_session_at")?;

    Ok(VolunteerSnapshot {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        created_at: row.try_get("created_at")?,
        is_volunteer: row.try_get("is_volunteer")?,
        volunteer_partner_org: row.try_get("volunteer_partner_org")?,
        last_notification: last_notification_at.map(|sent_at| NotificationRef { sent_at }),
        last_session: last_session_at.map(|created_at| SessionRef { created_at }),
        past_sessions: None,
        phone: row.try_get("phone")?,
    })
}

async fn fetch_sessions(
    pool: &PgPool,
    volunteer_ids: &[Uuid],
    detail: SessionDetail,
) -> anyhow::Result<HashMap<Uuid, Vec<SessionRecord>>> {
    let rows = sqlx::query(
        "SELECT volunteer_id, id, created_at, volunteer_joined_at, ended_at \
         FROM volunteer_stats.sessions \
         WHERE volunteer_id = ANY($1) \
         ORDER BY created_at",
    )
    .bind(volunteer_ids)
    .fetch_all(pool)
    .await
    .context("failed to load past sessions")?;

    let mut sessions: HashMap<Uuid, Vec<SessionRecord>> = HashMap::new();
    for row in rows {
        let id: Uuid = row.try_get("id")?;
        let record = match detail {
            SessionDetail::References => SessionRecord::reference(id),
            SessionDetail::Full => SessionRecord {
                id,
                created_at: Some(row.try_get("created_at")?),
                volunteer_joined_at: row.try_get("volunteer_joined_at")?,
                ended_at: row.try_get("ended_at")?,
            },
        };
        sessions
            .entry(row.try_get("volunteer_id")?)
            .or_default()
            .push(record);
    }

    Ok(sessions)
}

pub async fn update_phone(pool: &PgPool, volunteer_id: Uuid, phone: Option<&str>) -> anyhow::Result<()> {
    let result = sqlx::query("UPDATE volunteer_stats.volunteers SET phone = $2 WHERE id = $1")
        .bind(volunteer_id)
        .bind(phone)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        anyhow::bail!("volunteer {volunteer_id} not found");
    }
    Ok(())
}

/// Phone correction writes backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgPhoneStore {
    pool: PgPool,
}

impl PgPhoneStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PhoneStore for PgPhoneStore {
    fn update_phone(
        &self,
        volunteer_id: Uuid,
        phone: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        update_phone(&self.pool, volunteer_id, Some(phone))
    }
}

async fn upsert_volunteer(
    pool: &PgPool,
    email: &str,
    first_name: &str,
    last_name: &str,
    is_volunteer: bool,
    partner_org: Option<&str>,
    phone: Option<&str>,
) -> anyhow::Result<Uuid> {
    let id = sqlx::query(
        r#"
        INSERT INTO volunteer_stats.volunteers
        (id, email, first_name, last_name, is_volunteer, volunteer_partner_org, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (email) DO UPDATE
        SET first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            is_volunteer = EXCLUDED.is_volunteer,
            volunteer_partner_org = EXCLUDED.volunteer_partner_org,
            phone = EXCLUDED.phone
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email.to_lowercase())
    .bind(first_name)
    .bind(last_name)
    .bind(is_volunteer)
    .bind(partner_org)
    .bind(phone)
    .fetch_one(pool)
    .await?
    .try_get("id")?;

    Ok(id)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let now = Utc::now();

    // Phones are seeded in legacy formats on purpose so `profile` exercises the correction.
    let volunteers = vec![
        ("avery.lee@volunteers.example.org", "Avery", "Lee", None, "(415) 555-0132"),
        ("jules.moreno@volunteers.example.org", "Jules", "Moreno", Some("example"), "415-555-0178"),
        ("kiara.patel@volunteers.example.org", "Kiara", "Patel", None, "+442079460958"),
    ];

    let mut ids = HashMap::new();
    for (email, first_name, last_name, partner_org, phone) in volunteers {
        let id = upsert_volunteer(pool, email, first_name, last_name, true, partner_org, Some(phone)).await?;
        ids.insert(email, id);
    }

    let sessions = vec![
        ("seed-session-001", "jules.moreno@volunteers.example.org", 21, Some(90)),
        ("seed-session-002", "jules.moreno@volunteers.example.org", 9, Some(45)),
        // stuck session, excluded from verified hours
        ("seed-session-003", "kiara.patel@volunteers.example.org", 30, Some(60 * 9)),
        ("seed-session-004", "kiara.patel@volunteers.example.org", 4, None),
    ];

    for (source_key, email, days_ago, minutes) in sessions {
        let volunteer_id = *ids.get(email).context("seed session for unknown volunteer")?;
        let created_at = now - Duration::days(days_ago);
        let joined_at = created_at + Duration::minutes(3);
        let ended_at = minutes.map(|minutes| joined_at + Duration::minutes(minutes));

        sqlx::query(
            r#"
            INSERT INTO volunteer_stats.sessions
            (id, volunteer_id, created_at, volunteer_joined_at, ended_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(volunteer_id)
        .bind(created_at)
        .bind(joined_at)
        .bind(ended_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let notifications = vec![
        ("seed-notification-001", "jules.moreno@volunteers.example.org", Duration::days(6)),
        ("seed-notification-002", "kiara.patel@volunteers.example.org", Duration::days(12)),
    ];

    for (source_key, email, age) in notifications {
        let volunteer_id = *ids.get(email).context("seed notification for unknown volunteer")?;
        sqlx::query(
            r#"
            INSERT INTO volunteer_stats.notifications (id, volunteer_id, sent_at, source_key)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(volunteer_id)
        .bind(now - age)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    info!(volunteers = ids.len(), "seed data inserted");
    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        first_name: String,
        last_name: String,
        email: String,
        phone: Option<String>,
        partner_org: Option<String>,
        is_volunteer: bool,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let phone = phone::set_from_input(row.phone.as_deref());
        let partner_org = row.partner_org.as_deref().filter(|org| !org.is_empty());

        upsert_volunteer(
            pool,
            &row.email,
            &row.first_name,
            &row.last_name,
            row.is_volunteer,
            partner_org,
            phone.as_deref(),
        )
        .await
        .with_context(|| format!("failed to import {}", row.email))?;
        imported += 1;
    }

    Ok(imported)
}
