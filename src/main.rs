use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

mod config;
mod db;
mod hours;
mod models;
mod partner;
mod phone;
mod profile;
mod report;
mod score;
mod telemetry;

use crate::config::AppConfig;
use crate::db::{PgPhoneStore, SessionDetail, VolunteerFilter};
use crate::partner::OrgManifests;
use crate::phone::PhoneNormalizer;

#[derive(Parser)]
#[command(name = "volunteer-stats")]
#[command(about = "Volunteer outreach ranking, session hours and profile stats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import volunteers from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank volunteers by outreach priority
    Rank {
        #[arg(long)]
        partner_org: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown outreach report
    Report {
        #[arg(long)]
        partner_org: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print a volunteer's profile with derived stats as JSON
    Profile {
        #[arg(long)]
        email: String,
    },
    /// Store a phone number from free-form input
    SetPhone {
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.log_level)?;

    let manifests = match &config.org_manifests_path {
        Some(path) => OrgManifests::load(path)?,
        None => OrgManifests::default(),
    };
    if manifests.is_empty() {
        warn!("no org manifests loaded; math coaching flags default to false");
    } else {
        info!(orgs = manifests.len(), "org manifests loaded");
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let imported = db::import_csv(&pool, &csv).await?;
            println!("Imported {imported} volunteers from {}.", csv.display());
        }
        Commands::Rank { partner_org, limit } => {
            let filter = partner_org
                .as_deref()
                .map_or(VolunteerFilter::All, VolunteerFilter::PartnerOrg);
            let volunteers = db::fetch_snapshots(&pool, filter, SessionDetail::References).await?;
            let rankings = score::rank_volunteers(&volunteers, Utc::now());

            if rankings.is_empty() {
                println!("No volunteers found.");
                return Ok(());
            }

            println!("Top volunteers by outreach priority:");
            for ranking in rankings.iter().take(limit) {
                println!(
                    "- {} ({}, {}) score {:.2} across {} past sessions",
                    ranking.volunteer_name,
                    ranking.volunteer_email,
                    ranking.partner_org.as_deref().unwrap_or("no partner org"),
                    ranking.score,
                    ranking.past_session_count
                );
            }
        }
        Commands::Report {
            partner_org,
            limit,
            out,
        } => {
            let filter = partner_org
                .as_deref()
                .map_or(VolunteerFilter::All, VolunteerFilter::PartnerOrg);
            let volunteers = db::fetch_snapshots(&pool, filter, SessionDetail::Full).await?;
            let report = report::build_report(partner_org.as_deref(), &volunteers, Utc::now(), limit);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Profile { email } => {
            let volunteer = db::fetch_snapshot_by_email(&pool, &email, SessionDetail::Full)
                .await?
                .with_context(|| format!("no volunteer with email {email}"))?;

            let normalizer = PhoneNormalizer::new(PgPhoneStore::new(pool.clone()));
            let read = normalizer.display(volunteer.id, volunteer.phone.as_deref());
            let profile = profile::build_profile(&volunteer, read.display, &manifests, Utc::now());
            println!("{}", serde_json::to_string_pretty(&profile)?);

            // Let the correction land before the runtime shuts down.
            if let Some(correction) = read.correction {
                if let Err(err) = correction.await {
                    warn!(error = %err, "phone correction task did not complete");
                }
            }
        }
        Commands::SetPhone { email, phone: raw } => {
            let volunteer = db::fetch_snapshot_by_email(&pool, &email, SessionDetail::References)
                .await?
                .with_context(|| format!("no volunteer with email {email}"))?;

            let stored = phone::set_from_input(Some(&raw));
            db::update_phone(&pool, volunteer.id, stored.as_deref()).await?;
            println!(
                "Phone for {} stored as {}.",
                volunteer.email,
                stored.as_deref().unwrap_or("(empty)")
            );
        }
    }

    Ok(())
}
