use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod baseline;
mod db;
mod frames;
mod ingest;
mod insights;
mod models;
mod report;
mod snapshot;
mod source;
mod summary;

#[derive(Parser)]
#[command(name = "fatigue-watch")]
#[command(about = "Controller fatigue monitoring and readiness tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// One-time ingestion of the roster, shift-history, and live-sample datasets
    Seed {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// List the controller roster
    Roster {
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Look up a single controller
    Controller {
        #[arg(long)]
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Manually add or correct a roster entry
    AddController {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        sector_id: String,
        #[arg(long)]
        sector_name: String,
        #[arg(long)]
        shift_group: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        experience_years: Option<i32>,
        #[arg(long)]
        birth_year: Option<i32>,
        #[arg(long)]
        baseline_readiness: Option<f64>,
    },
    /// Sector-grouped roster view with primary/backup buckets
    Sectors {
        #[arg(long)]
        json: bool,
    },
    /// Shift-summary report, most recent first
    #[command(group(
        ArgGroup::new("scope")
            .args(["sector", "controller"])
            .multiple(false)
    ))]
    Summaries {
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        controller: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Ordered live-snapshot frames for replay
    Frames {
        #[arg(long)]
        json: bool,
    },
    /// Narrative operational insights
    #[command(group(
        ArgGroup::new("scope")
            .args(["sector", "controller"])
            .multiple(false)
    ))]
    Insights {
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        controller: Option<String>,
    },
    /// Supervisor-action log, most recent first
    Actions {
        #[arg(long)]
        controller: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long)]
        json: bool,
    },
    /// Append a supervisor action
    LogAction {
        #[arg(long)]
        controller: String,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        message: String,
    },
    /// Generate a markdown operations report
    #[command(group(
        ArgGroup::new("scope")
            .args(["sector", "controller"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        controller: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { data_dir } => {
            let outcome = ingest::run_seed(&pool, &data_dir).await?;
            if outcome.applied {
                let plan = &outcome.plan;
                println!(
                    "Seeded {} controllers, {} shift records, {} live samples.",
                    plan.controllers.len(),
                    plan.shifts.len(),
                    plan.samples.len()
                );
                println!(
                    "Skipped {} controller rows, {} shift rows, {} sample rows.",
                    plan.skipped_controllers, plan.skipped_shifts, plan.skipped_samples
                );
            } else {
                println!("Store already seeded; nothing inserted.");
            }
        }
        Commands::Roster { sector, json } => {
            let controllers = db::fetch_controllers(&pool, sector.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&controllers)?);
            } else if controllers.is_empty() {
                println!("No controllers on the roster.");
            } else {
                for c in &controllers {
                    println!(
                        "- {} ({}) sector {}, {} role, group {}, baseline readiness {:.2}",
                        c.name,
                        c.controller_id,
                        c.sector_name,
                        c.roster_role.as_str(),
                        c.shift_group,
                        c.baseline_readiness
                    );
                }
            }
        }
        Commands::Controller { id, json } => {
            match db::fetch_controller(&pool, &id).await? {
                Some(c) if json => println!("{}", serde_json::to_string_pretty(&c)?),
                Some(c) => {
                    println!("{} ({})", c.name, c.controller_id);
                    println!(
                        "  sector {} ({}), group {}, {} role",
                        c.sector_name,
                        c.sector_id,
                        c.shift_group,
                        c.roster_role.as_str()
                    );
                    println!("  baseline readiness {:.2}", c.baseline_readiness);
                    println!(
                        "  baseline factors: blink {:.0}/min, speech {:.0} wpm, response delay {:.2}s, tone stability {:.2}",
                        c.baseline.blink_rate,
                        c.baseline.speech_rate,
                        c.baseline.response_delay,
                        c.baseline.tone_stability
                    );
                }
                None => println!("No controller with id {id}."),
            }
        }
        Commands::AddController {
            id,
            name,
            sector_id,
            sector_name,
            shift_group,
            role,
            gender,
            experience_years,
            birth_year,
            baseline_readiness,
        } => {
            let history = db::fetch_shift_rows(&pool, None, Some(&id)).await?;
            let profile = models::ControllerProfile {
                controller_id: id,
                name,
                experience_years,
                birth_year,
                gender: models::Gender::parse(gender.as_deref()),
                sector_id,
                sector_name,
                shift_group,
                roster_role: models::RosterRole::parse(role.as_deref()),
                baseline_readiness: models::round2(
                    baseline_readiness.unwrap_or(0.85).clamp(0.5, 0.99),
                ),
                baseline: baseline::derive_baseline(&history),
            };
            db::upsert_controller(&pool, &profile).await?;
            println!("Roster entry saved for {}.", profile.controller_id);
        }
        Commands::Sectors { json } => {
            let controllers = db::fetch_controllers(&pool, None).await?;
            let sectors = report::group_sectors(&controllers);
            if json {
                println!("{}", serde_json::to_string_pretty(&sectors)?);
            } else if sectors.is_empty() {
                println!("No controllers on the roster.");
            } else {
                for sector in &sectors {
                    println!("{} ({})", sector.sector_name, sector.sector_id);
                    let names = |bucket: &[models::ControllerProfile]| {
                        bucket
                            .iter()
                            .map(|c| c.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    };
                    println!("  primary: {}", names(&sector.primary));
                    println!("  backup: {}", names(&sector.backup));
                }
            }
        }
        Commands::Summaries {
            sector,
            controller,
            limit,
            json,
        } => {
            let rows =
                db::fetch_shift_rows(&pool, sector.as_deref(), controller.as_deref()).await?;
            let summaries: Vec<_> = rows
                .iter()
                .filter_map(summary::map_shift_summary)
                .take(limit)
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("No summarizable shifts on record.");
            } else {
                for item in &summaries {
                    let note = item
                        .note
                        .as_deref()
                        .map(|n| format!(" ({n})"))
                        .unwrap_or_default();
                    println!(
                        "- {} on {}: readiness {:.2}, peak fatigue {:.2}, post-shift delta {:+.2}{}",
                        item.controller_id,
                        item.shift_date,
                        item.pre_shift_readiness,
                        item.peak_fatigue,
                        item.post_shift_delta,
                        note
                    );
                }
            }
        }
        Commands::Frames { json } => {
            let samples = db::fetch_sample_rows(&pool).await?;
            let controllers = db::fetch_controllers(&pool, None).await?;
            let frame_list = frames::build_frames(&samples, &controllers);
            if json {
                println!("{}", serde_json::to_string_pretty(&frame_list)?);
            } else {
                let mut cursor = frames::FrameCursor::new(frame_list.len());
                for _ in 0..frame_list.len() {
                    let Some(index) = cursor.current() else {
                        break;
                    };
                    let frame = &frame_list[index];
                    let date = frame
                        .shift_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "unscheduled".to_string());
                    println!(
                        "Frame {}: {} / {} ({} snapshots)",
                        index + 1,
                        date,
                        frame.sample_block,
                        frame.snapshots.len()
                    );
                    for snap in &frame.snapshots {
                        println!(
                            "  - {} score {:.2} [{}] readiness {:.2}: {}",
                            snap.controller_id,
                            snap.fatigue_score,
                            snap.status,
                            snap.readiness_level,
                            snap.recommendation
                        );
                    }
                    cursor.advance();
                }
            }
        }
        Commands::Insights { sector, controller } => {
            let rows =
                db::fetch_shift_rows(&pool, sector.as_deref(), controller.as_deref()).await?;
            for line in insights::build_insights(&rows) {
                println!("- {line}");
            }
        }
        Commands::Actions {
            controller,
            limit,
            json,
        } => {
            let actions = db::fetch_actions(&pool, controller.as_deref(), limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&actions)?);
            } else if actions.is_empty() {
                println!("No supervisor actions logged.");
            } else {
                for action in &actions {
                    println!(
                        "- [{}] {}: {} - {}",
                        action.created_at.format("%Y-%m-%d %H:%M"),
                        action.controller_id,
                        action.kind,
                        action.message
                    );
                }
            }
        }
        Commands::LogAction {
            controller,
            kind,
            message,
        } => {
            let action = db::insert_action(&pool, &controller, &kind, &message).await?;
            println!("Logged action {} for {}.", action.id, action.controller_id);
        }
        Commands::Report {
            sector,
            controller,
            out,
        } => {
            let scope = sector.as_deref().or(controller.as_deref());
            let controllers = db::fetch_controllers(&pool, sector.as_deref()).await?;
            let shifts =
                db::fetch_shift_rows(&pool, sector.as_deref(), controller.as_deref()).await?;
            let generated = chrono::Utc::now().date_naive();
            let output = report::build_report(scope, generated, &controllers, &shifts);
            std::fs::write(&out, output)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
