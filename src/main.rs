use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod attendance;
mod config;
mod db;
mod error;
mod import;
mod models;
mod registry;
mod report;

use crate::config::Config;
use crate::models::ClassName;

#[derive(Parser)]
#[command(name = "ebd-attendance")]
#[command(about = "Sunday school (EBD) enrollment and attendance tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small sample congregation
    Seed,
    /// Import students, classes and attendance sessions from CSV files
    Import {
        #[arg(long)]
        students: Option<PathBuf>,
        #[arg(long)]
        classes: Option<PathBuf>,
        #[arg(long)]
        attendance: Option<PathBuf>,
    },
    /// Show one student's attendance and session history
    Stats {
        #[arg(long)]
        student: Uuid,
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown attendance report
    Report {
        #[arg(long)]
        class: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// List students whose class has no class record
    Orphans,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
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
        Commands::Import {
            students,
            classes,
            attendance,
        } => {
            if students.is_none() && classes.is_none() && attendance.is_none() {
                anyhow::bail!("nothing to import: pass --students, --classes or --attendance");
            }

            if let Some(path) = classes {
                let file = import::open_csv(&path)?;
                let rows = import::read_classes_csv(file)?;
                let written = db::upsert_classes(&pool, &rows).await?;
                println!("Imported {written} classes from {}.", path.display());
            }
            if let Some(path) = students {
                let file = import::open_csv(&path)?;
                let rows = import::read_students_csv(file)?;
                let written = db::upsert_students(&pool, &rows).await?;
                println!("Imported {written} students from {}.", path.display());
            }
            if let Some(path) = attendance {
                let file = import::open_csv(&path)?;
                let rows = import::read_attendance_csv(file)?;
                let inserted = db::insert_events(&pool, &rows).await?;
                println!(
                    "Inserted {inserted} of {} attendance sessions from {}.",
                    rows.len(),
                    path.display()
                );
            }
        }
        Commands::Stats {
            student: student_id,
            json,
        } => {
            let Some(student) = db::fetch_student(&pool, student_id).await? else {
                anyhow::bail!("no student with id {student_id}");
            };
            let events = db::fetch_events(&pool).await?;
            let stats = attendance::compute_attendance_stats(&student, &events);

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }

            println!("{}", report::format_student_line(&student, &stats));
            println!("Badge: {}", stats.status.badge_color());
            if stats.events.is_empty() {
                println!("No sessions recorded since enrollment.");
                return Ok(());
            }
            for outcome in stats.history(student.id) {
                println!(
                    "- {}: {}",
                    outcome.date,
                    if outcome.present { "present" } else { "absent" }
                );
            }
        }
        Commands::Report { class, out } => {
            let classes = db::fetch_classes(&pool).await?;
            let students = db::fetch_students(&pool, class.as_deref()).await?;
            let events = db::fetch_events(&pool).await?;
            let class_filter = class.map(ClassName::new);

            let report = report::build_report(class_filter.as_ref(), &classes, &students, &events);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Orphans => {
            let classes = db::fetch_classes(&pool).await?;
            let students = db::fetch_students(&pool, None).await?;
            let orphans = registry::find_orphaned_students(&classes, &students);

            if orphans.is_empty() {
                println!("Every student references an existing class.");
                return Ok(());
            }

            for student in orphans {
                tracing::warn!(student_id = %student.id, class_name = %student.class_name, "orphaned class reference");
                println!("- {} ({}) -> {}", student.name, student.id, student.class_name);
            }
        }
    }

    Ok(())
}
