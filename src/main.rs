use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod db;
mod models;
mod report;
mod stability;

#[derive(Parser)]
#[command(name = "stability-insights")]
#[command(about = "Project stability trend tracker for release sessions", long_about = None)]
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
    /// Import daily session counts from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank projects by stability trend
    Score {
        #[arg(long)]
        project: Option<String>,
        #[arg(long, default_value_t = 30)]
        period_days: i64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        project: Option<String>,
        #[arg(long, default_value_t = 30)]
        period_days: i64,
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
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} session counts from {}.", csv.display());
        }
        Commands::Score {
            project,
            period_days,
            limit,
            json,
        } => {
            let period_cutoff = stability::cutoff_date(period_days);
            let week_cutoff = stability::cutoff_date(7);
            let projects = db::fetch_projects(&pool, project.as_deref()).await?;

            if projects.is_empty() {
                println!("No projects found.");
                return Ok(());
            }

            let period_series =
                db::fetch_status_series(&pool, period_cutoff, project.as_deref()).await?;
            let week_series =
                db::fetch_status_series(&pool, week_cutoff, project.as_deref()).await?;

            let groups = stability::rank_and_group(&projects, |p| {
                stability::trend(
                    stability::project_crash_free_rate(&period_series, p.id),
                    stability::project_crash_free_rate(&week_series, p.id),
                )
            });

            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
                return Ok(());
            }

            println!("Stability trends (last {period_days} days vs last 7 days):");
            for group in &groups {
                if group.entries.is_empty() {
                    continue;
                }
                println!("{}:", group.category.label());
                for entry in group.entries.iter().take(limit) {
                    let period_rate =
                        stability::project_crash_free_rate(&period_series, entry.project.id);
                    let week_rate =
                        stability::project_crash_free_rate(&week_series, entry.project.id);
                    println!(
                        "- {} ({}) period {}, last 7 days {}, trend {}",
                        entry.project.name,
                        entry.project.slug,
                        report::display_crash_free(period_rate),
                        report::display_crash_free(week_rate),
                        report::display_trend(entry.trend)
                    );
                }
            }
        }
        Commands::Report {
            project,
            period_days,
            out,
        } => {
            let period_cutoff = stability::cutoff_date(period_days);
            let week_cutoff = stability::cutoff_date(7);
            let projects = db::fetch_projects(&pool, project.as_deref()).await?;
            let period_series =
                db::fetch_status_series(&pool, period_cutoff, project.as_deref()).await?;
            let week_series =
                db::fetch_status_series(&pool, week_cutoff, project.as_deref()).await?;

            let report = report::build_report(
                project.as_deref(),
                period_days,
                period_cutoff,
                week_cutoff,
                &projects,
                &period_series,
                &week_series,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
