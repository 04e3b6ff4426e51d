use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

mod compose;
mod db;
mod deadlines;
mod eligibility;
mod models;
mod reminders;
mod resources;

#[derive(Parser)]
#[command(name = "autoremind")]
#[command(about = "Assignment deadline reminder pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InspectTable {
    Students,
    AssignmentResources,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Print raw rows from a table for quick checks
    Inspect {
        #[arg(long, value_enum, default_value = "students")]
        table: InspectTable,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Evaluate every student and draft reminder bundles
    Remind {
        #[arg(long, default_value = "shared_data/deadlines.csv")]
        deadlines_csv: PathBuf,
        #[arg(long)]
        limit: Option<i64>,
        /// Dump bundles as JSON instead of the readable summary
        #[arg(long)]
        json: bool,
        /// Also write the discord_id,message hand-off CSV to this path
        #[arg(long)]
        discord_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the reminder Postgres instance")?;

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
        Commands::Inspect { table, limit } => match table {
            InspectTable::Students => {
                let students = db::fetch_students(&pool, limit).await?;
                println!("Retrieved {} students.", students.len());
                for (idx, student) in students.iter().enumerate() {
                    println!("Row {}: {:?}", idx + 1, student);
                }
            }
            InspectTable::AssignmentResources => {
                let rows = db::fetch_resource_rows(&pool).await?;
                let take = limit.map(|limit| limit.max(0) as usize).unwrap_or(rows.len());
                println!("Retrieved {} resource rows.", rows.len());
                for (idx, row) in rows.iter().take(take).enumerate() {
                    println!("Row {}: {:?}", idx + 1, row);
                }
            }
        },
        Commands::Remind {
            deadlines_csv,
            limit,
            json,
            discord_out,
        } => {
            let deadline_catalog = deadlines::DeadlineCatalog::load(&deadlines_csv)?;
            if deadline_catalog.is_empty() {
                tracing::warn!(
                    csv = %deadlines_csv.display(),
                    "deadline catalog is empty; no reminder can fire"
                );
            }
            let resource_rows = db::fetch_resource_rows(&pool).await?;
            let resource_catalog = resources::ResourceCatalog::build(&resource_rows, &deadline_catalog);
            let students = db::fetch_students(&pool, limit).await?;

            // One cutoff for the whole batch.
            let today = Local::now().naive_local();
            info!(students = students.len(), "evaluating notification windows");
            let bundles = reminders::gather_reminders(&students, &resource_catalog, today);

            if json {
                println!("{}", serde_json::to_string_pretty(&bundles)?);
            } else {
                print!("{}", reminders::render_summary(&bundles));
            }

            if let Some(path) = discord_out {
                let written =
                    reminders::write_channel_csv(&bundles, models::ChannelKind::Discord, &path)?;
                println!("Wrote {written} discord messages to {}.", path.display());
            }
        }
    }

    Ok(())
}
