use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

mod cache;
mod config;
mod db;
mod error;
mod logging;
mod models;
mod report;
mod stats;

use crate::cache::RecentCache;
use crate::config::Config;
use crate::db::{PgSubmissionStore, SubmissionStore};
use crate::logging::Verbosity;
use crate::models::{NewSubmission, SubmissionRecord};
use crate::stats::MalformedPolicy;

#[derive(Parser)]
#[command(name = "scouting-stats")]
#[command(about = "Match scouting submissions and per-team statistics", long_about = None)]
struct Cli {
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Log more detail (repeat for trace output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample submissions
    Seed,
    /// Record one scouting observation
    Submit(SubmitArgs),
    /// Import submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show averages for every scouted team
    Stats {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Leave out submissions with missing values instead of failing
        #[arg(long)]
        skip_malformed: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// List submissions recorded from this machine, newest first
    Recent {
        #[arg(long, default_value_t = 6)]
        limit: usize,
    },
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long)]
    team_name: String,
    #[arg(long)]
    team_number: String,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..=10))]
    specimens_autonomous: i32,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..=10))]
    samples_autonomous: i32,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..=20))]
    specimens_teleop: i32,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..=20))]
    samples_teleop: i32,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..=3))]
    ascent: i32,
    #[arg(long)]
    park_specimen_auto: bool,
    #[arg(long)]
    park_teleop_auto: bool,
}

impl From<SubmitArgs> for NewSubmission {
    fn from(args: SubmitArgs) -> Self {
        Self {
            team_name: args.team_name,
            team_number: args.team_number,
            specimens_autonomous: args.specimens_autonomous,
            samples_autonomous: args.samples_autonomous,
            specimens_teleop: args.specimens_teleop,
            samples_teleop: args.samples_teleop,
            ascent: args.ascent,
            park_specimen_auto: args.park_specimen_auto,
            park_teleop_auto: args.park_teleop_auto,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(Verbosity::from_flags(cli.quiet, cli.verbose));

    let config = Config::from_env().context("invalid configuration")?;
    let cache = RecentCache::new(&config.cache_path, config.cache_capacity);

    run(cli.command, &config, &cache).await
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")?;
    debug!(max_connections = config.max_connections, "connected to Postgres");
    Ok(pool)
}

async fn open_store(config: &Config) -> anyhow::Result<PgSubmissionStore> {
    Ok(PgSubmissionStore::new(connect(config).await?))
}

async fn run(command: Commands, config: &Config, cache: &RecentCache) -> anyhow::Result<()> {
    match command {
        Commands::Recent { limit } => show_recent(cache, limit)?,
        Commands::InitDb => {
            let pool = connect(config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let store = open_store(config).await?;
            let inserted = db::seed(&store).await?;
            println!("Seed data inserted ({inserted} new submissions).");
        }
        Commands::Submit(args) => {
            let store = open_store(config).await?;
            let record = submit(&store, cache, args.into()).await?;
            println!(
                "Saved submission for {} ({}).",
                record.team_name, record.team_number
            );
        }
        Commands::Import { csv } => {
            let store = open_store(config).await?;
            let inserted = db::import_csv(&store, &csv).await?;
            println!("Inserted {inserted} submissions from {}.", csv.display());
        }
        Commands::Stats {
            json,
            skip_malformed,
        } => {
            let policy = if skip_malformed {
                MalformedPolicy::Skip
            } else {
                MalformedPolicy::Reject
            };
            let store = open_store(config).await?;
            print!("{}", stats_output(&store, policy, json).await?);
        }
        Commands::Report { out } => {
            let store = open_store(config).await?;
            let submissions = store.fetch_all().await?;
            let summaries = stats::aggregate(&submissions)?;
            let report = report::build_report(&summaries, &submissions, Utc::now());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn submit(
    store: &dyn SubmissionStore,
    cache: &RecentCache,
    submission: NewSubmission,
) -> anyhow::Result<SubmissionRecord> {
    submission.validate()?;
    let record = submission.into_record(Uuid::new_v4(), Utc::now());
    store.insert(&record, None).await?;
    info!(team_number = %record.team_number, id = %record.id, "submission stored");

    cache.record(&record).with_context(|| {
        format!(
            "submission stored but {} was not updated",
            cache.path().display()
        )
    })?;
    Ok(record)
}

/// Text printed by `stats`: JSON, the empty-state line, or the table.
async fn stats_output(
    store: &dyn SubmissionStore,
    policy: MalformedPolicy,
    json: bool,
) -> anyhow::Result<String> {
    let mut summaries = match stats::load_team_stats(store, policy).await {
        Ok(summaries) => summaries,
        Err(err) if err.is_retrieval() => {
            return Err(anyhow::Error::new(err).context("team statistics are unavailable"))
        }
        Err(err) => return Err(err.into()),
    };
    report::sort_for_display(&mut summaries);

    if json {
        Ok(format!("{}\n", serde_json::to_string_pretty(&summaries)?))
    } else if summaries.is_empty() {
        Ok("No submissions recorded yet.\n".to_string())
    } else {
        Ok(report::render_table(&summaries))
    }
}

fn show_recent(cache: &RecentCache, limit: usize) -> anyhow::Result<()> {
    let recent = cache.latest(limit)?;
    if recent.is_empty() {
        println!("No submissions recorded from this machine yet.");
        return Ok(());
    }

    println!("Recent scouting data:");
    for submission in &recent {
        let metric = |value: Option<i32>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
        println!(
            "- {} ({}) at {}: auto {}/{} teleop {}/{} ascent {}",
            submission.team_name,
            submission.team_number,
            submission.submitted_at.format("%Y-%m-%d %H:%M"),
            metric(submission.specimens_autonomous),
            metric(submission.samples_autonomous),
            metric(submission.specimens_teleop),
            metric(submission.samples_teleop),
            metric(submission.ascent),
        );
    }
    Ok(())
}
