use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{RetrievalError, StoreError};
use crate::models::{Metric, NewSubmission, SubmissionRecord};

/// The append-only table of scouting submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Every stored submission, oldest first.
    async fn fetch_all(&self) -> Result<Vec<SubmissionRecord>, RetrievalError>;

    /// Appends one submission. With a `source_key`, a row already stored under
    /// the same key is left alone and `false` is returned.
    async fn insert(
        &self,
        submission: &SubmissionRecord,
        source_key: Option<&str>,
    ) -> Result<bool, StoreError>;
}

pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_submission(row: &PgRow) -> Result<SubmissionRecord, sqlx::Error> {
    let metric = |metric: Metric| row.try_get::<Option<i32>, _>(metric.column());

    Ok(SubmissionRecord {
        id: row.try_get("id")?,
        team_name: row.try_get("team_name")?,
        team_number: row.try_get("team_number")?,
        specimens_autonomous: metric(Metric::SpecimensAutonomous)?,
        samples_autonomous: metric(Metric::SamplesAutonomous)?,
        specimens_teleop: metric(Metric::SpecimensTeleop)?,
        samples_teleop: metric(Metric::SamplesTeleop)?,
        ascent: metric(Metric::Ascent)?,
        park_specimen_auto: row.try_get("park_specimen_auto")?,
        park_teleop_auto: row.try_get("park_teleop_auto")?,
        submitted_at: row.try_get("submitted_at")?,
    })
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn fetch_all(&self) -> Result<Vec<SubmissionRecord>, RetrievalError> {
        let rows = sqlx::query(
            r#"
            SELECT id, team_name, team_number,
                   specimens_autonomous, samples_autonomous,
                   specimens_teleop, samples_teleop, ascent,
                   park_specimen_auto, park_teleop_auto, submitted_at
            FROM scouting_data
            ORDER BY submitted_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let submissions = rows
            .iter()
            .map(decode_submission)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(rows = submissions.len(), "loaded scouting_data");
        Ok(submissions)
    }

    async fn insert(
        &self,
        submission: &SubmissionRecord,
        source_key: Option<&str>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO scouting_data
            (id, team_name, team_number, specimens_autonomous, samples_autonomous,
             park_specimen_auto, park_teleop_auto, specimens_teleop, samples_teleop,
             ascent, submitted_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(submission.id)
        .bind(&submission.team_name)
        .bind(&submission.team_number)
        .bind(submission.specimens_autonomous)
        .bind(submission.samples_autonomous)
        .bind(submission.park_specimen_auto)
        .bind(submission.park_teleop_auto)
        .bind(submission.specimens_teleop)
        .bind(submission.samples_teleop)
        .bind(submission.ascent)
        .bind(submission.submitted_at)
        .bind(source_key)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Write)?;

        Ok(result.rows_affected() > 0)
    }
}

pub async fn init_db(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("scouting_data schema ready");
    Ok(())
}

fn seed_submission(
    team_name: &str,
    team_number: &str,
    metrics: [i32; 5],
    parks: (bool, bool),
) -> NewSubmission {
    NewSubmission {
        team_name: team_name.to_string(),
        team_number: team_number.to_string(),
        specimens_autonomous: metrics[0],
        samples_autonomous: metrics[1],
        specimens_teleop: metrics[2],
        samples_teleop: metrics[3],
        ascent: metrics[4],
        park_specimen_auto: parks.0,
        park_teleop_auto: parks.1,
    }
}

pub async fn seed(store: &dyn SubmissionStore) -> anyhow::Result<usize> {
    let submissions = vec![
        ("seed-001", seed_submission("MakEMinds", "23786", [5, 4, 12, 9, 2], (true, true))),
        ("seed-002", seed_submission("MakEMinds", "23786", [6, 3, 14, 8, 2], (true, false))),
        ("seed-003", seed_submission("Gear Ticks", "14270", [3, 2, 9, 11, 1], (false, true))),
        ("seed-004", seed_submission("Gear Ticks", "14270", [4, 2, 8, 12, 2], (true, true))),
        ("seed-005", seed_submission("Circuit Breakers", "0731", [2, 5, 6, 15, 3], (false, false))),
    ];

    // Seed rows arrive six hours apart.
    let base = Utc::now() - Duration::days(3);
    let mut inserted = 0usize;

    for (offset, (source_key, submission)) in submissions.into_iter().enumerate() {
        let submitted_at: DateTime<Utc> = base + Duration::hours(offset as i64 * 6);
        let record = submission.into_record(Uuid::new_v4(), submitted_at);
        if store.insert(&record, Some(source_key)).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn import_csv(
    store: &dyn SubmissionStore,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        team_name: String,
        team_number: String,
        specimens_autonomous: i32,
        samples_autonomous: i32,
        specimens_teleop: i32,
        samples_teleop: i32,
        ascent: i32,
        #[serde(default)]
        park_specimen_auto: bool,
        #[serde(default)]
        park_teleop_auto: bool,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        let submission = NewSubmission {
            team_name: row.team_name,
            team_number: row.team_number,
            specimens_autonomous: row.specimens_autonomous,
            samples_autonomous: row.samples_autonomous,
            specimens_teleop: row.specimens_teleop,
            samples_teleop: row.samples_teleop,
            ascent: row.ascent,
            park_specimen_auto: row.park_specimen_auto,
            park_teleop_auto: row.park_teleop_auto,
        };
        submission
            .validate()
            .with_context(|| format!("CSV row {} rejected", line + 1))?;

        let source_key = row
            .source_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let record = submission.into_record(Uuid::new_v4(), Utc::now());

        if store.insert(&record, Some(&source_key)).await? {
            inserted += 1;
        } else {
            debug!(%source_key, "submission already imported");
        }
    }

    Ok(inserted)
}
