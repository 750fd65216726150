//! Database operations for the `runs` table.
//!
//! Every transition is a single conditional `UPDATE` guarded on the current
//! status, so concurrent workers cannot both apply the same transition. A
//! transition that matches no row returns `Ok(false)`: another actor already
//! moved the run, which callers treat as a lost race rather than an error.

use chrono::{DateTime, Utc};
use serde_json::Value;
use shelfwise_core::{RunRecord, RunStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, kind, status, timings_ms, result_json, error_json, \
                           created_at, started_at, finished_at";

/// A row from the `runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub kind: String,
    pub status: String,
    pub timings_ms: Option<Value>,
    pub result_json: Option<Value>,
    pub error_json: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<RunRow> for RunRecord {
    type Error = DbError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        let status =
            RunStatus::parse(&row.status).ok_or_else(|| DbError::InvalidRunStatus(row.status))?;
        Ok(RunRecord {
            id: row.id,
            public_id: row.public_id,
            kind: row.kind,
            status,
            timings_ms: row.timings_ms,
            result_json: row.result_json,
            error_json: row.error_json,
            created_at: row.created_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

fn finalizable_statuses() -> Vec<&'static str> {
    RunStatus::FINALIZABLE
        .iter()
        .copied()
        .map(RunStatus::as_str)
        .collect()
}

/// Creates a run in `queued` or `running` status.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunStatus`] for a terminal `initial` status, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn create_run(
    pool: &PgPool,
    kind: &str,
    initial: RunStatus,
) -> Result<RunRecord, DbError> {
    if initial.is_terminal() {
        return Err(DbError::InvalidRunStatus(initial.as_str().to_string()));
    }

    let row = sqlx::query_as::<_, RunRow>(&format!(
        "INSERT INTO runs (public_id, kind, status, started_at) \
         VALUES ($1, $2, $3, CASE WHEN $3::text = 'running' THEN NOW() END) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(kind)
    .bind(initial.as_str())
    .fetch_one(pool)
    .await?;

    tracing::debug!(run_id = row.id, kind, status = %initial, "run created");
    row.try_into()
}

/// Moves a run from `queued` to `running`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_run_running(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Finalizes a `queued` or `running` run as `success`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn finalize_run_success(
    pool: &PgPool,
    id: i64,
    result_json: &Value,
    timings_ms: Option<&Value>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE runs \
         SET status = 'success', result_json = $2, timings_ms = $3, finished_at = NOW() \
         WHERE id = $1 AND status = ANY($4)",
    )
    .bind(id)
    .bind(result_json)
    .bind(timings_ms)
    .bind(finalizable_statuses())
    .execute(pool)
    .await?;

    let applied = result.rows_affected() == 1;
    if !applied {
        tracing::warn!(run_id = id, "success finalize skipped; run already finalized");
    }
    Ok(applied)
}

/// Finalizes a `queued` or `running` run as `failed`.
///
/// When both the stored error blob and `error_json` are objects they are
/// merged, so an earlier cancel flag survives.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn finalize_run_failed(
    pool: &PgPool,
    id: i64,
    error_json: &Value,
    timings_ms: Option<&Value>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE runs \
         SET status = 'failed', \
             error_json = CASE \
                 WHEN jsonb_typeof(error_json) = 'object' AND jsonb_typeof($2::jsonb) = 'object' \
                     THEN error_json || $2::jsonb \
                 ELSE $2::jsonb \
             END, \
             timings_ms = $3, \
             finished_at = NOW() \
         WHERE id = $1 AND status = ANY($4)",
    )
    .bind(id)
    .bind(error_json)
    .bind(timings_ms)
    .bind(finalizable_statuses())
    .execute(pool)
    .await?;

    let applied = result.rows_affected() == 1;
    if !applied {
        tracing::warn!(run_id = id, "failure finalize skipped; run already finalized");
    }
    Ok(applied)
}

/// Merges `{"cancelRequested": true}` into the run's error blob in any status.
///
/// Returns `false` only when no run has this `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn request_run_cancel(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE runs \
         SET error_json = CASE \
                 WHEN error_json IS NULL OR jsonb_typeof(error_json) = 'null' THEN '{}'::jsonb \
                 WHEN jsonb_typeof(error_json) = 'object' THEN error_json \
                 ELSE jsonb_build_object('detail', error_json) \
             END || jsonb_build_object($2::text, true) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(shelfwise_core::CANCEL_REQUESTED_KEY)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Whether cancellation has been requested for a run.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the run does not exist, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn is_run_cancel_requested(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let flag = sqlx::query_scalar::<_, Option<bool>>(
        "SELECT CASE WHEN jsonb_typeof(error_json) = 'object' \
                     THEN (error_json ->> $2)::boolean END \
         FROM runs WHERE id = $1",
    )
    .bind(id)
    .bind(shelfwise_core::CANCEL_REQUESTED_KEY)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(flag.unwrap_or(false))
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`,
/// [`DbError::InvalidRunStatus`] if the stored status is unrecognized, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_run(pool: &PgPool, id: i64) -> Result<RunRecord, DbError> {
    let row = sqlx::query_as::<_, RunRow>(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    row.try_into()
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or
/// [`DbError::InvalidRunStatus`] if a stored status is unrecognized.
pub async fn list_runs(pool: &PgPool, limit: i64) -> Result<Vec<RunRecord>, DbError> {
    let rows = sqlx::query_as::<_, RunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM runs ORDER BY created_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RunRecord::try_from).collect()
}
