//! Persistence for the weekly review list.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use shelfwise_core::WeeklyFocusItem;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `weekly_focus_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WeeklyFocusRow {
    pub id: i64,
    pub week_start: NaiveDate,
    pub product_id: String,
    pub name: String,
    pub action: String,
    pub priority_score: i64,
    pub why: String,
    pub signals: Value,
    pub created_at: DateTime<Utc>,
}

/// Replaces the focus list for `week_start` with `items` in one transaction.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails or [`DbError::Json`] if
/// an item's signals cannot be serialized; the previous list is left intact
/// in either case.
pub async fn replace_weekly_focus(
    pool: &PgPool,
    week_start: NaiveDate,
    items: &[WeeklyFocusItem],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM weekly_focus_items WHERE week_start = $1")
        .bind(week_start)
        .execute(&mut *tx)
        .await?;

    for item in items {
        let signals = serde_json::to_value(item.signals)?;
        sqlx::query(
            "INSERT INTO weekly_focus_items \
                 (week_start, product_id, name, action, priority_score, why, signals) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(week_start)
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(item.action.as_str())
        .bind(i64::try_from(item.priority_score).unwrap_or(i64::MAX))
        .bind(&item.why)
        .bind(signals)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(%week_start, items = items.len(), "weekly focus list replaced");
    Ok(items.len())
}

/// Returns the focus list for `week_start`, highest priority first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_weekly_focus(
    pool: &PgPool,
    week_start: NaiveDate,
) -> Result<Vec<WeeklyFocusRow>, DbError> {
    let rows = sqlx::query_as::<_, WeeklyFocusRow>(
        "SELECT id, week_start, product_id, name, action, priority_score, why, signals, \
                created_at \
         FROM weekly_focus_items \
         WHERE week_start = $1 \
         ORDER BY priority_score DESC, name ASC",
    )
    .bind(week_start)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
