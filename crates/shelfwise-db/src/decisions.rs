//! Database operations for `decision_actions`.

use chrono::{DateTime, Utc};
use serde_json::Value;
use shelfwise_core::build_dedupe_key;
use sqlx::PgPool;

use crate::DbError;

/// A decision about to be logged.
#[derive(Debug, Clone)]
pub struct NewDecisionAction {
    pub action_type: String,
    pub target_type: String,
    pub target_id: String,
    pub sources: Vec<String>,
    pub payload: Value,
    pub as_of: DateTime<Utc>,
}

impl NewDecisionAction {
    #[must_use]
    pub fn dedupe_key(&self) -> String {
        build_dedupe_key(
            &self.action_type,
            &self.target_type,
            &self.target_id,
            &self.sources,
            self.as_of,
        )
    }
}

/// A row from the `decision_actions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DecisionActionRow {
    pub id: i64,
    pub dedupe_key: String,
    pub action_type: String,
    pub target_type: String,
    pub target_id: String,
    pub sources: Vec<String>,
    pub payload: Value,
    pub as_of: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Logs a decision unless one with the same dedupe key already exists.
///
/// Returns `true` when a row was inserted and `false` when the decision was
/// already logged this week.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn log_decision_action(
    pool: &PgPool,
    action: &NewDecisionAction,
) -> Result<bool, DbError> {
    let dedupe_key = action.dedupe_key();

    let result = sqlx::query(
        "INSERT INTO decision_actions \
             (dedupe_key, action_type, target_type, target_id, sources, payload, as_of) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (dedupe_key) DO NOTHING",
    )
    .bind(&dedupe_key)
    .bind(&action.action_type)
    .bind(&action.target_type)
    .bind(&action.target_id)
    .bind(&action.sources)
    .bind(&action.payload)
    .bind(action.as_of)
    .execute(pool)
    .await?;

    let inserted = result.rows_affected() == 1;
    if !inserted {
        tracing::debug!(dedupe_key = %dedupe_key, "decision already logged this week");
    }
    Ok(inserted)
}

/// Returns the most recent `limit` logged decisions.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_decision_actions(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<DecisionActionRow>, DbError> {
    let rows = sqlx::query_as::<_, DecisionActionRow>(
        "SELECT id, dedupe_key, action_type, target_type, target_id, sources, payload, \
                as_of, created_at \
         FROM decision_actions \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn dedupe_key_ignores_source_order() {
        let as_of = Utc.with_ymd_and_hms(2026, 10, 20, 8, 0, 0).unwrap();
        let a = NewDecisionAction {
            action_type: "BOOST".to_string(),
            target_type: "product".to_string(),
            target_id: "p-1".to_string(),
            sources: vec!["sales".to_string(), "requests".to_string()],
            payload: json!({}),
            as_of,
        };
        let b = NewDecisionAction {
            sources: vec!["requests".to_string(), "sales".to_string()],
            ..a.clone()
        };
        assert_eq!(a.dedupe_key(), b.dedupe_key());
        assert_eq!(a.dedupe_key(), "boost|product|p-1|requests,sales|2026-W43");
    }
}
