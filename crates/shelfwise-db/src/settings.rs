//! Engine thresholds and relevance vocabulary stored in Postgres.

use shelfwise_core::{EngineSettings, ProductTypeEntry, RelevanceVocabulary};
use sqlx::PgPool;

use crate::{to_u32, DbError};

#[derive(Debug, sqlx::FromRow)]
struct EngineSettingsRow {
    boost_sales_threshold_d90: i32,
    retire_sales_threshold_d180: i32,
    request_theme_priority_threshold: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductTypeRow {
    key: String,
    synonyms: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct RelevanceTermRow {
    kind: String,
    term: String,
}

/// Returns the stored engine thresholds, or `None` when none have been saved.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_engine_settings(pool: &PgPool) -> Result<Option<EngineSettings>, DbError> {
    let row = sqlx::query_as::<_, EngineSettingsRow>(
        "SELECT boost_sales_threshold_d90, retire_sales_threshold_d180, \
                request_theme_priority_threshold \
         FROM engine_settings WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| EngineSettings {
        boost_sales_threshold_d90: to_u32(i64::from(row.boost_sales_threshold_d90)),
        retire_sales_threshold_d180: to_u32(i64::from(row.retire_sales_threshold_d180)),
        request_theme_priority_threshold: to_u32(i64::from(
            row.request_theme_priority_threshold,
        )),
    }))
}

/// Inserts or replaces the single engine settings row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_engine_settings(
    pool: &PgPool,
    settings: &EngineSettings,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO engine_settings \
             (id, boost_sales_threshold_d90, retire_sales_threshold_d180, \
              request_theme_priority_threshold, updated_at) \
         VALUES (1, $1, $2, $3, NOW()) \
         ON CONFLICT (id) DO UPDATE SET \
             boost_sales_threshold_d90 = EXCLUDED.boost_sales_threshold_d90, \
             retire_sales_threshold_d180 = EXCLUDED.retire_sales_threshold_d180, \
             request_theme_priority_threshold = EXCLUDED.request_theme_priority_threshold, \
             updated_at = NOW()",
    )
    .bind(clamp_i32(settings.boost_sales_threshold_d90))
    .bind(clamp_i32(settings.retire_sales_threshold_d180))
    .bind(clamp_i32(settings.request_theme_priority_threshold))
    .execute(pool)
    .await?;

    Ok(())
}

/// Builds the relevance vocabulary from the active product types and the
/// curated occasion and exclude terms.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn load_relevance_vocabulary(pool: &PgPool) -> Result<RelevanceVocabulary, DbError> {
    let product_types = sqlx::query_as::<_, ProductTypeRow>(
        "SELECT key, synonyms FROM product_types WHERE is_active = TRUE ORDER BY key",
    )
    .fetch_all(pool)
    .await?;

    let terms = sqlx::query_as::<_, RelevanceTermRow>(
        "SELECT kind, term FROM relevance_terms ORDER BY kind, term",
    )
    .fetch_all(pool)
    .await?;

    let mut vocabulary = RelevanceVocabulary {
        product_types: product_types
            .into_iter()
            .map(|row| ProductTypeEntry {
                key: row.key,
                synonyms: row.synonyms,
            })
            .collect(),
        ..RelevanceVocabulary::default()
    };

    for row in terms {
        match row.kind.as_str() {
            "occasion" => vocabulary.occasion_terms.push(row.term),
            "exclude" => vocabulary.exclude_terms.push(row.term),
            other => tracing::warn!(kind = other, term = %row.term, "unknown relevance term kind"),
        }
    }

    Ok(vocabulary)
}

fn clamp_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_i32_saturates() {
        assert_eq!(clamp_i32(7), 7);
        assert_eq!(clamp_i32(u32::MAX), i32::MAX);
    }
}
