//! Aggregates per-product sales and request counts into rule engine inputs.

use chrono::{DateTime, Duration, Utc};
use shelfwise_core::{ProductInput, ProductSignals, Seasonality};
use sqlx::PgPool;

use crate::{to_u32, DbError};

/// One active product with its demand aggregates as of a point in time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductSignalsRow {
    pub external_id: String,
    pub name: String,
    pub in_shopify: bool,
    pub seasonality: String,
    pub d90_units: i64,
    pub d180_units: i64,
    pub requests_30d: i64,
}

impl From<ProductSignalsRow> for ProductInput {
    fn from(row: ProductSignalsRow) -> Self {
        ProductInput {
            product_id: row.external_id,
            name: row.name,
            signals: ProductSignals {
                in_shopify: row.in_shopify,
                d90_units: to_u32(row.d90_units),
                d180_units: to_u32(row.d180_units),
                requests_30d: to_u32(row.requests_30d),
                seasonality: Seasonality::parse(&row.seasonality),
            },
        }
    }
}

/// Loads every active product with 90/180-day unit sales and 30-day request
/// counts, windows ending at `as_of`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_product_inputs(
    pool: &PgPool,
    as_of: DateTime<Utc>,
) -> Result<Vec<ProductInput>, DbError> {
    let today = as_of.date_naive();
    let d90_start = today - Duration::days(90);
    let d180_start = today - Duration::days(180);
    let requests_start = as_of - Duration::days(30);

    let rows = sqlx::query_as::<_, ProductSignalsRow>(
        "SELECT p.external_id, p.name, p.in_shopify, p.seasonality, \
                COALESCE(s.d90_units, 0)::BIGINT AS d90_units, \
                COALESCE(s.d180_units, 0)::BIGINT AS d180_units, \
                COALESCE(r.requests_30d, 0)::BIGINT AS requests_30d \
         FROM products p \
         LEFT JOIN ( \
             SELECT product_id, \
                    SUM(units) FILTER (WHERE sold_on > $2) AS d90_units, \
                    SUM(units) AS d180_units \
             FROM sales \
             WHERE sold_on > $3 AND sold_on <= $1 \
             GROUP BY product_id \
         ) s ON s.product_id = p.id \
         LEFT JOIN ( \
             SELECT product_id, COUNT(*) AS requests_30d \
             FROM customer_requests \
             WHERE product_id IS NOT NULL AND requested_at > $4 AND requested_at <= $5 \
             GROUP BY product_id \
         ) r ON r.product_id = p.id \
         WHERE p.is_active = TRUE \
         ORDER BY p.name, p.external_id",
    )
    .bind(today)
    .bind(d90_start)
    .bind(d180_start)
    .bind(requests_start)
    .bind(as_of)
    .fetch_all(pool)
    .await?;

    tracing::debug!(products = rows.len(), as_of = %as_of, "loaded product signals");

    Ok(rows.into_iter().map(ProductInput::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_converts_to_product_input() {
        let row = ProductSignalsRow {
            external_id: "sku-7".to_string(),
            name: "Star Pinata".to_string(),
            in_shopify: true,
            seasonality: "summer".to_string(),
            d90_units: 14,
            d180_units: 20,
            requests_30d: -1,
        };
        let input = ProductInput::from(row);
        assert_eq!(input.product_id, "sku-7");
        assert_eq!(input.signals.d90_units, 14);
        assert_eq!(input.signals.requests_30d, 0);
        assert_eq!(input.signals.seasonality, Seasonality::Summer);
    }
}
