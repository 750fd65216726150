//! Live integration tests for shelfwise-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness, so `DATABASE_URL` must point at a running server.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde_json::json;
use shelfwise_core::{
    Action, EngineSettings, ProductSignals, RunStatus, Seasonality, WeeklyFocusItem,
};
use shelfwise_db::{
    create_run, finalize_run_failed, finalize_run_success, get_run, is_run_cancel_requested,
    list_decision_actions, list_runs, list_weekly_focus, load_engine_settings,
    load_product_inputs, load_relevance_vocabulary, log_decision_action, mark_run_running,
    replace_weekly_focus, request_run_cancel, upsert_engine_settings, DbError,
    NewDecisionAction,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_test_product(
    pool: &sqlx::PgPool,
    external_id: &str,
    in_shopify: bool,
    seasonality: &str,
) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO products (external_id, name, in_shopify, seasonality) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(external_id)
    .bind(format!("Product {external_id}"))
    .bind(in_shopify)
    .bind(seasonality)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_test_product failed for '{external_id}': {e}"))
}

async fn insert_sale(pool: &sqlx::PgPool, product_id: i64, sold_on: NaiveDate, units: i32) {
    sqlx::query("INSERT INTO sales (product_id, sold_on, units) VALUES ($1, $2, $3)")
        .bind(product_id)
        .bind(sold_on)
        .bind(units)
        .execute(pool)
        .await
        .expect("insert sale");
}

fn focus_item(product_id: &str, action: Action, priority_score: u64) -> WeeklyFocusItem {
    WeeklyFocusItem {
        product_id: product_id.to_string(),
        name: format!("Product {product_id}"),
        action,
        priority_score,
        why: "test".to_string(),
        signals: ProductSignals::default(),
    }
}

// ---------------------------------------------------------------------------
// Section 1: Run lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn run_lifecycle_queued_to_success(pool: sqlx::PgPool) {
    let run = create_run(&pool, "research", RunStatus::Queued)
        .await
        .expect("create_run failed");
    assert_eq!(run.status, RunStatus::Queued);
    assert!(run.started_at.is_none());

    assert!(mark_run_running(&pool, run.id).await.expect("mark running"));
    assert!(!mark_run_running(&pool, run.id).await.expect("second mark running"));

    let timings = json!({ "total": 12 });
    let applied = finalize_run_success(&pool, run.id, &json!({ "rows": 3 }), Some(&timings))
        .await
        .expect("finalize success");
    assert!(applied);

    let fetched = get_run(&pool, run.id).await.expect("get_run failed");
    assert_eq!(fetched.status, RunStatus::Success);
    assert!(fetched.started_at.is_some());
    assert!(fetched.finished_at.is_some());
    assert_eq!(fetched.result_json, Some(json!({ "rows": 3 })));
}

#[sqlx::test(migrations = "../../migrations")]
async fn terminal_run_cannot_be_finalized_again(pool: sqlx::PgPool) {
    let run = create_run(&pool, "research", RunStatus::Running)
        .await
        .expect("create_run failed");

    assert!(finalize_run_failed(&pool, run.id, &json!({ "message": "boom" }), None)
        .await
        .expect("finalize failed"));
    assert!(!finalize_run_success(&pool, run.id, &json!({}), None)
        .await
        .expect("late success"));

    let fetched = get_run(&pool, run.id).await.expect("get_run failed");
    assert_eq!(fetched.status, RunStatus::Failed);
    assert!(fetched.result_json.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_finalizers_apply_exactly_once(pool: sqlx::PgPool) {
    let run = create_run(&pool, "research", RunStatus::Running)
        .await
        .expect("create_run failed");

    let result_a = json!({ "winner": "a" });
    let result_b = json!({ "winner": "b" });
    let (a, b) = tokio::join!(
        finalize_run_success(&pool, run.id, &result_a, None),
        finalize_run_failed(&pool, run.id, &result_b, None),
    );
    let applied = [a.expect("finalizer a"), b.expect("finalizer b")];
    assert_eq!(applied.iter().filter(|applied| **applied).count(), 1);

    let fetched = get_run(&pool, run.id).await.expect("get_run failed");
    assert!(fetched.status.is_terminal());
}

#[sqlx::test(migrations = "../../migrations")]
async fn cancel_flag_survives_failure_finalize(pool: sqlx::PgPool) {
    let run = create_run(&pool, "research", RunStatus::Running)
        .await
        .expect("create_run failed");

    assert!(!is_run_cancel_requested(&pool, run.id).await.expect("flag"));
    assert!(request_run_cancel(&pool, run.id).await.expect("request cancel"));
    assert!(is_run_cancel_requested(&pool, run.id).await.expect("flag"));

    finalize_run_failed(&pool, run.id, &json!({ "message": "cancelled" }), None)
        .await
        .expect("finalize failed");

    let fetched = get_run(&pool, run.id).await.expect("get_run failed");
    assert!(fetched.cancel_requested());
    assert_eq!(
        fetched.error_json,
        Some(json!({ "cancelRequested": true, "message": "cancelled" }))
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_run_is_not_found(pool: sqlx::PgPool) {
    let err = get_run(&pool, 9_999).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
    assert!(!request_run_cancel(&pool, 9_999).await.expect("cancel"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_run_rejects_terminal_status(pool: sqlx::PgPool) {
    let err = create_run(&pool, "research", RunStatus::Success)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidRunStatus(_)));
    assert!(list_runs(&pool, 10).await.expect("list_runs").is_empty());
}

// ---------------------------------------------------------------------------
// Section 2: Decisions, settings, weekly focus
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn decision_logged_once_per_week(pool: sqlx::PgPool) {
    let action = NewDecisionAction {
        action_type: "BOOST".to_string(),
        target_type: "product".to_string(),
        target_id: "sku-1".to_string(),
        sources: vec!["sales".to_string()],
        payload: json!({ "priorityScore": 57 }),
        as_of: Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
    };

    assert!(log_decision_action(&pool, &action).await.expect("first log"));
    let later = NewDecisionAction {
        as_of: action.as_of + Duration::days(3),
        ..action.clone()
    };
    assert!(!log_decision_action(&pool, &later).await.expect("second log"));

    let rows = list_decision_actions(&pool, 10).await.expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].dedupe_key, action.dedupe_key());
}

#[sqlx::test(migrations = "../../migrations")]
async fn engine_settings_upsert_round_trip(pool: sqlx::PgPool) {
    assert!(load_engine_settings(&pool).await.expect("load").is_none());

    let settings = EngineSettings {
        boost_sales_threshold_d90: 20,
        retire_sales_threshold_d180: 4,
        request_theme_priority_threshold: 5,
    };
    upsert_engine_settings(&pool, &settings).await.expect("upsert");
    upsert_engine_settings(&pool, &settings).await.expect("second upsert");

    assert_eq!(load_engine_settings(&pool).await.expect("load"), Some(settings));
}

#[sqlx::test(migrations = "../../migrations")]
async fn relevance_vocabulary_loads_active_types_and_terms(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO product_types (key, synonyms, is_active) VALUES \
         ('pinata', ARRAY['piñata'], TRUE), ('balloon', ARRAY[]::TEXT[], FALSE)",
    )
    .execute(&pool)
    .await
    .expect("insert product types");
    sqlx::query(
        "INSERT INTO relevance_terms (kind, term) VALUES \
         ('occasion', 'birthday'), ('exclude', 'diy')",
    )
    .execute(&pool)
    .await
    .expect("insert terms");

    let vocabulary = load_relevance_vocabulary(&pool).await.expect("load");
    assert_eq!(vocabulary.product_types.len(), 1);
    assert_eq!(vocabulary.product_types[0].key, "pinata");
    assert_eq!(vocabulary.occasion_terms, vec!["birthday"]);
    assert_eq!(vocabulary.exclude_terms, vec!["diy"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn product_inputs_aggregate_sales_windows(pool: sqlx::PgPool) {
    let as_of = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let today = as_of.date_naive();
    let product = insert_test_product(&pool, "sku-1", false, "summer").await;
    insert_sale(&pool, product, today - Duration::days(10), 8).await;
    insert_sale(&pool, product, today - Duration::days(120), 5).await;
    insert_sale(&pool, product, today - Duration::days(400), 50).await;

    sqlx::query(
        "INSERT INTO customer_requests (product_id, requested_at) VALUES ($1, $2), ($1, $3)",
    )
    .bind(product)
    .bind(as_of - Duration::days(2))
    .bind(as_of - Duration::days(45))
    .execute(&pool)
    .await
    .expect("insert requests");

    let inputs = load_product_inputs(&pool, as_of).await.expect("load inputs");
    assert_eq!(inputs.len(), 1);
    let signals = inputs[0].signals;
    assert_eq!(signals.d90_units, 8);
    assert_eq!(signals.d180_units, 13);
    assert_eq!(signals.requests_30d, 1);
    assert_eq!(signals.seasonality, Seasonality::Summer);
    assert!(!signals.in_shopify);
}

#[sqlx::test(migrations = "../../migrations")]
async fn weekly_focus_replace_overwrites_previous_list(pool: sqlx::PgPool) {
    let week = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");

    replace_weekly_focus(
        &pool,
        week,
        &[focus_item("a", Action::Keep, 15), focus_item("b", Action::Boost, 60)],
    )
    .await
    .expect("first replace");
    let written = replace_weekly_focus(&pool, week, &[focus_item("c", Action::Migrate, 80)])
        .await
        .expect("second replace");
    assert_eq!(written, 1);

    let rows = list_weekly_focus(&pool, week).await.expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product_id, "c");
    assert_eq!(rows[0].action, "MIGRATE");
    assert_eq!(rows[0].priority_score, 80);
}
