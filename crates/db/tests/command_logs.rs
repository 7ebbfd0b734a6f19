//! Postgres tests for the command log repository and store.
//!
//! Require `DATABASE_URL`; run with `cargo test -p flexrunner-db -- --ignored`.

use assert_matches::assert_matches;
use flexrunner_core::catalog::ExecutorType;
use flexrunner_core::execution_log::{
    ExecutionLogStore, ExecutionOutcome, ExecutionStatus, LogStoreError, NewExecutionLog,
};
use flexrunner_db::repositories::CommandLogRepo;
use flexrunner_db::PgLogStore;
use sqlx::PgPool;

fn new_log(actor_id: i64) -> NewExecutionLog {
    NewExecutionLog {
        actor_id,
        command_name: "Clear Application Cache".into(),
        command_slug: "cache-clear".into(),
        command_type: ExecutorType::ScriptedCommand,
        category: "maintenance".into(),
        inputs: serde_json::json!({"force": true}),
    }
}

fn success() -> ExecutionOutcome {
    ExecutionOutcome {
        status: ExecutionStatus::Success,
        output: Some("Application cache cleared.".into()),
        duration: 0.42,
        error_message: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn status_lookup_is_seeded_in_order(pool: PgPool) {
    let names: Vec<(i16, String)> =
        sqlx::query_as("SELECT id, name FROM execution_statuses ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
    let expected = ["pending", "running", "success", "failed"];
    assert_eq!(names.len(), expected.len());
    for (row, name) in names.iter().zip(expected) {
        assert_eq!(row.1, name);
        assert_eq!(ExecutionStatus::from_id(row.0).unwrap().as_str(), name);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn create_then_finalize_once(pool: PgPool) {
    let store = PgLogStore::new(pool.clone());

    let log = store.create_running(new_log(7)).await.unwrap();
    assert!(log.is_running());
    assert!(log.started_at.is_some());
    assert_eq!(log.inputs["force"], true);

    let done = store.finalize(log.id, success()).await.unwrap();
    assert!(done.was_successful());
    assert_eq!(done.duration, Some(0.42));
    assert!(done.completed_at.is_some());

    let again = store
        .finalize(log.id, ExecutionOutcome::aborted("late", 0.0))
        .await;
    assert_matches!(again, Err(LogStoreError::AlreadyFinalized(_)));

    let stored = store.find(log.id).await.unwrap().unwrap();
    assert!(stored.was_successful());
    assert_eq!(stored.error_message, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn finalize_missing_row_is_not_found(pool: PgPool) {
    let store = PgLogStore::new(pool);
    assert_matches!(
        store.finalize(12345, success()).await,
        Err(LogStoreError::NotFound(12345))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn prune_keeps_recent_and_running_rows(pool: PgPool) {
    let store = PgLogStore::new(pool.clone());
    let old_done = store.create_running(new_log(1)).await.unwrap();
    store.finalize(old_done.id, success()).await.unwrap();
    let old_running = store.create_running(new_log(1)).await.unwrap();
    let recent = store.create_running(new_log(1)).await.unwrap();
    store.finalize(recent.id, success()).await.unwrap();

    sqlx::query("UPDATE command_logs SET created_at = now() - interval '40 days' WHERE id = ANY($1)")
        .bind(vec![old_done.id, old_running.id])
        .execute(&pool)
        .await
        .unwrap();

    let removed = CommandLogRepo::delete_older_than(&pool, 30).await.unwrap();
    assert_eq!(removed, 1);
    assert!(store.find(old_done.id).await.unwrap().is_none());
    assert!(store.find(old_running.id).await.unwrap().is_some());
    assert!(store.find(recent.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_for_actor_is_newest_first(pool: PgPool) {
    let store = PgLogStore::new(pool.clone());
    let first = store.create_running(new_log(3)).await.unwrap();
    let second = store.create_running(new_log(3)).await.unwrap();
    store.create_running(new_log(4)).await.unwrap();

    let rows = CommandLogRepo::list_for_actor(&pool, 3, 10).await.unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, [second.id, first.id]);
    assert_eq!(rows[0].status_name, "running");
}
