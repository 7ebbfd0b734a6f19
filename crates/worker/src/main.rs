use std::sync::Arc;

use anyhow::Context;
use flexrunner_core::runner::JobRegistry;
use flexrunner_db::jobs::{PruneCommandLogsJob, PRUNE_COMMAND_LOGS};
use flexrunner_worker::{JobWorker, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flexrunner_worker=debug,flexrunner_db=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = flexrunner_db::create_pool(&database_url)
        .await
        .context("failed to connect to database")?;
    flexrunner_db::health_check(&pool)
        .await
        .context("database health check failed")?;
    flexrunner_db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("Database ready");

    let mut registry = JobRegistry::new();
    registry.register(PRUNE_COMMAND_LOGS, Arc::new(PruneCommandLogsJob::new(pool.clone())));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        shutdown.cancel();
    });

    JobWorker::new(pool, Arc::new(registry), config)
        .run(cancel)
        .await;
    Ok(())
}
