use std::sync::Arc;

use flexrunner_core::auth::Authorizer;
use flexrunner_core::catalog::Catalog;
use flexrunner_core::execution_log::ExecutionLogStore;
use flexrunner_core::runner::{
    BackgroundJobExecutor, ConsoleRunner, CustomServiceExecutor, HostCommandRunner, JobQueue,
    JobRegistry, ScriptedCommandExecutor, ServiceRegistry, ShellExecutor, ShellGate,
};
use flexrunner_db::jobs::{PruneCommandLogsJob, PRUNE_COMMAND_LOGS};
use flexrunner_db::{DbPool, PgJobQueue, PgLogStore};

use crate::config::RunnerConfig;
use crate::dispatch::{Dispatcher, ExecutorRegistry};
use crate::error::AppResult;

/// Collaborators the dispatcher is wired against.
pub struct Collaborators {
    pub logs: Arc<dyn ExecutionLogStore>,
    pub queue: Arc<dyn JobQueue>,
    pub host: Arc<dyn HostCommandRunner>,
    pub authorizer: Arc<dyn Authorizer>,
    pub jobs: JobRegistry,
    pub services: ServiceRegistry,
}

/// Shared application state.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RunnerConfig>,
    pub dispatcher: Arc<Dispatcher>,
    /// Registered job handlers, also used for synchronous dispatch.
    pub jobs: Arc<JobRegistry>,
    pub background_jobs: Arc<BackgroundJobExecutor>,
}

impl AppState {
    /// Build the executors and the dispatcher from explicit collaborators.
    pub fn build(config: RunnerConfig, catalog: Catalog, parts: Collaborators) -> AppResult<Self> {
        let settings = Arc::new(config.settings.clone());
        let gate = Arc::new(ShellGate::new(&settings.shell)?);
        let jobs = Arc::new(parts.jobs);
        let services = Arc::new(parts.services);

        let background_jobs =
            BackgroundJobExecutor::new(Arc::clone(&jobs), parts.queue, settings.queue.clone());

        let mut executors = ExecutorRegistry::new();
        executors
            .register(ScriptedCommandExecutor::new(parts.host))
            .register(background_jobs.clone())
            .register(ShellExecutor::new(
                gate,
                settings.shell.timeout,
                settings.app_root.clone(),
            ))
            .register(CustomServiceExecutor::new(services));

        tracing::info!(
            commands = catalog.len(),
            categories = catalog.categories().len(),
            shell_enabled = settings.shell.enabled,
            "Flex runner ready",
        );

        let dispatcher = Dispatcher::new(
            Arc::new(catalog),
            Arc::new(executors),
            parts.logs,
            parts.authorizer,
            settings,
        );

        Ok(Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            jobs,
            background_jobs: Arc::new(background_jobs),
        })
    }

    /// Production wiring: Postgres log store and queue, the console host
    /// runner, and the configured permission policy. The log pruning job is
    /// always registered alongside `jobs`.
    pub fn with_postgres(
        config: RunnerConfig,
        pool: DbPool,
        mut jobs: JobRegistry,
        services: ServiceRegistry,
    ) -> AppResult<Self> {
        let catalog = config.load_catalog()?;
        jobs.register(PRUNE_COMMAND_LOGS, Arc::new(PruneCommandLogsJob::new(pool.clone())));

        let host = ConsoleRunner::new(
            config.console.clone(),
            config.settings.app_root.clone(),
            config.settings.max_execution_time,
        );

        let parts = Collaborators {
            logs: Arc::new(PgLogStore::new(pool.clone())),
            queue: Arc::new(PgJobQueue::new(pool)),
            host: Arc::new(host),
            authorizer: Arc::new(config.permissions.clone()),
            jobs,
            services,
        };
        Self::build(config, catalog, parts)
    }
}
