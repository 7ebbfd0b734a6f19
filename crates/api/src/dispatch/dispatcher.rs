//! Central command dispatcher.
//!
//! Coordinates catalog lookup, executor selection, input validation, the
//! execution log lifecycle, and executor invocation. Held in
//! [`AppState`](crate::state::AppState) as an `Arc<Dispatcher>`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use indexmap::IndexMap;
use serde::Serialize;

use flexrunner_core::auth::{Authorizer, Permission};
use flexrunner_core::catalog::{Catalog, Category, CommandDefinition};
use flexrunner_core::error::CoreError;
use flexrunner_core::execution_log::{
    ExecutionLog, ExecutionLogStore, ExecutionOutcome, NewExecutionLog,
};
use flexrunner_core::inputs::SubmittedInputs;
use flexrunner_core::runner::{
    panic_message, CommandExecutor, ExecutionContext, ExecutionResult, Executor,
};
use flexrunner_core::settings::RunnerSettings;
use flexrunner_core::types::{ActorId, DbId};
use flexrunner_core::validation::{self, InputErrors};

use super::registry::ExecutorRegistry;
use crate::error::{AppError, AppResult};

/// Settings exposed alongside the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListingSettings {
    pub require_confirmation: bool,
    pub shell_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogListing {
    pub categories: IndexMap<String, Category>,
    pub settings: ListingSettings,
}

/// An executor result plus the id of the log that recorded it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    #[serde(flatten)]
    pub result: ExecutionResult,
    pub log_id: DbId,
}

/// Runs catalog commands on behalf of actors.
///
/// Lifecycle of [`Dispatcher::execute`]:
/// 1. Check the actor may execute.
/// 2. Resolve the command from the catalog.
/// 3. Select the executor for its type.
/// 4. Run the executor's static command check.
/// 5. Create a `running` log record.
/// 6. Invoke the executor.
/// 7. Apply the single terminal update to the log.
///
/// Steps 1 to 4 fail without writing anything. Field validation is advisory
/// and lives in [`Dispatcher::validate_inputs`]; `execute` runs and logs
/// whatever it is given.
pub struct Dispatcher {
    catalog: Arc<Catalog>,
    executors: Arc<ExecutorRegistry>,
    logs: Arc<dyn ExecutionLogStore>,
    authorizer: Arc<dyn Authorizer>,
    settings: Arc<RunnerSettings>,
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<Catalog>,
        executors: Arc<ExecutorRegistry>,
        logs: Arc<dyn ExecutionLogStore>,
        authorizer: Arc<dyn Authorizer>,
        settings: Arc<RunnerSettings>,
    ) -> Self {
        Self {
            catalog,
            executors,
            logs,
            authorizer,
            settings,
        }
    }

    /// The full catalog and the client-facing settings.
    pub fn list_catalog(&self, actor: ActorId) -> AppResult<CatalogListing> {
        self.authorize(actor, Permission::View)?;
        Ok(CatalogListing {
            categories: self.catalog.categories().clone(),
            settings: ListingSettings {
                require_confirmation: self.settings.require_confirmation,
                shell_enabled: self.settings.shell.enabled,
            },
        })
    }

    /// Validate inputs for a command without executing or logging anything.
    pub fn validate_inputs(
        &self,
        actor: ActorId,
        category: &str,
        slug: &str,
        inputs: &SubmittedInputs,
    ) -> AppResult<InputErrors> {
        self.authorize(actor, Permission::View)?;
        let command = self.resolve(category, slug)?;
        self.executor_for(command)?;
        Ok(validation::validate_inputs(inputs, &command.inputs))
    }

    /// Run a command and record the invocation.
    pub async fn execute(
        &self,
        actor: ActorId,
        category: &str,
        slug: &str,
        inputs: SubmittedInputs,
    ) -> AppResult<DispatchResult> {
        self.authorize(actor, Permission::Execute)?;
        let command = self.resolve(category, slug)?;
        let executor = self.executor_for(command)?;

        if !executor.validate_command(command).await {
            tracing::warn!(actor_id = actor, category, slug, "Command validation failed");
            return Err(CoreError::Validation(format!(
                "Command {slug} is not available"
            ))
            .into());
        }

        let log = self
            .logs
            .create_running(NewExecutionLog::for_command(actor, category, command, &inputs))
            .await?;
        let context = ExecutionContext {
            log_id: log.id,
            actor_id: actor,
        };

        tracing::info!(
            log_id = log.id,
            actor_id = actor,
            category,
            slug,
            command_type = %command.executor_type(),
            "Executing command",
        );

        let start = Instant::now();
        let result = match AssertUnwindSafe(executor.execute(command, &inputs, &context))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = format!("Unexpected error: {}", panic_message(panic.as_ref()));
                tracing::error!(log_id = log.id, slug, error = %message, "Executor panicked");
                self.abort(log.id, &message, start.elapsed().as_secs_f64())
                    .await;
                return Err(AppError::ExecutionAborted {
                    log_id: log.id,
                    message,
                });
            }
        };

        if let Err(e) = self
            .logs
            .finalize(log.id, ExecutionOutcome::from_result(&result))
            .await
        {
            let message = format!("Failed to record execution result: {e}");
            tracing::error!(log_id = log.id, slug, error = %e, "Log finalization failed");
            self.abort(log.id, &message, result.duration_secs).await;
            return Err(AppError::ExecutionAborted {
                log_id: log.id,
                message,
            });
        }

        if result.success {
            tracing::info!(
                log_id = log.id,
                slug,
                duration = result.duration_secs,
                "Command succeeded",
            );
        } else {
            tracing::warn!(
                log_id = log.id,
                slug,
                error = result.error.as_deref().unwrap_or_default(),
                "Command failed",
            );
        }

        Ok(DispatchResult {
            result,
            log_id: log.id,
        })
    }

    /// Snapshot of a log owned by `actor`.
    pub async fn get_status(&self, actor: ActorId, log_id: DbId) -> AppResult<ExecutionLog> {
        self.authorize(actor, Permission::View)?;
        let log = self
            .logs
            .find(log_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "execution log",
                key: log_id.to_string(),
            })?;

        if log.actor_id != actor {
            return Err(CoreError::Forbidden(format!(
                "execution log {log_id} belongs to another actor"
            ))
            .into());
        }
        Ok(log)
    }

    fn authorize(&self, actor: ActorId, permission: Permission) -> AppResult<()> {
        if self.authorizer.can_perform(actor, permission) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!("actor {actor} may not {}", permission.as_str())).into())
        }
    }

    fn resolve(&self, category: &str, slug: &str) -> AppResult<&CommandDefinition> {
        self.catalog.find(category, slug).ok_or_else(|| {
            CoreError::NotFound {
                entity: "command",
                key: format!("{category}/{slug}"),
            }
            .into()
        })
    }

    fn executor_for(&self, command: &CommandDefinition) -> AppResult<&Executor> {
        let executor_type = command.executor_type();
        self.executors
            .get(executor_type)
            .ok_or(AppError::InvalidType(executor_type))
    }

    /// Force the log to `failed`. Errors are only logged; the caller is
    /// already reporting a failure.
    async fn abort(&self, log_id: DbId, message: &str, duration: f64) {
        if let Err(e) = self
            .logs
            .finalize(log_id, ExecutionOutcome::aborted(message, duration))
            .await
        {
            tracing::error!(log_id, error = %e, "Could not mark execution log failed");
        }
    }
}
