//! Custom-service executor: methods on handlers registered by name at startup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::executor::{CommandExecutor, ExecutionContext, ExecutionResult};
use super::output::OutputBuffer;
use crate::catalog::{CommandAction, CommandDefinition, ExecutorType};
use crate::inputs::{is_truthy, SubmittedInputs};

/// Keys owned by [`ExecutionResult`] that a structured result cannot
/// override through `extra`.
const RESERVED_KEYS: &[&str] = &[
    "success", "output", "duration", "error", "exit_code", "job_id", "result",
];

/// A service result that carries its own success flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredResult {
    pub success: bool,
    /// Replaces the captured output when set.
    pub output: Option<String>,
    pub error: Option<String>,
    pub extra: Map<String, Value>,
}

impl StructuredResult {
    pub fn new(success: bool) -> Self {
        Self {
            success,
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// What a service method hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceReturn {
    Structured(StructuredResult),
    /// Any other value; the call counts as successful.
    Value(Value),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid service input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// Method names this handler answers to.
    fn methods(&self) -> &[&'static str];

    async fn call(
        &self,
        method: &str,
        inputs: &SubmittedInputs,
        command: &CommandDefinition,
        output: &mut OutputBuffer,
    ) -> Result<ServiceReturn, ServiceError>;
}

#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<dyn ServiceHandler>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ServiceHandler>) -> &mut Self {
        self.services.insert(name.into(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ServiceHandler>> {
        self.services.get(name).cloned()
    }

    /// Methods exposed by `service`, or `None` if it is not registered.
    pub fn methods_of(&self, service: &str) -> Option<&[&'static str]> {
        self.services.get(service).map(|s| s.methods())
    }

    pub fn supports(&self, service: &str, method: &str) -> bool {
        self.methods_of(service)
            .is_some_and(|methods| methods.contains(&method))
    }
}

pub struct CustomServiceExecutor {
    registry: Arc<ServiceRegistry>,
}

impl CustomServiceExecutor {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }
}

impl CommandExecutor for CustomServiceExecutor {
    fn executor_type(&self) -> ExecutorType {
        ExecutorType::CustomService
    }

    async fn validate_command(&self, command: &CommandDefinition) -> bool {
        match &command.action {
            CommandAction::CustomService { service, method } => {
                self.registry.supports(service, method)
            }
            _ => false,
        }
    }

    async fn execute(
        &self,
        command: &CommandDefinition,
        inputs: &SubmittedInputs,
        context: &ExecutionContext,
    ) -> ExecutionResult {
        let CommandAction::CustomService { service, method } = &command.action else {
            return ExecutionResult::rejected(format!("{} is not a custom service", command.slug));
        };

        let start = Instant::now();
        let Some(handler) = self.registry.get(service) else {
            return ExecutionResult::failure(
                format!("Service {service} does not exist."),
                start.elapsed().as_secs_f64(),
            );
        };
        if !handler.methods().contains(&method.as_str()) {
            return ExecutionResult::failure(
                format!("Method {method} does not exist in {service}."),
                start.elapsed().as_secs_f64(),
            );
        }

        tracing::debug!(log_id = context.log_id, %service, %method, "Calling service");
        let mut output = OutputBuffer::new();
        let returned = handler.call(method, inputs, command, &mut output).await;
        let duration = start.elapsed().as_secs_f64();

        match returned {
            Ok(ServiceReturn::Structured(structured)) => ExecutionResult {
                success: structured.success,
                output: structured.output.unwrap_or_else(|| output.into_string()),
                duration_secs: duration,
                error: structured.error,
                extra: structured
                    .extra
                    .into_iter()
                    .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
                    .collect(),
                ..ExecutionResult::default()
            },
            Ok(ServiceReturn::Value(value)) => {
                let text = if !output.is_empty() {
                    output.into_string()
                } else if is_truthy(&value) {
                    value.to_string()
                } else {
                    "Service executed successfully".to_string()
                };
                ExecutionResult {
                    result: Some(value),
                    ..ExecutionResult::success(text, duration)
                }
            }
            Err(e) => ExecutionResult::failure(e.to_string(), duration).with_output(output.into_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    /// Service with one method per return shape.
    struct Inventory;

    #[async_trait]
    impl ServiceHandler for Inventory {
        fn methods(&self) -> &[&'static str] {
            &["handle", "count", "silent", "report", "explode"]
        }

        async fn call(
            &self,
            method: &str,
            inputs: &SubmittedInputs,
            _command: &CommandDefinition,
            output: &mut OutputBuffer,
        ) -> Result<ServiceReturn, ServiceError> {
            match method {
                "handle" => {
                    output.line("synced");
                    Ok(ServiceReturn::Value(json!(true)))
                }
                "count" => Ok(ServiceReturn::Value(json!({"items": 3}))),
                "silent" => Ok(ServiceReturn::Value(Value::Null)),
                "report" => Ok(ServiceReturn::Structured(
                    StructuredResult::new(inputs.contains_key("ok"))
                        .with_error("not ok")
                        .with("records", 12)
                        .with("duration", 999),
                )),
                _ => {
                    output.line("halfway");
                    Err(ServiceError::Failed("disk full".into()))
                }
            }
        }
    }

    fn executor() -> CustomServiceExecutor {
        let mut registry = ServiceRegistry::new();
        registry.register("inventory", Arc::new(Inventory));
        CustomServiceExecutor::new(Arc::new(registry))
    }

    fn call(method: &str) -> CommandDefinition {
        CommandDefinition::new(
            "Inventory",
            "inventory",
            CommandAction::CustomService {
                service: "inventory".into(),
                method: method.into(),
            },
        )
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext { log_id: 5, actor_id: 2 }
    }

    #[tokio::test]
    async fn validate_checks_service_and_method() {
        let exec = executor();
        assert!(exec.validate_command(&call("handle")).await);
        assert!(!exec.validate_command(&call("missing")).await);

        let unknown = CommandDefinition::new(
            "x",
            "x",
            CommandAction::CustomService {
                service: "billing".into(),
                method: "handle".into(),
            },
        );
        assert!(!exec.validate_command(&unknown).await);
    }

    #[tokio::test]
    async fn captured_output_wins_for_plain_values() {
        let result = executor()
            .execute(&call("handle"), &SubmittedInputs::new(), &ctx())
            .await;
        assert!(result.success);
        assert_eq!(result.output, "synced\n");
        assert_eq!(result.result, Some(json!(true)));
    }

    #[tokio::test]
    async fn value_is_json_encoded_without_output() {
        let result = executor()
            .execute(&call("count"), &SubmittedInputs::new(), &ctx())
            .await;
        assert_eq!(result.output, r#"{"items":3}"#);

        let silent = executor()
            .execute(&call("silent"), &SubmittedInputs::new(), &ctx())
            .await;
        assert!(silent.success);
        assert_eq!(silent.output, "Service executed successfully");
    }

    #[tokio::test]
    async fn structured_result_is_merged() {
        let result = executor()
            .execute(&call("report"), &SubmittedInputs::new(), &ctx())
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("not ok"));
        assert_eq!(result.extra.get("records"), Some(&json!(12)));
        // Computed duration is kept; the service cannot override it.
        assert!(!result.extra.contains_key("duration"));
        assert!(result.duration_secs < 999.0);
    }

    #[tokio::test]
    async fn error_keeps_partial_output() {
        let result = executor()
            .execute(&call("explode"), &SubmittedInputs::new(), &ctx())
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("disk full"));
        assert_eq!(result.output, "halfway\n");
    }

    #[tokio::test]
    async fn unknown_method_is_reported() {
        let result = executor()
            .execute(&call("missing"), &SubmittedInputs::new(), &ctx())
            .await;
        assert_eq!(
            result.error.as_deref(),
            Some("Method missing does not exist in inventory.")
        );
    }
}
