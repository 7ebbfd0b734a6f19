use std::collections::HashMap;

use flexrunner_core::catalog::ExecutorType;
use flexrunner_core::runner::{CommandExecutor, Executor};

/// Executors keyed by the command type they serve. At most one per type.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<ExecutorType, Executor>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor under its own type, replacing any previous one.
    pub fn register(&mut self, executor: impl Into<Executor>) -> &mut Self {
        let executor = executor.into();
        self.executors.insert(executor.executor_type(), executor);
        self
    }

    pub fn get(&self, executor_type: ExecutorType) -> Option<&Executor> {
        self.executors.get(&executor_type)
    }

    pub fn types(&self) -> impl Iterator<Item = ExecutorType> + '_ {
        self.executors.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use flexrunner_core::runner::{CustomServiceExecutor, ServiceRegistry};

    use super::*;

    #[test]
    fn register_keys_by_executor_type() {
        let mut registry = ExecutorRegistry::new();
        registry.register(CustomServiceExecutor::new(Arc::new(ServiceRegistry::new())));

        assert!(registry.get(ExecutorType::CustomService).is_some());
        assert!(registry.get(ExecutorType::Shell).is_none());
        assert_eq!(registry.types().count(), 1);
    }
}
