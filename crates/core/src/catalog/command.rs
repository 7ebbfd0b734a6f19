//! Command definitions and the executor type they declare.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::field::InputField;

/// Method invoked on a custom service when the definition names none.
pub const DEFAULT_SERVICE_METHOD: &str = "handle";

/// The four executor kinds a command can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorType {
    ScriptedCommand,
    BackgroundJob,
    Shell,
    CustomService,
}

impl ExecutorType {
    pub const ALL: [ExecutorType; 4] = [
        Self::ScriptedCommand,
        Self::BackgroundJob,
        Self::Shell,
        Self::CustomService,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScriptedCommand => "scripted-command",
            Self::BackgroundJob => "background-job",
            Self::Shell => "shell",
            Self::CustomService => "custom-service",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for ExecutorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a command actually does. The variant doubles as the executor type,
/// so only the fields meaningful for that executor exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CommandAction {
    /// A named action run through the host application's command runner.
    ScriptedCommand { command: String },
    /// A registered job type pushed onto a queue.
    BackgroundJob {
        job: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        queue: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        connection: Option<String>,
    },
    /// A shell command line template with `{{field}}` placeholders.
    Shell {
        command: String,
        /// Timeout override in seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        working_directory: Option<String>,
    },
    /// A method on a registered service handler.
    CustomService {
        service: String,
        #[serde(default = "default_method")]
        method: String,
    },
}

fn default_method() -> String {
    DEFAULT_SERVICE_METHOD.to_string()
}

impl CommandAction {
    pub fn executor_type(&self) -> ExecutorType {
        match self {
            Self::ScriptedCommand { .. } => ExecutorType::ScriptedCommand,
            Self::BackgroundJob { .. } => ExecutorType::BackgroundJob,
            Self::Shell { .. } => ExecutorType::Shell,
            Self::CustomService { .. } => ExecutorType::CustomService,
        }
    }

    /// The action identifier: command name, job type, shell template, or
    /// `service@method`.
    pub fn identifier(&self) -> String {
        match self {
            Self::ScriptedCommand { command } | Self::Shell { command, .. } => command.clone(),
            Self::BackgroundJob { job, .. } => job.clone(),
            Self::CustomService { service, method } => format!("{service}@{method}"),
        }
    }
}

/// One runnable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub action: CommandAction,
    #[serde(default)]
    pub confirmation_required: bool,
    #[serde(default)]
    pub inputs: Vec<InputField>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, action: CommandAction) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            description: String::new(),
            action,
            confirmation_required: false,
            inputs: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<InputField>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn executor_type(&self) -> ExecutorType {
        self.action.executor_type()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
