//! Resolved runtime settings consumed by the dispatcher and executors.
//!
//! These are plain values; loading them from the environment is the api
//! crate's job (`RunnerConfig::from_env`).

use std::path::PathBuf;
use std::time::Duration;

/// Default cap on scripted command runtime (5 minutes).
pub const DEFAULT_MAX_EXECUTION_SECS: u64 = 300;

/// Default shell command timeout (5 minutes).
pub const DEFAULT_SHELL_TIMEOUT_SECS: u64 = 300;

/// Queue used when a background-job command names none.
pub const DEFAULT_QUEUE: &str = "default";

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Surface confirmation prompts for commands that ask for them.
    pub require_confirmation: bool,
    /// Upper bound for scripted commands run through the host runner.
    pub max_execution_time: Duration,
    /// Default working directory for shell commands.
    pub app_root: PathBuf,
    pub shell: ShellSettings,
    pub queue: QueueSettings,
}

#[derive(Debug, Clone)]
pub struct ShellSettings {
    /// Global kill switch for shell commands.
    pub enabled: bool,
    pub timeout: Duration,
    /// Regex patterns; when non-empty only matching lines may run.
    pub allowed_patterns: Vec<String>,
    /// Extra substrings rejected on top of the baseline list.
    pub blocked_commands: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub queue: String,
    pub connection: Option<String>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            require_confirmation: true,
            max_execution_time: Duration::from_secs(DEFAULT_MAX_EXECUTION_SECS),
            app_root: PathBuf::from("."),
            shell: ShellSettings::default(),
            queue: QueueSettings::default(),
        }
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: Duration::from_secs(DEFAULT_SHELL_TIMEOUT_SECS),
            allowed_patterns: Vec::new(),
            blocked_commands: Vec::new(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_string(),
            connection: None,
        }
    }
}
