use std::path::PathBuf;
use std::time::Duration;

use flexrunner_core::auth::{Permission, PermissionPolicy};
use flexrunner_core::catalog::Catalog;
use flexrunner_core::error::CoreError;
use flexrunner_core::settings::{
    QueueSettings, RunnerSettings, ShellSettings, DEFAULT_MAX_EXECUTION_SECS, DEFAULT_QUEUE,
    DEFAULT_SHELL_TIMEOUT_SECS,
};
use flexrunner_core::types::ActorId;

/// An environment variable that is set but cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{var} must be {expected}, got {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Runner configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub settings: RunnerSettings,
    /// Program used as the host command runner.
    pub console: PathBuf,
    /// JSON catalog file; the built-in catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    pub permissions: PermissionPolicy,
}

impl RunnerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                              | Default                 |
    /// |--------------------------------------|-------------------------|
    /// | `FLEX_RUNNER_REQUIRE_CONFIRMATION`   | `true`                  |
    /// | `FLEX_RUNNER_MAX_EXECUTION_SECS`     | `300`                   |
    /// | `FLEX_RUNNER_SHELL_ENABLED`          | `false`                 |
    /// | `FLEX_RUNNER_SHELL_TIMEOUT_SECS`     | `300`                   |
    /// | `FLEX_RUNNER_SHELL_ALLOWED`          | `[]` (JSON array)       |
    /// | `FLEX_RUNNER_SHELL_BLOCKED`          | empty (comma-separated) |
    /// | `FLEX_RUNNER_QUEUE`                  | `default`               |
    /// | `FLEX_RUNNER_QUEUE_CONNECTION`       | unset                   |
    /// | `FLEX_RUNNER_APP_ROOT`               | current directory       |
    /// | `FLEX_RUNNER_CONSOLE`                | `./console`             |
    /// | `FLEX_RUNNER_CATALOG`                | unset (built-in)        |
    /// | `FLEX_RUNNER_PERMISSION_VIEW`        | unset (everyone)        |
    /// | `FLEX_RUNNER_PERMISSION_EXECUTE`     | unset (everyone)        |
    /// | `FLEX_RUNNER_PERMISSION_VIEW_LOGS`   | unset (everyone)        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RunnerConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let require_confirmation =
            parse_bool("FLEX_RUNNER_REQUIRE_CONFIRMATION", var("FLEX_RUNNER_REQUIRE_CONFIRMATION"), true)?;
        let max_execution_secs = parse_u64(
            "FLEX_RUNNER_MAX_EXECUTION_SECS",
            var("FLEX_RUNNER_MAX_EXECUTION_SECS"),
            DEFAULT_MAX_EXECUTION_SECS,
        )?;

        let shell = ShellSettings {
            enabled: parse_bool("FLEX_RUNNER_SHELL_ENABLED", var("FLEX_RUNNER_SHELL_ENABLED"), false)?,
            timeout: Duration::from_secs(parse_u64(
                "FLEX_RUNNER_SHELL_TIMEOUT_SECS",
                var("FLEX_RUNNER_SHELL_TIMEOUT_SECS"),
                DEFAULT_SHELL_TIMEOUT_SECS,
            )?),
            allowed_patterns: parse_json_list(
                "FLEX_RUNNER_SHELL_ALLOWED",
                var("FLEX_RUNNER_SHELL_ALLOWED"),
            )?,
            blocked_commands: split_list(var("FLEX_RUNNER_SHELL_BLOCKED")),
        };

        let queue = QueueSettings {
            queue: var("FLEX_RUNNER_QUEUE").unwrap_or_else(|| DEFAULT_QUEUE.into()),
            connection: var("FLEX_RUNNER_QUEUE_CONNECTION"),
        };

        let app_root = var("FLEX_RUNNER_APP_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut permissions = PermissionPolicy::new();
        for (permission, key) in [
            (Permission::View, "FLEX_RUNNER_PERMISSION_VIEW"),
            (Permission::Execute, "FLEX_RUNNER_PERMISSION_EXECUTE"),
            (Permission::ViewLogs, "FLEX_RUNNER_PERMISSION_VIEW_LOGS"),
        ] {
            let actors = parse_actor_ids(key, var(key))?;
            permissions = permissions.grant(permission, actors);
        }

        Ok(Self {
            settings: RunnerSettings {
                require_confirmation,
                max_execution_time: Duration::from_secs(max_execution_secs),
                app_root,
                shell,
                queue,
            },
            console: var("FLEX_RUNNER_CONSOLE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./console")),
            catalog_path: var("FLEX_RUNNER_CATALOG").map(PathBuf::from),
            permissions,
        })
    }

    /// Load the configured catalog file, or the built-in catalog.
    pub fn load_catalog(&self) -> Result<Catalog, CoreError> {
        match &self.catalog_path {
            Some(path) => Catalog::from_file(path),
            None => Catalog::builtin(),
        }
    }
}

fn parse_bool(var: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError {
            var,
            expected: "a boolean",
            value,
        }),
    }
}

fn parse_u64(var: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError {
            var,
            expected: "a non-negative integer",
            value,
        }),
    }
}

fn parse_json_list(var: &'static str, value: Option<String>) -> Result<Vec<String>, ConfigError> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_str(&value).map_err(|_| ConfigError {
            var,
            expected: "a JSON array of strings",
            value,
        }),
    }
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_actor_ids(var: &'static str, value: Option<String>) -> Result<Vec<ActorId>, ConfigError> {
    split_list(value.clone())
        .iter()
        .map(|id| id.parse::<ActorId>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigError {
            var,
            expected: "a comma-separated list of actor ids",
            value: value.unwrap_or_default(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
