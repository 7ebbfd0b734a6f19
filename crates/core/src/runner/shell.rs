//! Shell executor.
//!
//! Substitutes escaped input values into the command template, passes the
//! resulting line through the [`ShellGate`], then runs it with `sh -c`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::process::Command;

use super::executor::{CommandExecutor, ExecutionContext, ExecutionResult};
use super::gate::{ShellGate, REJECTION_MESSAGE};
use super::subprocess::{self, ProcessOutput, TRUNCATION_NOTICE};
use crate::catalog::{CommandAction, CommandDefinition, ExecutorType, InputField};
use crate::inputs::{flatten_to_string, is_blank, SubmittedInputs};

/// Flatten a submitted value to plain text. Lists become comma-joined.
pub fn sanitize_value(value: &Value) -> String {
    flatten_to_string(value)
}

/// Quote `arg` as a single shell word.
pub fn escape_arg(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Replace each field's token in `template` with its escaped value. Blank
/// values leave the token in place.
///
/// Substitution is a single left-to-right pass over the template. Inserted
/// values are never scanned again, so a value containing another field's
/// token stays literal text.
pub fn build_command_line(template: &str, fields: &[InputField], inputs: &SubmittedInputs) -> String {
    let substitutions: Vec<(String, String)> = fields
        .iter()
        .filter_map(|field| {
            let value = inputs.get(&field.name).filter(|v| !is_blank(Some(*v)))?;
            Some((field.shell_token(), escape_arg(&sanitize_value(value))))
        })
        .collect();

    let mut line = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        // Earliest match wins; the longer token wins a tie.
        let next = substitutions
            .iter()
            .filter_map(|(token, value)| rest.find(token.as_str()).map(|at| (at, token, value)))
            .min_by_key(|(at, token, _)| (*at, std::cmp::Reverse(token.len())));

        match next {
            Some((at, token, value)) => {
                line.push_str(&rest[..at]);
                line.push_str(value);
                rest = &rest[at + token.len()..];
            }
            None => {
                line.push_str(rest);
                return line;
            }
        }
    }
}

/// stdout, followed by stderr under a marker line when stderr is non-empty.
fn combined_output(out: &ProcessOutput) -> String {
    let mut combined = if out.stderr.is_empty() {
        out.stdout.clone()
    } else {
        format!("{}\nSTDERR:\n{}", out.stdout, out.stderr)
    };
    if out.truncated {
        combined.push('\n');
        combined.push_str(TRUNCATION_NOTICE);
    }
    combined
}

pub struct ShellExecutor {
    gate: Arc<ShellGate>,
    default_timeout: Duration,
    app_root: PathBuf,
}

impl ShellExecutor {
    pub fn new(gate: Arc<ShellGate>, default_timeout: Duration, app_root: impl Into<PathBuf>) -> Self {
        Self {
            gate,
            default_timeout,
            app_root: app_root.into(),
        }
    }
}

impl CommandExecutor for ShellExecutor {
    fn executor_type(&self) -> ExecutorType {
        ExecutorType::Shell
    }

    async fn validate_command(&self, command: &CommandDefinition) -> bool {
        match &command.action {
            CommandAction::Shell { command: template, .. } => {
                self.gate.is_enabled() && self.gate.is_allowed(template)
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
        let CommandAction::Shell {
            command: template,
            timeout,
            working_directory,
        } = &command.action
        else {
            return ExecutionResult::rejected(format!("{} is not a shell command", command.slug));
        };

        let line = build_command_line(template, &command.inputs, inputs);
        let decision = self.gate.evaluate(&line);
        if !decision.is_allowed() {
            tracing::warn!(
                log_id = context.log_id,
                actor_id = context.actor_id,
                slug = %command.slug,
                ?decision,
                "Shell command rejected",
            );
            return ExecutionResult::rejected(REJECTION_MESSAGE);
        }

        let timeout = timeout.map(Duration::from_secs).unwrap_or(self.default_timeout);
        let dir = working_directory
            .as_deref()
            .map(Path::new)
            .unwrap_or(self.app_root.as_path());

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&line);

        let start = Instant::now();
        match subprocess::run_command(&mut cmd, timeout, Some(dir)).await {
            Ok(out) => {
                let duration = out.duration_ms as f64 / 1000.0;
                let output = combined_output(&out);
                if out.success() {
                    ExecutionResult::success(output, duration).with_exit_code(0)
                } else {
                    ExecutionResult::failure(
                        format!("Command failed with exit code {}", out.exit_code),
                        duration,
                    )
                    .with_output(output)
                    .with_exit_code(out.exit_code)
                }
            }
            Err(e) => ExecutionResult::failure(e.to_string(), start.elapsed().as_secs_f64()),
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
    use crate::catalog::FieldType;
    use crate::settings::ShellSettings;

    fn executor(enabled: bool, allowed: &[&str]) -> ShellExecutor {
        let gate = ShellGate::new(&ShellSettings {
            enabled,
            allowed_patterns: allowed.iter().map(|s| s.to_string()).collect(),
            ..ShellSettings::default()
        })
        .expect("gate");
        ShellExecutor::new(Arc::new(gate), Duration::from_secs(5), std::env::temp_dir())
    }

    fn shell(template: &str, fields: Vec<InputField>) -> CommandDefinition {
        CommandDefinition::new(
            "Shell",
            "shell",
            CommandAction::Shell {
                command: template.into(),
                timeout: None,
                working_directory: None,
            },
        )
        .with_inputs(fields)
    }

    fn inputs(value: Value) -> SubmittedInputs {
        value.as_object().cloned().unwrap_or_default()
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext { log_id: 1, actor_id: 1 }
    }

    #[test]
    fn escape_wraps_and_splices_quotes() {
        assert_eq!(escape_arg("plain"), "'plain'");
        assert_eq!(escape_arg("it's"), r"'it'\''s'");
        assert_eq!(escape_arg(""), "''");
    }

    #[test]
    fn hostile_value_is_escaped_into_one_word() {
        let fields = vec![InputField::new("name", FieldType::Text)];
        let line = build_command_line(
            "echo {{name}}",
            &fields,
            &inputs(json!({"name": "x; rm -rf /"})),
        );
        assert_eq!(line, "echo 'x; rm -rf /'");
    }

    #[test]
    fn values_containing_other_tokens_stay_literal() {
        let fields = vec![
            InputField::new("a", FieldType::Text),
            InputField::new("b", FieldType::Text),
        ];
        let line = build_command_line(
            "echo {{a}} {{b}}",
            &fields,
            &inputs(json!({"a": "{{b}}", "b": "x; touch pwned #"})),
        );
        assert_eq!(line, "echo '{{b}}' 'x; touch pwned #'");
    }

    #[test]
    fn repeated_tokens_are_all_substituted() {
        let fields = vec![InputField::new("name", FieldType::Text)];
        let line = build_command_line(
            "echo {{name}} {{name}}",
            &fields,
            &inputs(json!({"name": "web"})),
        );
        assert_eq!(line, "echo 'web' 'web'");
    }

    #[tokio::test]
    async fn cross_field_tokens_do_not_break_out_of_quotes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let exec = ShellExecutor::new(
            Arc::new(
                ShellGate::new(&ShellSettings {
                    enabled: true,
                    allowed_patterns: vec!["/^echo /".into()],
                    ..ShellSettings::default()
                })
                .expect("gate"),
            ),
            Duration::from_secs(5),
            dir.path(),
        );
        let cmd = shell(
            "echo {{a}} {{b}}",
            vec![
                InputField::new("a", FieldType::Text),
                InputField::new("b", FieldType::Text),
            ],
        );
        let result = exec
            .execute(&cmd, &inputs(json!({"a": "{{b}}", "b": "x; touch pwned #"})), &ctx())
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, "{{b}} x; touch pwned #\n");
        assert!(!dir.path().join("pwned").exists());
    }

    #[test]
    fn lists_flatten_before_escaping() {
        let fields = vec![InputField::new("hosts", FieldType::Tags)];
        let line = build_command_line("ping {{hosts}}", &fields, &inputs(json!({"hosts": ["a", "b"]})));
        assert_eq!(line, "ping 'a,b'");
    }

    #[test]
    fn blank_values_leave_token() {
        let fields = vec![InputField::new("name", FieldType::Text)];
        let line = build_command_line("echo {{name}}", &fields, &inputs(json!({"name": ""})));
        assert_eq!(line, "echo {{name}}");
    }

    #[tokio::test]
    async fn hostile_input_is_rejected_by_block_list_without_running() {
        let exec = executor(true, &[]);
        let cmd = shell("echo {{name}}", vec![InputField::new("name", FieldType::Text)]);
        let result = exec
            .execute(&cmd, &inputs(json!({"name": "x; rm -rf /"})), &ctx())
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(REJECTION_MESSAGE));
        assert_eq!(result.duration_secs, 0.0);
        assert!(result.output.is_empty());
    }

    #[tokio::test]
    async fn allow_listed_hostile_input_runs_as_literal_text() {
        let exec = executor(true, &["/^echo /"]);
        let cmd = shell("echo {{name}}", vec![InputField::new("name", FieldType::Text)]);
        let result = exec
            .execute(&cmd, &inputs(json!({"name": "x; rm -rf /"})), &ctx())
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, "x; rm -rf /\n");
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn stderr_is_appended_under_marker() {
        let exec = executor(true, &["/^echo /"]);
        let result = exec
            .execute(&shell("echo out; echo err >&2; exit 4", vec![]), &SubmittedInputs::new(), &ctx())
            .await;
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(4));
        assert_eq!(result.error.as_deref(), Some("Command failed with exit code 4"));
        assert_eq!(result.output, "out\n\nSTDERR:\nerr\n");
    }

    #[tokio::test]
    async fn oversized_output_still_succeeds_with_notice() {
        let exec = executor(true, &["^head "]);
        let result = exec
            .execute(&shell("head -c 12000000 /dev/zero", vec![]), &SubmittedInputs::new(), &ctx())
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.output.ends_with(TRUNCATION_NOTICE));
    }

    #[tokio::test]
    async fn timeout_is_a_failure() {
        let exec = executor(true, &["^sleep"]);
        let mut cmd = shell("sleep 30", vec![]);
        if let CommandAction::Shell { timeout, .. } = &mut cmd.action {
            *timeout = Some(1);
        }
        let result = exec.execute(&cmd, &SubmittedInputs::new(), &ctx()).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn command_working_directory_overrides_app_root() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("here.txt"), "x").expect("write");

        let exec = executor(true, &[]);
        let mut cmd = shell("ls", vec![]);
        if let CommandAction::Shell { working_directory, .. } = &mut cmd.action {
            *working_directory = Some(dir.path().to_string_lossy().into_owned());
        }
        let result = exec.execute(&cmd, &SubmittedInputs::new(), &ctx()).await;
        assert!(result.success);
        assert!(result.output.contains("here.txt"));
    }

    #[tokio::test]
    async fn validate_needs_enabled_shell_and_clean_template() {
        let cmd = shell("ls", vec![]);
        assert!(executor(true, &[]).validate_command(&cmd).await);
        assert!(!executor(false, &[]).validate_command(&cmd).await);
        // Enabled but not allow-listed.
        assert!(!executor(true, &["^echo"]).validate_command(&cmd).await);
        assert!(!executor(true, &[]).validate_command(&shell("sudo ls", vec![])).await);
    }
}
