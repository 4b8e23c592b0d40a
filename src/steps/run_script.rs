//! Run script step - shell commands with streamed output and a timeout

use crate::core::context::ExecutionContext;
use crate::core::log::LogSink;
use crate::steps::{
    ConfigField, ConfigFieldKind, SelectOption, StepConfig, StepDescriptor, StepResult,
    WorkflowStep,
};
use crate::toolchain::stream_output;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

pub const STEP_TYPE: &str = "run_script";

const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub struct RunScriptStep {
    config: StepConfig,
    log: LogSink,
}

pub fn create(config: StepConfig, log: LogSink) -> Box<dyn WorkflowStep> {
    Box::new(RunScriptStep { config, log })
}

pub fn descriptor() -> StepDescriptor {
    StepDescriptor {
        step_type: STEP_TYPE,
        display_name: "Run Script",
        description: "Execute a shell command or script",
        category: "utility",
        config_fields: vec![
            ConfigField::new("script", "Script", ConfigFieldKind::Textarea)
                .required()
                .description("Shell command or script to execute")
                .placeholder("echo 'Hello World'\nls -la"),
            ConfigField::new("workingDir", "Working Directory", ConfigFieldKind::String)
                .description(
                    "Directory to run the script in (relative to project root). Leave empty for project root.",
                )
                .placeholder("."),
            ConfigField::new("timeout", "Timeout (seconds)", ConfigFieldKind::Number)
                .default_value(json!(DEFAULT_TIMEOUT_SECS))
                .description("Maximum execution time in seconds (default: 300)"),
            ConfigField::new("failOnError", "Fail on Error", ConfigFieldKind::Boolean)
                .default_value(json!(true))
                .description("Fail the step if the script returns a non-zero exit code"),
            ConfigField::new("shell", "Shell", ConfigFieldKind::Select)
                .default_value(json!("/bin/bash"))
                .description("Shell to use for execution")
                .options(vec![
                    SelectOption { value: "/bin/bash", label: "Bash" },
                    SelectOption { value: "/bin/sh", label: "sh" },
                    SelectOption { value: "/bin/zsh", label: "Zsh" },
                ]),
        ],
    }
}

#[async_trait]
impl WorkflowStep for RunScriptStep {
    fn validate(&self) -> Result<(), String> {
        if self.config.str("script").map_or(true, |s| s.trim().is_empty()) {
            return Err("Script is required".to_string());
        }
        if let Some(timeout) = self.config.value("timeout") {
            let positive = timeout.as_f64().map_or(false, |t| t > 0.0);
            if !positive {
                return Err("Timeout must be a positive number".to_string());
            }
        }
        Ok(())
    }

    async fn execute(&self, context: &ExecutionContext) -> StepResult {
        let script = self.config.string_or("script", "");
        let working_dir = self.config.string_or("workingDir", "");
        let timeout_secs = self.config.u64_or("timeout", DEFAULT_TIMEOUT_SECS);
        let fail_on_error = self.config.bool_or("failOnError", true);
        let shell = self.config.string_or("shell", "/bin/bash");

        let cwd = if working_dir.trim().is_empty() {
            context.project_root.clone()
        } else {
            context.project_root.join(working_dir.trim())
        };
        if !cwd.exists() {
            return StepResult::failed(
                format!("Working directory does not exist: {}", cwd.display()),
                format!("Directory not found: {}", cwd.display()),
            );
        }

        self.log.info(&format!("Executing script in {}", cwd.display()));
        self.log.terminal(&format!("Script:\n{script}"));

        let mut child = match Command::new(&shell)
            .arg("-c")
            .arg(&script)
            .current_dir(&cwd)
            .envs(&context.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                self.log.error(&format!("Script execution failed: {e}"));
                return StepResult::failed("Script execution failed", e.to_string());
            }
        };

        let mut output_lines: Vec<String> = Vec::new();
        let streamed = timeout(
            Duration::from_secs(timeout_secs),
            stream_output(&mut child, |line| {
                output_lines.push(line.to_string());
                self.log.terminal(line);
            }),
        )
        .await;

        let status = match streamed {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                self.log.error(&format!("Script execution failed: {e}"));
                return StepResult::failed("Script execution failed", e.to_string());
            }
            Err(_) => {
                let _ = child.kill().await;
                let mut output = Map::new();
                output.insert("stdout".to_string(), json!(output_lines.join("\n")));
                return StepResult::failed_with(
                    format!("Script timed out after {timeout_secs} seconds"),
                    "Execution timeout",
                    output,
                );
            }
        };

        let exit_code = status.code().unwrap_or(-1);
        let success = exit_code == 0 || !fail_on_error;

        if exit_code != 0 {
            let message = format!("Script exited with code {exit_code}");
            if fail_on_error {
                self.log.error(&message);
            } else {
                self.log.warning(&message);
            }
        } else {
            self.log.success("Script completed successfully");
        }

        let mut output = Map::new();
        output.insert("exit_code".to_string(), json!(exit_code));
        output.insert("stdout".to_string(), json!(output_lines.join("\n")));

        let message = format!(
            "Script {} with exit code {exit_code}",
            if success { "completed" } else { "failed" }
        );
        if success {
            StepResult::ok_with(message, output)
        } else {
            StepResult::failed_with(message, format!("Exit code: {exit_code}"), output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use uuid::Uuid;

    fn context_in(root: &Path) -> ExecutionContext {
        ExecutionContext::new(
            "proj1",
            root.to_path_buf(),
            serde_json::from_value(json!({
                "id": "app1",
                "projectId": "proj1",
                "appName": "Demo",
            }))
            .unwrap(),
            Uuid::new_v4(),
        )
    }

    fn step_with(config: Value) -> Box<dyn WorkflowStep> {
        create(
            StepConfig::new(config.as_object().unwrap().clone()),
            LogSink::noop(),
        )
    }

    #[test]
    fn test_validate_requires_script_and_positive_timeout() {
        assert!(step_with(json!({})).validate().is_err());
        assert!(step_with(json!({"script": "  "})).validate().is_err());
        assert!(step_with(json!({"script": "true", "timeout": 0}))
            .validate()
            .is_err());
        assert!(step_with(json!({"script": "true", "timeout": 5}))
            .validate()
            .is_ok());
    }

    #[tokio::test]
    async fn test_streams_output_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let step = step_with(json!({"script": "echo hello; echo world", "shell": "/bin/sh"}));
        let result = step.execute(&context_in(dir.path())).await;

        assert!(result.success, "{:?}", result.error);
        let output = result.output.unwrap();
        assert_eq!(output["exit_code"], json!(0));
        assert_eq!(output["stdout"], json!("hello\nworld"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let step = step_with(json!({"script": "exit 2", "shell": "/bin/sh"}));
        let result = step.execute(&context_in(dir.path())).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Exit code: 2"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_tolerated_with_fail_on_error_off() {
        let dir = tempfile::tempdir().unwrap();
        let step = step_with(json!({
            "script": "exit 2",
            "shell": "/bin/sh",
            "failOnError": false
        }));
        let result = step.execute(&context_in(dir.path())).await;

        assert!(result.success);
        assert_eq!(result.output.unwrap()["exit_code"], json!(2));
    }

    #[tokio::test]
    async fn test_timeout_kills_script() {
        let dir = tempfile::tempdir().unwrap();
        let step = step_with(json!({
            "script": "echo started; sleep 30",
            "shell": "/bin/sh",
            "timeout": 1
        }));
        let result = step.execute(&context_in(dir.path())).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Execution timeout"));
        assert_eq!(result.output.unwrap()["stdout"], json!("started"));
    }
}
