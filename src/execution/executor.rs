//! Workflow executor - runs ordered step lists against a shared context
//!
//! Two forms share the same per-step semantics: the full form carries a
//! run id and emits step-status and workflow-status events, while
//! [`WorkflowExecutor::execute_steps`] is the reduced interface the
//! build and run pipelines use for their pre/post hooks.

use crate::core::config::{StepSpec, WorkflowSpec};
use crate::core::context::ExecutionContext;
use crate::core::events::{Event, EventBus, StepResultSummary, StepStatus, WorkflowStatus};
use crate::core::log::{LogEntry, LogLevel, LogSink};
use crate::steps::{StepConfig, StepRegistry, StepResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// Result of one step inside a run.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step_id: String,
    pub index: usize,
    pub result: StepResult,
}

/// Result of a whole workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub run_id: Uuid,
    pub status: WorkflowStatus,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub step_results: Vec<StepOutcome>,
}

impl WorkflowOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == WorkflowStatus::Success
    }
}

/// Executes workflow steps in sequence with stop-on-error semantics,
/// per-step status events and cooperative cancellation.
pub struct WorkflowExecutor {
    registry: Arc<StepRegistry>,
    events: EventBus,
    stop_flag: Arc<AtomicBool>,
    run_logs: Arc<Mutex<HashMap<Uuid, Vec<LogEntry>>>>,
}

impl WorkflowExecutor {
    pub fn new(registry: Arc<StepRegistry>, events: EventBus) -> Self {
        Self {
            registry,
            events,
            stop_flag: Arc::new(AtomicBool::new(false)),
            run_logs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Request a cooperative stop. Checked before each step starts; the
    /// step currently running is allowed to finish.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Logs collected for a run.
    pub fn logs(&self, run_id: Uuid) -> Vec<LogEntry> {
        self.run_logs
            .lock()
            .unwrap()
            .get(&run_id)
            .cloned()
            .unwrap_or_default()
    }

    fn log(
        &self,
        run_id: Uuid,
        message: &str,
        level: LogLevel,
        step_id: Option<&str>,
        step_index: Option<usize>,
    ) {
        let mut entry = LogEntry::new(message, level);
        entry.step_id = step_id.map(str::to_string);
        entry.step_index = step_index;

        self.run_logs
            .lock()
            .unwrap()
            .entry(run_id)
            .or_default()
            .push(entry.clone());

        info!("[{run_id}] {message}");
        self.events.publish(Event::WorkflowLog { run_id, entry });
    }

    fn emit_step_status(
        &self,
        run_id: Uuid,
        step_id: &str,
        step_index: usize,
        status: StepStatus,
        result: Option<&StepResult>,
    ) {
        self.events.publish(Event::WorkflowStepStatus {
            run_id,
            step_id: step_id.to_string(),
            step_index,
            status,
            result: result.map(|result| StepResultSummary {
                success: result.success,
                message: result.message.clone(),
                error: result.error.clone(),
            }),
        });
    }

    fn emit_workflow_status(&self, run_id: Uuid, status: WorkflowStatus, message: Option<&str>) {
        self.events.publish(Event::WorkflowStatus {
            run_id,
            status,
            message: message.map(str::to_string),
        });
    }

    /// A sink tagging every line with the step identity before it lands
    /// in the run log and goes out as a workflow log event.
    fn step_sink(&self, run_id: Uuid, step_id: String, index: usize) -> LogSink {
        let events = self.events.clone();
        let run_logs = self.run_logs.clone();
        LogSink::new(move |message, level| {
            let mut entry = LogEntry::new(message, level);
            entry.step_id = Some(step_id.clone());
            entry.step_index = Some(index);
            run_logs
                .lock()
                .unwrap()
                .entry(run_id)
                .or_default()
                .push(entry.clone());
            events.publish(Event::WorkflowLog { run_id, entry });
        })
    }

    /// Execute a workflow definition, emitting status events throughout.
    pub async fn execute(
        &self,
        workflow: &WorkflowSpec,
        context: &ExecutionContext,
        stop_on_error: bool,
    ) -> WorkflowOutcome {
        let run_id = Uuid::new_v4();
        self.stop_flag.store(false, Ordering::SeqCst);
        let started_at = Utc::now();

        self.log(
            run_id,
            &format!("Starting workflow: {}", workflow.name),
            LogLevel::Info,
            None,
            None,
        );
        self.emit_workflow_status(run_id, WorkflowStatus::Running, Some(&workflow.name));

        let steps = &workflow.steps;
        if steps.is_empty() {
            self.log(run_id, "Workflow has no steps", LogLevel::Warning, None, None);
            self.emit_workflow_status(
                run_id,
                WorkflowStatus::Success,
                Some("Workflow has no steps"),
            );
            return outcome(run_id, WorkflowStatus::Success, "Workflow has no steps", started_at, Vec::new());
        }

        self.log(
            run_id,
            &format!("Executing {} step(s)", steps.len()),
            LogLevel::Info,
            None,
            None,
        );

        let mut results: Vec<StepOutcome> = Vec::new();
        let mut failed = false;

        for (index, spec) in steps.iter().enumerate() {
            if self.stop_flag.load(Ordering::SeqCst) {
                self.log(run_id, "Workflow stopped by user", LogLevel::Warning, None, None);
                self.emit_workflow_status(
                    run_id,
                    WorkflowStatus::Stopped,
                    Some("Workflow stopped by user"),
                );
                return outcome(run_id, WorkflowStatus::Stopped, "Stopped by user", started_at, results);
            }

            let step_id = spec.effective_id(index);
            self.log(
                run_id,
                &format!("Step {}/{}: {}", index + 1, steps.len(), spec.display_name()),
                LogLevel::Info,
                Some(&step_id),
                Some(index),
            );
            self.emit_step_status(run_id, &step_id, index, StepStatus::Running, None);

            let step_log = self.step_sink(run_id, step_id.clone(), index);
            let result = run_step(&self.registry, spec, context, step_log).await;
            let success = result.success;

            if success {
                self.log(
                    run_id,
                    &format!("Step completed: {}", result.message),
                    LogLevel::Success,
                    Some(&step_id),
                    Some(index),
                );
                self.emit_step_status(run_id, &step_id, index, StepStatus::Success, Some(&result));
            } else {
                self.log(
                    run_id,
                    &format!("Step failed: {}", result.message),
                    LogLevel::Error,
                    Some(&step_id),
                    Some(index),
                );
                self.emit_step_status(run_id, &step_id, index, StepStatus::Error, Some(&result));
            }

            results.push(StepOutcome {
                step_id,
                index,
                result,
            });

            if !success && stop_on_error {
                failed = true;
                break;
            }
        }

        // Steps never started are reported as skipped
        if failed {
            for index in results.len()..steps.len() {
                let step_id = steps[index].effective_id(index);
                self.emit_step_status(run_id, &step_id, index, StepStatus::Skipped, None);
            }
        }

        let all_success = results.iter().all(|step| step.result.success);
        let (status, message) = if failed || !all_success {
            (WorkflowStatus::Error, "Workflow failed")
        } else {
            (WorkflowStatus::Success, "Workflow completed successfully")
        };

        self.log(
            run_id,
            message,
            if status == WorkflowStatus::Success {
                LogLevel::Success
            } else {
                LogLevel::Error
            },
            None,
            None,
        );
        self.emit_workflow_status(run_id, status, Some(message));
        outcome(run_id, status, message, started_at, results)
    }

    /// Execute a step list directly, without run bookkeeping or status
    /// events. Used by the build and run pipelines for pre/post hooks.
    /// Returns overall success (the AND of all step successes) and the
    /// per-step results.
    pub async fn execute_steps(
        registry: &StepRegistry,
        steps: &[StepSpec],
        context: &ExecutionContext,
        log: &LogSink,
        stop_on_error: bool,
    ) -> (bool, Vec<StepOutcome>) {
        if steps.is_empty() {
            return (true, Vec::new());
        }

        let mut results: Vec<StepOutcome> = Vec::new();
        let mut all_success = true;

        for (index, spec) in steps.iter().enumerate() {
            let step_id = spec.effective_id(index);
            log.info(&format!(
                "Executing step {}/{}: {}",
                index + 1,
                steps.len(),
                spec.display_name()
            ));

            let result = run_step(registry, spec, context, log.scoped(spec.display_name())).await;

            if result.success {
                log.success(&format!("Step completed: {}", result.message));
            } else {
                log.error(&format!("Step failed: {}", result.message));
                all_success = false;
            }

            let stop = !result.success && stop_on_error;
            results.push(StepOutcome {
                step_id,
                index,
                result,
            });
            if stop {
                break;
            }
        }

        (all_success, results)
    }
}

fn outcome(
    run_id: Uuid,
    status: WorkflowStatus,
    message: &str,
    started_at: DateTime<Utc>,
    step_results: Vec<StepOutcome>,
) -> WorkflowOutcome {
    let finished_at = Utc::now();
    WorkflowOutcome {
        run_id,
        status,
        message: message.to_string(),
        started_at,
        finished_at,
        duration_secs: (finished_at - started_at).num_seconds(),
        step_results,
    }
}

/// Instantiate and run one step: unknown types and invalid configs are
/// synthesized into error results, and a panicking step is contained at
/// the task boundary instead of unwinding into the pipeline.
async fn run_step(
    registry: &StepRegistry,
    spec: &StepSpec,
    context: &ExecutionContext,
    log: LogSink,
) -> StepResult {
    let Some(step) = registry.create(&spec.step_type, StepConfig::from(&spec.config), log.clone())
    else {
        let message = format!("Unknown step type: {}", spec.step_type);
        log.error(&message);
        return StepResult::failed(message.clone(), message);
    };

    if let Err(validation_error) = step.validate() {
        let message = format!("Step validation failed: {validation_error}");
        log.error(&message);
        return StepResult::failed(message, validation_error);
    }

    let context = context.clone();
    let handle = tokio::spawn(async move { step.execute(&context).await });
    match handle.await {
        Ok(result) => result,
        Err(join_error) => {
            let message = format!("Step execution error: {join_error}");
            log.error(&message);
            StepResult::failed("Step execution error", join_error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn sample_context(root: PathBuf) -> ExecutionContext {
        ExecutionContext::new(
            "proj1",
            root,
            serde_json::from_value(json!({
                "id": "app1",
                "projectId": "proj1",
                "appName": "Demo",
            }))
            .unwrap(),
            Uuid::new_v4(),
        )
    }

    fn specs(value: serde_json::Value) -> Vec<StepSpec> {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_execute_steps_stop_on_error_skips_remainder() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StepRegistry::builtin();
        let context = sample_context(dir.path().to_path_buf());

        let steps = specs(json!([
            {"id": "ok", "type": "run_script", "config": {"script": "echo one", "shell": "/bin/sh"}},
            {"id": "boom", "type": "run_script", "config": {"script": "exit 1", "shell": "/bin/sh"}},
            {"id": "never", "type": "run_script", "config": {"script": "echo three", "shell": "/bin/sh"}}
        ]));

        let (ok, results) =
            WorkflowExecutor::execute_steps(&registry, &steps, &context, &LogSink::noop(), true)
                .await;

        assert!(!ok);
        assert_eq!(results.len(), 2);
        assert!(results[0].result.success);
        assert!(!results[1].result.success);
    }

    #[tokio::test]
    async fn test_execute_steps_continues_without_stop_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StepRegistry::builtin();
        let context = sample_context(dir.path().to_path_buf());

        let steps = specs(json!([
            {"id": "boom", "type": "run_script", "config": {"script": "exit 1", "shell": "/bin/sh"}},
            {"id": "after", "type": "run_script", "config": {"script": "echo after", "shell": "/bin/sh"}}
        ]));

        let (ok, results) =
            WorkflowExecutor::execute_steps(&registry, &steps, &context, &LogSink::noop(), false)
                .await;

        assert!(!ok);
        assert_eq!(results.len(), 2);
        assert!(results[1].result.success);
    }

    #[tokio::test]
    async fn test_unknown_step_type_synthesizes_failure() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StepRegistry::builtin();
        let context = sample_context(dir.path().to_path_buf());

        let steps = specs(json!([{"id": "x", "type": "does_not_exist", "config": {}}]));
        let (ok, results) =
            WorkflowExecutor::execute_steps(&registry, &steps, &context, &LogSink::noop(), true)
                .await;

        assert!(!ok);
        assert_eq!(
            results[0].result.message,
            "Unknown step type: does_not_exist"
        );
    }

    #[tokio::test]
    async fn test_invalid_config_fails_without_execution() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StepRegistry::builtin();
        let context = sample_context(dir.path().to_path_buf());

        // run_script without a script fails validation
        let steps = specs(json!([{"id": "x", "type": "run_script", "config": {}}]));
        let (ok, results) =
            WorkflowExecutor::execute_steps(&registry, &steps, &context, &LogSink::noop(), true)
                .await;

        assert!(!ok);
        assert!(results[0]
            .result
            .message
            .starts_with("Step validation failed"));
    }

    #[tokio::test]
    async fn test_full_workflow_emits_step_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let executor = WorkflowExecutor::new(Arc::new(StepRegistry::builtin()), events);
        let context = sample_context(dir.path().to_path_buf());

        let workflow = WorkflowSpec {
            name: "test".to_string(),
            steps: specs(json!([
                {"id": "ok", "type": "run_script", "config": {"script": "echo hi", "shell": "/bin/sh"}},
                {"id": "boom", "type": "run_script", "config": {"script": "exit 1", "shell": "/bin/sh"}},
                {"id": "skipped", "type": "run_script", "config": {"script": "echo no", "shell": "/bin/sh"}}
            ])),
        };

        let result = executor.execute(&workflow, &context, true).await;
        assert_eq!(result.status, WorkflowStatus::Error);
        assert_eq!(result.step_results.len(), 2);

        let mut statuses: Vec<(String, StepStatus)> = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Event::WorkflowStepStatus { step_id, status, .. } = event {
                statuses.push((step_id, status));
            }
        }
        assert!(statuses.contains(&("ok".to_string(), StepStatus::Success)));
        assert!(statuses.contains(&("boom".to_string(), StepStatus::Error)));
        assert!(statuses.contains(&("skipped".to_string(), StepStatus::Skipped)));
        assert!(!statuses.contains(&("skipped".to_string(), StepStatus::Running)));
    }

    #[tokio::test]
    async fn test_stop_flag_is_rearmed_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let executor =
            WorkflowExecutor::new(Arc::new(StepRegistry::builtin()), EventBus::default());
        let context = sample_context(dir.path().to_path_buf());

        // a stop requested before the run starts must not leak into it
        executor.request_stop();
        let workflow = WorkflowSpec {
            name: "test".to_string(),
            steps: specs(json!([
                {"id": "ok", "type": "run_script", "config": {"script": "echo hi", "shell": "/bin/sh"}}
            ])),
        };
        let result = executor.execute(&workflow, &context, true).await;
        assert_eq!(result.status, WorkflowStatus::Success);
    }

    #[tokio::test]
    async fn test_empty_workflow_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let executor =
            WorkflowExecutor::new(Arc::new(StepRegistry::builtin()), EventBus::default());
        let context = sample_context(dir.path().to_path_buf());

        let workflow = WorkflowSpec {
            name: "empty".to_string(),
            steps: Vec::new(),
        };
        let result = executor.execute(&workflow, &context, true).await;
        assert_eq!(result.status, WorkflowStatus::Success);
        assert!(result.step_results.is_empty());
    }
}
