//! Real-time event surface consumed by an external transport

use crate::core::log::LogEntry;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Status of a single workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Error,
    Skipped,
}

/// Terminal and in-flight status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Running,
    Success,
    Error,
    /// Halted by a user stop request rather than a failure.
    Stopped,
}

/// Lifecycle phase of the run session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Running,
    Reloading,
    Restarting,
    Stopped,
}

/// Compact step-result payload carried by step-status events.
#[derive(Debug, Clone, Serialize)]
pub struct StepResultSummary {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Events published while builds, runs and workflows execute.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    WorkflowLog {
        run_id: Uuid,
        entry: LogEntry,
    },
    WorkflowStepStatus {
        run_id: Uuid,
        step_id: String,
        step_index: usize,
        status: StepStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<StepResultSummary>,
    },
    WorkflowStatus {
        run_id: Uuid,
        status: WorkflowStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    BuildLog {
        build_id: Uuid,
        entry: LogEntry,
    },
    RunLog {
        entry: LogEntry,
    },
    RunStatus {
        status: RunPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        device: Option<String>,
    },
}

/// Broadcast bus for real-time events. Publishing is best-effort: a
/// missing or lagging subscriber never fails the publisher.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: Event) {
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
