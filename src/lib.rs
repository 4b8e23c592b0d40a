//! appforge - build and live-run orchestrator for cross-platform Flutter apps

pub mod cli;
pub mod core;
pub mod execution;
pub mod platforms;
pub mod services;
pub mod steps;
pub mod store;
pub mod toolchain;

// Re-export commonly used types
pub use crate::core::{
    BuildMode, Error, Event, EventBus, ExecutionContext, LogEntry, LogLevel, OutputKind, Platform,
    Result, WorkflowSpec,
};
pub use crate::execution::{WorkflowExecutor, WorkflowOutcome};
pub use crate::services::{BuildOutcome, BuildRequest, BuildService, RunSessionService};
pub use crate::steps::{StepRegistry, StepResult, WorkflowStep};
pub use crate::toolchain::{FlutterCli, Toolchain};
