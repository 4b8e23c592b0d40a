//! Core domain models for appforge
//!
//! This module defines the fundamental data structures shared by the
//! workflow executor, platform handlers and supervision services.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod fsx;
pub mod log;
pub mod platform;

pub use config::{AppRecord, PhaseSettings, ProjectRecord, StepSpec, WorkflowSpec};
pub use context::ExecutionContext;
pub use error::{Error, Result};
pub use events::{Event, EventBus, RunPhase, StepStatus, WorkflowStatus};
pub use log::{LogEntry, LogLevel, LogSink};
pub use platform::{BuildMode, OutputKind, Platform};
