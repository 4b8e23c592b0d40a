//! Workflow execution engine

pub mod executor;

pub use executor::{StepOutcome, WorkflowExecutor, WorkflowOutcome};
