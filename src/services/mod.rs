//! Process-supervision services: one-shot builds and live run sessions

pub mod build;
pub mod run;

pub use build::{BuildOutcome, BuildRequest, BuildService, StopOutcome};
pub use run::{project_platforms, RunSessionService, RunStatusReport};
