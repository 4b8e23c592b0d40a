//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{
    BuildCommand, CleanCommand, DevicesCommand, HistoryCommand, RunCommand, StepsCommand,
    WorkflowCommand,
};
use std::path::PathBuf;

/// Build and live-run orchestrator for cross-platform Flutter apps
#[derive(Debug, Parser, Clone)]
#[command(name = "appforge")]
#[command(version = "0.1.0")]
#[command(about = "Build and live-run orchestrator for cross-platform Flutter apps", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding project and app records
    #[arg(long, global = true)]
    pub projects_dir: Option<PathBuf>,

    /// Directory build artifacts are moved into
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Path to the flutter binary (defaults to `flutter` on PATH)
    #[arg(long, global = true)]
    pub flutter_bin: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build an app for a platform
    Build(BuildCommand),

    /// Start a live run session on a device
    Run(RunCommand),

    /// List attached devices
    Devices(DevicesCommand),

    /// List available workflow step types
    Steps(StepsCommand),

    /// Show build history for an app
    History(HistoryCommand),

    /// Execute a workflow definition file
    Workflow(WorkflowCommand),

    /// Run flutter clean in a project
    Clean(CleanCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }
}
