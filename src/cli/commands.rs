//! CLI command definitions

use crate::core::{BuildMode, OutputKind, Platform};
use clap::Args;
use std::path::PathBuf;

/// Build an app for a platform
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// App identifier
    pub app_id: String,

    /// Target platform
    #[arg(short, long, default_value = "android")]
    pub platform: Platform,

    /// Build mode
    #[arg(short, long, default_value = "release")]
    pub build_type: BuildMode,

    /// Output artifact kind
    #[arg(short, long, default_value = "apk")]
    pub output_type: OutputKind,
}

/// Start a live run session on a device
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Device identifier (see `appforge devices`)
    pub device: String,

    /// Project identifier
    #[arg(short, long)]
    pub project: String,

    /// App identifier, for per-app run settings
    #[arg(short, long)]
    pub app: Option<String>,

    /// Run mode
    #[arg(short, long, default_value = "debug")]
    pub mode: BuildMode,
}

/// List attached devices
#[derive(Debug, Args, Clone)]
pub struct DevicesCommand {
    /// Filter to platforms this project supports
    #[arg(short, long)]
    pub project: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List available workflow step types
#[derive(Debug, Args, Clone)]
pub struct StepsCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show build history for an app
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// App identifier
    pub app_id: String,

    /// Project identifier (derived from the app record when omitted)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Maximum number of records to show
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Execute a workflow definition file
#[derive(Debug, Args, Clone)]
pub struct WorkflowCommand {
    /// Path to the workflow YAML file
    pub file: PathBuf,

    /// Project identifier
    #[arg(short, long)]
    pub project: String,

    /// App identifier
    #[arg(short, long)]
    pub app: String,

    /// Keep executing after a step fails
    #[arg(long)]
    pub continue_on_error: bool,
}

/// Run flutter clean in a project
#[derive(Debug, Args, Clone)]
pub struct CleanCommand {
    /// Project identifier
    pub project: String,
}
