//! Project, app and workflow configuration records
//!
//! These are the JSON shapes consumed from callers and from the keyed
//! stores: app records with per-platform build/run settings, step
//! configuration payloads and standalone workflow definitions.

use crate::core::error::Result;
use crate::core::platform::Platform;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A registered project pointing at a Flutter project root on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub path: PathBuf,
}

/// A configured app inside a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRecord {
    pub id: String,
    pub project_id: String,
    pub app_name: String,
    #[serde(default)]
    pub package_id: String,
    /// Platforms this app may be built for.
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub build_settings: HashMap<Platform, PlatformSettings>,
}

impl AppRecord {
    pub fn supports(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    /// Settings for one platform, defaulting to empty when unset.
    pub fn settings_for(&self, platform: Platform) -> PlatformSettings {
        self.build_settings.get(&platform).cloned().unwrap_or_default()
    }
}

/// Per-platform settings, split into the build and run phases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    pub build: PhaseSettings,
    pub run: PhaseSettings,
}

/// Settings for one phase (build or run): extra command arguments,
/// dart-defines and the workflow steps around the toolchain invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseSettings {
    pub args: Vec<String>,
    pub dart_defines: Vec<String>,
    pub pre_steps: Vec<StepSpec>,
    pub post_steps: Vec<StepSpec>,
}

impl PhaseSettings {
    /// Configured extra arguments, trimmed, empties dropped.
    pub fn extra_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.trim())
            .filter(|arg| !arg.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// `--dart-define=KEY=VALUE` arguments for each configured define.
    pub fn dart_define_args(&self) -> Vec<String> {
        self.dart_defines
            .iter()
            .map(|define| define.trim())
            .filter(|define| !define.is_empty())
            .map(|define| format!("--dart-define={define}"))
            .collect()
    }
}

/// One configured step inside a workflow or phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl StepSpec {
    /// The step id, falling back to a positional one.
    pub fn effective_id(&self, index: usize) -> String {
        self.id.clone().unwrap_or_else(|| format!("step_{index}"))
    }

    /// The display name, falling back to the step type.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.step_type)
    }
}

/// A standalone workflow definition: a named, ordered step list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

impl WorkflowSpec {
    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }
}
