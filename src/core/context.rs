//! Execution context - shared state threaded through a pipeline run

use crate::core::config::AppRecord;
use crate::core::platform::{BuildMode, Platform};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Context passed through an entire build or run pipeline.
///
/// Steps may read any field; they are expected to only add to state they
/// own (a step's output is harvested by the pipeline owner, not injected
/// back here). The output path and filename are appended mid-pipeline
/// once the artifact is known.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub project_id: String,
    pub project_root: PathBuf,
    pub app_id: String,
    pub app: AppRecord,
    /// Identifier of the owning build, run session or workflow run.
    pub run_id: Uuid,
    pub platform: Option<Platform>,
    pub mode: Option<BuildMode>,
    /// Directory holding per-app assets (icon archives and the like).
    pub apps_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub output_filename: Option<String>,
    /// Extra environment variables passed to script steps.
    pub env: HashMap<String, String>,
}

impl ExecutionContext {
    pub fn new(project_id: &str, project_root: PathBuf, app: AppRecord, run_id: Uuid) -> Self {
        Self {
            project_id: project_id.to_string(),
            project_root,
            app_id: app.id.clone(),
            app,
            run_id,
            platform: None,
            mode: None,
            apps_dir: None,
            output_path: None,
            output_filename: None,
            env: HashMap::new(),
        }
    }
}
