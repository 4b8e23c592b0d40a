//! Build history - append-only, capped, newest first

use crate::core::error::Result;
use crate::core::platform::{BuildMode, OutputKind, Platform};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

/// Maximum number of records kept per app; the oldest are evicted.
pub const MAX_RECORDS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Success,
    Error,
}

/// One build attempt, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub build_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub platform: Platform,
    pub build_type: BuildMode,
    pub output_type: OutputKind,
    pub status: BuildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    /// Whether the artifact still exists on disk. Computed on read, not
    /// persisted.
    #[serde(skip)]
    pub file_exists: bool,
}

/// File-backed build history, one capped JSON list per app.
pub struct BuildHistoryStore {
    projects_dir: PathBuf,
    output_dir: PathBuf,
}

impl BuildHistoryStore {
    pub fn new(projects_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            projects_dir,
            output_dir,
        }
    }

    fn history_path(&self, project_id: &str, app_id: &str) -> PathBuf {
        self.projects_dir
            .join(project_id)
            .join("apps")
            .join(app_id)
            .join("build_history.json")
    }

    fn load(&self, project_id: &str, app_id: &str) -> Result<Vec<BuildRecord>> {
        let path = self.history_path(project_id, app_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, project_id: &str, app_id: &str, history: &[BuildRecord]) -> Result<()> {
        let path = self.history_path(project_id, app_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(history)?)?;
        Ok(())
    }

    /// Prepend a record, evicting the oldest entries beyond the cap.
    pub fn add_record(&self, project_id: &str, app_id: &str, record: BuildRecord) -> Result<()> {
        let mut history = self.load(project_id, app_id)?;
        history.insert(0, record);
        history.truncate(MAX_RECORDS);
        self.save(project_id, app_id, &history)
    }

    /// Records for an app, newest first, decorated with artifact
    /// existence.
    pub fn list(&self, project_id: &str, app_id: &str, limit: usize) -> Result<Vec<BuildRecord>> {
        let mut history = self.load(project_id, app_id)?;
        history.truncate(limit);
        for record in &mut history {
            record.file_exists = self.artifact_exists(record);
        }
        Ok(history)
    }

    pub fn get(&self, project_id: &str, app_id: &str, build_id: Uuid) -> Result<Option<BuildRecord>> {
        let history = self.load(project_id, app_id)?;
        Ok(history.into_iter().find(|record| record.build_id == build_id).map(
            |mut record| {
                record.file_exists = self.artifact_exists(&record);
                record
            },
        ))
    }

    fn artifact_exists(&self, record: &BuildRecord) -> bool {
        match (&record.filename, record.status) {
            (Some(filename), BuildStatus::Success) => self.output_dir.join(filename).exists(),
            _ => false,
        }
    }
}
