//! Keyed JSON stores for project and app records
//!
//! Layout on disk:
//!
//! ```text
//! <projects_dir>/<project_id>/project.json
//! <projects_dir>/<project_id>/apps/<app_id>/app.json
//! <projects_dir>/<project_id>/apps/<app_id>/build_history.json
//! ```

pub mod history;

use crate::core::config::{AppRecord, ProjectRecord};
use crate::core::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Store of registered projects.
pub struct ProjectStore {
    projects_dir: PathBuf,
}

impl ProjectStore {
    pub fn new(projects_dir: PathBuf) -> Self {
        Self { projects_dir }
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// The per-app asset directory for a project.
    pub fn apps_dir(&self, project_id: &str) -> PathBuf {
        self.projects_dir.join(project_id).join("apps")
    }

    fn record_path(&self, project_id: &str) -> PathBuf {
        self.projects_dir.join(project_id).join("project.json")
    }

    pub fn get(&self, project_id: &str) -> Result<ProjectRecord> {
        let path = self.record_path(project_id);
        if !path.exists() {
            return Err(Error::ProjectNotFound(project_id.to_string()));
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, record: &ProjectRecord) -> Result<()> {
        let path = self.record_path(&record.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<ProjectRecord>> {
        let mut records = Vec::new();
        if !self.projects_dir.exists() {
            return Ok(records);
        }
        for entry in fs::read_dir(&self.projects_dir)? {
            let entry = entry?;
            let record_path = entry.path().join("project.json");
            if !record_path.exists() {
                continue;
            }
            let raw = fs::read_to_string(&record_path)?;
            match serde_json::from_str(&raw) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("skipping unreadable project record: {e}"),
            }
        }
        records.sort_by(|a: &ProjectRecord, b: &ProjectRecord| a.id.cmp(&b.id));
        Ok(records)
    }
}

/// Store of app records, keyed by app id within a project.
pub struct AppStore {
    projects_dir: PathBuf,
}

impl AppStore {
    pub fn new(projects_dir: PathBuf) -> Self {
        Self { projects_dir }
    }

    fn record_path(&self, project_id: &str, app_id: &str) -> PathBuf {
        self.projects_dir
            .join(project_id)
            .join("apps")
            .join(app_id)
            .join("app.json")
    }

    pub fn get_in(&self, project_id: &str, app_id: &str) -> Result<AppRecord> {
        let path = self.record_path(project_id, app_id);
        if !path.exists() {
            return Err(Error::AppNotFound(app_id.to_string()));
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Look an app up across all projects.
    pub fn get(&self, app_id: &str) -> Result<AppRecord> {
        if !self.projects_dir.exists() {
            return Err(Error::AppNotFound(app_id.to_string()));
        }
        for entry in fs::read_dir(&self.projects_dir)? {
            let entry = entry?;
            let project_id = entry.file_name();
            let candidate = self.record_path(&project_id.to_string_lossy(), app_id);
            if candidate.exists() {
                let raw = fs::read_to_string(&candidate)?;
                return Ok(serde_json::from_str(&raw)?);
            }
        }
        Err(Error::AppNotFound(app_id.to_string()))
    }

    pub fn save(&self, record: &AppRecord) -> Result<()> {
        let path = self.record_path(&record.project_id, &record.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_round_trip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path().to_path_buf());

        let record = ProjectRecord {
            id: "proj1".to_string(),
            name: "Demo".to_string(),
            path: dir.path().join("checkout"),
        };
        store.save(&record).unwrap();

        let loaded = store.get("proj1").unwrap();
        assert_eq!(loaded.name, "Demo");
        assert_eq!(loaded.path, dir.path().join("checkout"));

        let err = store.get("ghost").unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[test]
    fn test_app_lookup_across_projects() {
        let dir = tempfile::tempdir().unwrap();
        let store = AppStore::new(dir.path().to_path_buf());

        let record: AppRecord = serde_json::from_value(json!({
            "id": "app1",
            "projectId": "proj1",
            "appName": "Demo",
            "platforms": ["android"]
        }))
        .unwrap();
        store.save(&record).unwrap();

        assert_eq!(store.get("app1").unwrap().app_name, "Demo");
        assert_eq!(store.get_in("proj1", "app1").unwrap().id, "app1");
        assert!(matches!(
            store.get("missing").unwrap_err(),
            Error::AppNotFound(_)
        ));
    }
}
