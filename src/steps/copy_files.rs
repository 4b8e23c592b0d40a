//! Copy files step - glob-aware file and directory copies

use crate::core::context::ExecutionContext;
use crate::core::fsx;
use crate::core::log::LogSink;
use crate::steps::{
    ConfigField, ConfigFieldKind, StepConfig, StepDescriptor, StepResult, WorkflowStep,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const STEP_TYPE: &str = "copy_files";

pub struct CopyFilesStep {
    config: StepConfig,
    log: LogSink,
}

pub fn create(config: StepConfig, log: LogSink) -> Box<dyn WorkflowStep> {
    Box::new(CopyFilesStep { config, log })
}

pub fn descriptor() -> StepDescriptor {
    StepDescriptor {
        step_type: STEP_TYPE,
        display_name: "Copy Files",
        description: "Copy files or directories to a new location",
        category: "file",
        config_fields: vec![
            ConfigField::new("source", "Source Path/Pattern", ConfigFieldKind::String)
                .required()
                .description("Path to file/directory or glob pattern (relative to project root)")
                .placeholder("build/**/*.apk"),
            ConfigField::new("destination", "Destination Directory", ConfigFieldKind::String)
                .required()
                .description("Destination directory (relative to project root or absolute)")
                .placeholder("releases/"),
            ConfigField::new("overwrite", "Overwrite Existing", ConfigFieldKind::Boolean)
                .default_value(json!(false))
                .description("Overwrite if destination files already exist"),
            ConfigField::new(
                "preserveStructure",
                "Preserve Directory Structure",
                ConfigFieldKind::Boolean,
            )
            .default_value(json!(false))
            .description("Preserve relative directory structure when copying with patterns"),
            ConfigField::new("createDirs", "Create Directories", ConfigFieldKind::Boolean)
                .default_value(json!(true))
                .description("Create destination directories if they don't exist"),
        ],
    }
}

#[async_trait]
impl WorkflowStep for CopyFilesStep {
    fn validate(&self) -> Result<(), String> {
        if self.config.str("source").map_or(true, |s| s.trim().is_empty()) {
            return Err("Source path/pattern is required".to_string());
        }
        if self
            .config
            .str("destination")
            .map_or(true, |s| s.trim().is_empty())
        {
            return Err("Destination directory is required".to_string());
        }
        Ok(())
    }

    async fn execute(&self, context: &ExecutionContext) -> StepResult {
        let source = self.config.string_or("source", "");
        let destination = self.config.string_or("destination", "");
        let overwrite = self.config.bool_or("overwrite", false);
        let preserve_structure = self.config.bool_or("preserveStructure", false);
        let create_dirs = self.config.bool_or("createDirs", true);

        let project_root = &context.project_root;

        let dest_path = resolve(project_root, &destination);
        if create_dirs {
            if let Err(e) = fs::create_dir_all(&dest_path) {
                return StepResult::failed("Failed to create destination directory", e.to_string());
            }
        } else if !dest_path.exists() {
            return StepResult::failed(
                format!("Destination directory does not exist: {}", dest_path.display()),
                "Destination directory not found",
            );
        }

        let files = match find_sources(project_root, &source) {
            Ok(files) => files,
            Err(e) => return StepResult::failed("Invalid source pattern", e),
        };
        if files.is_empty() {
            return StepResult::failed(
                format!("No files found matching: {source}"),
                "No matching files",
            );
        }

        self.log.info(&format!("Found {} file(s) to copy", files.len()));

        let mut copied: Vec<Value> = Vec::new();
        for file_path in files {
            let final_dest = if preserve_structure {
                match file_path.strip_prefix(project_root) {
                    Ok(rel) => dest_path.join(rel),
                    Err(_) => dest_path.join(file_path.file_name().unwrap_or_default()),
                }
            } else {
                dest_path.join(file_path.file_name().unwrap_or_default())
            };

            if final_dest.exists() && !overwrite {
                self.log.warning(&format!(
                    "Skipping {} (already exists)",
                    file_path.file_name().unwrap_or_default().to_string_lossy()
                ));
                continue;
            }

            if create_dirs {
                if let Some(parent) = final_dest.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        return StepResult::failed("Copy operation failed", e.to_string());
                    }
                }
            }

            self.log.info(&format!(
                "Copying {} to {}",
                file_path.file_name().unwrap_or_default().to_string_lossy(),
                final_dest.display()
            ));

            let outcome = if file_path.is_dir() {
                if final_dest.exists() && overwrite {
                    fs::remove_dir_all(&final_dest).and_then(|_| fsx::copy_tree(&file_path, &final_dest))
                } else {
                    fsx::copy_tree(&file_path, &final_dest)
                }
            } else {
                fs::copy(&file_path, &final_dest).map(|_| ())
            };
            if let Err(e) = outcome {
                self.log.error(&format!("Copy failed: {e}"));
                return StepResult::failed("Copy operation failed", e.to_string());
            }

            copied.push(json!({
                "source": file_path.display().to_string(),
                "destination": final_dest.display().to_string(),
            }));
        }

        if copied.is_empty() {
            return StepResult::failed(
                "No files were copied (all skipped or failed)",
                "No files copied",
            );
        }

        self.log
            .success(&format!("Successfully copied {} file(s)", copied.len()));

        let mut output = Map::new();
        output.insert("count".to_string(), json!(copied.len()));
        let count = copied.len();
        output.insert("copied_files".to_string(), Value::Array(copied));
        StepResult::ok_with(format!("Copied {count} file(s) to {destination}"), output)
    }
}

fn resolve(project_root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Resolve a source into concrete paths, expanding glob patterns.
fn find_sources(project_root: &Path, source: &str) -> Result<Vec<PathBuf>, String> {
    let resolved = resolve(project_root, source);
    let is_pattern = source.contains('*') || source.contains('?') || source.contains('[');

    if is_pattern {
        let pattern = resolved.to_string_lossy().into_owned();
        let paths = glob::glob(&pattern).map_err(|e| e.to_string())?;
        Ok(paths.filter_map(|entry| entry.ok()).collect())
    } else if resolved.exists() {
        Ok(vec![resolved])
    } else {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn context_in(root: &Path) -> ExecutionContext {
        ExecutionContext::new(
            "proj1",
            root.to_path_buf(),
            serde_json::from_value(json!({
                "id": "app1",
                "projectId": "proj1",
                "appName": "Demo",
            }))
            .unwrap(),
            Uuid::new_v4(),
        )
    }

    fn step_with(config: Value) -> Box<dyn WorkflowStep> {
        create(
            StepConfig::new(config.as_object().unwrap().clone()),
            LogSink::noop(),
        )
    }

    #[test]
    fn test_validate_requires_source_and_destination() {
        assert!(step_with(json!({})).validate().is_err());
        assert!(step_with(json!({"source": "a"})).validate().is_err());
        assert!(step_with(json!({"source": "a", "destination": "b"}))
            .validate()
            .is_ok());
    }

    #[tokio::test]
    async fn test_copies_glob_matches() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build/a.apk"), "a").unwrap();
        fs::write(dir.path().join("build/b.apk"), "b").unwrap();
        fs::write(dir.path().join("build/keep.txt"), "x").unwrap();

        let step = step_with(json!({"source": "build/*.apk", "destination": "releases"}));
        let result = step.execute(&context_in(dir.path())).await;

        assert!(result.success, "{:?}", result.error);
        assert!(dir.path().join("releases/a.apk").exists());
        assert!(dir.path().join("releases/b.apk").exists());
        assert!(!dir.path().join("releases/keep.txt").exists());
        assert_eq!(result.output.unwrap()["count"], json!(2));
    }

    #[tokio::test]
    async fn test_skips_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "new").unwrap();
        fs::create_dir_all(dir.path().join("out")).unwrap();
        fs::write(dir.path().join("out/a.txt"), "old").unwrap();

        let step = step_with(json!({"source": "a.txt", "destination": "out"}));
        let result = step.execute(&context_in(dir.path())).await;

        // the only candidate was skipped, so nothing was copied
        assert!(!result.success);
        assert_eq!(
            fs::read_to_string(dir.path().join("out/a.txt")).unwrap(),
            "old"
        );
    }

    #[tokio::test]
    async fn test_overwrite_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "new").unwrap();
        fs::create_dir_all(dir.path().join("out")).unwrap();
        fs::write(dir.path().join("out/a.txt"), "old").unwrap();

        let step = step_with(json!({
            "source": "a.txt",
            "destination": "out",
            "overwrite": true
        }));
        let result = step.execute(&context_in(dir.path())).await;

        assert!(result.success);
        assert_eq!(
            fs::read_to_string(dir.path().join("out/a.txt")).unwrap(),
            "new"
        );
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let step = step_with(json!({"source": "nope.txt", "destination": "out"}));
        let result = step.execute(&context_in(dir.path())).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No matching files"));
    }
}
