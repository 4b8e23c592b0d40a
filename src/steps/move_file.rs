//! Move file step - single source to destination moves

use crate::core::context::ExecutionContext;
use crate::core::fsx;
use crate::core::log::LogSink;
use crate::steps::{
    ConfigField, ConfigFieldKind, StepConfig, StepDescriptor, StepResult, WorkflowStep,
};
use async_trait::async_trait;
use serde_json::{json, Map};
use std::fs;
use std::path::{Path, PathBuf};

pub const STEP_TYPE: &str = "move_file";

pub struct MoveFileStep {
    config: StepConfig,
    log: LogSink,
}

pub fn create(config: StepConfig, log: LogSink) -> Box<dyn WorkflowStep> {
    Box::new(MoveFileStep { config, log })
}

pub fn descriptor() -> StepDescriptor {
    StepDescriptor {
        step_type: STEP_TYPE,
        display_name: "Move File",
        description: "Move a file or directory to a new location",
        category: "file",
        config_fields: vec![
            ConfigField::new("source", "Source Path", ConfigFieldKind::String)
                .required()
                .description("Path to the file or directory to move (relative to project root)")
                .placeholder("build/app/outputs/flutter-apk/app-release.apk"),
            ConfigField::new("destination", "Destination Path", ConfigFieldKind::String)
                .required()
                .description("Destination path (relative to project root or absolute)")
                .placeholder("releases/app.apk"),
            ConfigField::new("overwrite", "Overwrite Existing", ConfigFieldKind::Boolean)
                .default_value(json!(false))
                .description("Overwrite if destination already exists"),
            ConfigField::new("createDirs", "Create Directories", ConfigFieldKind::Boolean)
                .default_value(json!(true))
                .description("Create destination directories if they don't exist"),
        ],
    }
}

#[async_trait]
impl WorkflowStep for MoveFileStep {
    fn validate(&self) -> Result<(), String> {
        if self.config.str("source").map_or(true, |s| s.trim().is_empty()) {
            return Err("Source path is required".to_string());
        }
        if self
            .config
            .str("destination")
            .map_or(true, |s| s.trim().is_empty())
        {
            return Err("Destination path is required".to_string());
        }
        Ok(())
    }

    async fn execute(&self, context: &ExecutionContext) -> StepResult {
        let source = self.config.string_or("source", "");
        let destination = self.config.string_or("destination", "");
        let overwrite = self.config.bool_or("overwrite", false);
        let create_dirs = self.config.bool_or("createDirs", true);

        let source_path = resolve(&context.project_root, &source);
        let dest_path = resolve(&context.project_root, &destination);

        if !source_path.exists() {
            return StepResult::failed(
                format!("Source does not exist: {}", source_path.display()),
                format!("File not found: {source}"),
            );
        }

        if dest_path.exists() && !overwrite {
            return StepResult::failed(
                format!("Destination already exists: {}", dest_path.display()),
                "Destination exists and overwrite is disabled",
            );
        }

        if let Some(parent) = dest_path.parent() {
            if create_dirs {
                if let Err(e) = fs::create_dir_all(parent) {
                    return StepResult::failed("Move operation failed", e.to_string());
                }
            } else if !parent.exists() {
                return StepResult::failed(
                    format!("Destination directory does not exist: {}", parent.display()),
                    "Destination directory not found",
                );
            }
        }

        self.log.info(&format!(
            "Moving {} to {}",
            source_path.display(),
            dest_path.display()
        ));

        if dest_path.exists() && overwrite {
            let removed = if dest_path.is_dir() {
                fs::remove_dir_all(&dest_path)
            } else {
                fs::remove_file(&dest_path)
            };
            if let Err(e) = removed {
                return StepResult::failed("Move operation failed", e.to_string());
            }
        }

        if let Err(e) = fsx::move_path(&source_path, &dest_path) {
            self.log.error(&format!("Move failed: {e}"));
            return StepResult::failed("Move operation failed", e.to_string());
        }

        self.log
            .success(&format!("Successfully moved to {}", dest_path.display()));

        let mut output = Map::new();
        output.insert("source".to_string(), json!(source_path.display().to_string()));
        output.insert(
            "destination".to_string(),
            json!(dest_path.display().to_string()),
        );
        StepResult::ok_with(format!("Moved {source} to {destination}"), output)
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
