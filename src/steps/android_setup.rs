//! Android setup step - project configuration before an Android build
//!
//! Rewrites the app name in the string resources, the package id in the
//! Gradle build file, relocates MainActivity.kt into the package-derived
//! directory and applies launcher icons from a `res.zip` archive.

use crate::core::context::ExecutionContext;
use crate::core::fsx;
use crate::core::log::LogSink;
use crate::steps::{
    ConfigField, ConfigFieldKind, StepConfig, StepDescriptor, StepResult, WorkflowStep,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use regex::{NoExpand, Regex};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

pub const STEP_TYPE: &str = "android_setup";

pub struct AndroidSetupStep {
    config: StepConfig,
    log: LogSink,
}

pub fn create(config: StepConfig, log: LogSink) -> Box<dyn WorkflowStep> {
    Box::new(AndroidSetupStep { config, log })
}

pub fn descriptor() -> StepDescriptor {
    StepDescriptor {
        step_type: STEP_TYPE,
        display_name: "Android Setup",
        description: "Configure Android project: app name, package ID, MainActivity, and app icon",
        category: "build",
        config_fields: vec![
            ConfigField::new("update_app_name", "Update App Name", ConfigFieldKind::Boolean)
                .default_value(json!(true))
                .description("Update app name in android/app/src/main/res/values/strings.xml"),
            ConfigField::new("update_package_id", "Update Package ID", ConfigFieldKind::Boolean)
                .default_value(json!(true))
                .description(
                    "Update package ID in android/app/build.gradle.kts (namespace and applicationId)",
                ),
            ConfigField::new(
                "update_main_activity",
                "Update MainActivity",
                ConfigFieldKind::Boolean,
            )
            .default_value(json!(true))
            .description(
                "Update MainActivity.kt package declaration and move to correct folder structure",
            ),
            ConfigField::new("apply_app_icon", "Apply App Icon", ConfigFieldKind::Boolean)
                .default_value(json!(true))
                .description("Extract and apply app icon from res.zip to android/app/src/main/res"),
            ConfigField::new("res_zip_file", "App Icon (res.zip)", ConfigFieldKind::File)
                .description(
                    "Upload res.zip containing mipmap folders for Android app icons. Generate icons at icon.kitchen",
                )
                .accept(".zip"),
        ],
    }
}

#[async_trait]
impl WorkflowStep for AndroidSetupStep {
    fn validate(&self) -> Result<(), String> {
        let any_enabled = self.config.bool_or("update_app_name", true)
            || self.config.bool_or("update_package_id", true)
            || self.config.bool_or("update_main_activity", true)
            || self.config.bool_or("apply_app_icon", true);
        if !any_enabled {
            return Err("At least one setup operation must be enabled".to_string());
        }
        Ok(())
    }

    async fn execute(&self, context: &ExecutionContext) -> StepResult {
        let project_root = &context.project_root;
        if !project_root.exists() {
            return StepResult::failed(
                "Project root not found",
                format!("Project root path does not exist: {}", project_root.display()),
            );
        }

        self.log.info("Starting Android setup...");

        let mut operations: Vec<&str> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        if self.config.bool_or("update_app_name", true) {
            self.log.info("Updating app name in strings.xml...");
            match update_app_name(project_root, &context.app.app_name) {
                Ok(()) => {
                    operations.push("app_name");
                    self.log.success("App name updated successfully");
                }
                Err(e) => {
                    errors.push(format!("Failed to update app name: {e}"));
                    self.log.error(&format!("Failed to update app name: {e}"));
                }
            }
        }

        if self.config.bool_or("update_package_id", true) {
            self.log.info("Updating package ID in build.gradle.kts...");
            match update_package_id(project_root, &context.app.package_id) {
                Ok(()) => {
                    operations.push("package_id");
                    self.log.success("Package ID updated successfully");
                }
                Err(e) => {
                    errors.push(format!("Failed to update package ID: {e}"));
                    self.log.error(&format!("Failed to update package ID: {e}"));
                }
            }
        }

        if self.config.bool_or("update_main_activity", true) {
            self.log.info("Updating MainActivity.kt package and location...");
            match update_main_activity(project_root, &context.app.package_id) {
                Ok(()) => {
                    operations.push("main_activity");
                    self.log.success("MainActivity.kt updated successfully");
                }
                Err(e) => {
                    errors.push(format!("Failed to update MainActivity: {e}"));
                    self.log.error(&format!("Failed to update MainActivity: {e}"));
                }
            }
        }

        if self.config.bool_or("apply_app_icon", true) {
            self.log.info("Applying app icon...");
            match self.apply_app_icon(context) {
                Ok(true) => {
                    operations.push("app_icon");
                    self.log.success("App icon applied successfully");
                }
                Ok(false) => self.log.info("No res.zip found, skipping app icon"),
                Err(e) => {
                    errors.push(format!("Failed to apply app icon: {e}"));
                    self.log.warning(&format!("Failed to apply app icon: {e}"));
                }
            }
        }

        let mut output = Map::new();
        output.insert("operations".to_string(), json!(operations));

        if !errors.is_empty() {
            output.insert("errors".to_string(), json!(errors));
            return StepResult::failed_with(
                "Android setup completed with errors",
                errors.join("; "),
                output,
            );
        }

        self.log.success("Android setup completed successfully!");
        StepResult::ok_with(
            format!("Android setup completed: {}", operations.join(", ")),
            output,
        )
    }
}

impl AndroidSetupStep {
    /// Apply launcher icons, preferring an uploaded archive over the
    /// conventional per-app asset location.
    fn apply_app_icon(&self, context: &ExecutionContext) -> Result<bool> {
        let res_dst = context
            .project_root
            .join("android")
            .join("app")
            .join("src")
            .join("main")
            .join("res");

        if let Some(upload) = self.config.value("res_zip_file").and_then(Value::as_object) {
            if let Some(data) = upload.get("data").and_then(Value::as_str) {
                let filename = upload
                    .get("filename")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                self.log.info(&format!("Using uploaded res.zip: {filename}"));
                return extract_base64_zip(data, &res_dst, &self.log);
            }
        }

        if let Some(apps_dir) = &context.apps_dir {
            let res_zip = apps_dir
                .join(&context.app_id)
                .join("android")
                .join("app_icon")
                .join("res.zip");
            if res_zip.exists() {
                self.log
                    .info(&format!("Using res.zip from default location: {}", res_zip.display()));
                return extract_zip_file(&res_zip, &res_dst, &self.log);
            }
        }

        Ok(false)
    }
}

fn update_app_name(project_root: &Path, app_name: &str) -> Result<()> {
    let strings_path = project_root
        .join("android")
        .join("app")
        .join("src")
        .join("main")
        .join("res")
        .join("values")
        .join("strings.xml");

    if !strings_path.exists() {
        bail!("strings.xml not found at {}", strings_path.display());
    }

    let content = fs::read_to_string(&strings_path)?;
    let pattern = Regex::new(r#"<string name=["']app_name["']>.*?</string>"#)?;
    let replacement = format!("<string name=\"app_name\">{app_name}</string>");

    let updated = if pattern.is_match(&content) {
        pattern.replace_all(&content, NoExpand(&replacement)).into_owned()
    } else if content.contains("<resources>") && content.contains("</resources>") {
        content.replace(
            "</resources>",
            &format!("    {replacement}\n</resources>"),
        )
    } else {
        bail!("Could not find or add app_name string in strings.xml");
    };

    fs::write(&strings_path, updated)?;
    Ok(())
}

fn update_package_id(project_root: &Path, package_id: &str) -> Result<()> {
    let build_gradle = project_root
        .join("android")
        .join("app")
        .join("build.gradle.kts");

    if !build_gradle.exists() {
        bail!("build.gradle.kts not found at {}", build_gradle.display());
    }
    if package_id.is_empty() {
        bail!("packageId not found in app config");
    }

    let content = fs::read_to_string(&build_gradle)?;

    let namespace = Regex::new(r#"namespace\s*=\s*"[^"]*""#)?;
    let content = namespace
        .replace_all(&content, NoExpand(&format!("namespace = \"{package_id}\"")))
        .into_owned();

    let application_id = Regex::new(r#"applicationId\s*=\s*"[^"]*""#)?;
    let content = application_id
        .replace_all(
            &content,
            NoExpand(&format!("applicationId = \"{package_id}\"")),
        )
        .into_owned();

    fs::write(&build_gradle, content)?;
    Ok(())
}

fn update_main_activity(project_root: &Path, package_id: &str) -> Result<()> {
    if package_id.is_empty() {
        bail!("packageId not found in app config");
    }

    let kotlin_base = project_root
        .join("android")
        .join("app")
        .join("src")
        .join("main")
        .join("kotlin");
    let package_dir = package_id
        .split('.')
        .fold(kotlin_base.clone(), |dir, part| dir.join(part));
    fs::create_dir_all(&package_dir)?;

    let source = find_main_activity(&kotlin_base).context("MainActivity.kt not found")?;
    let content = fs::read_to_string(&source)?;

    // Rewrite or insert the package declaration at the top of the file
    let mut updated: Vec<String> = Vec::new();
    let mut in_header = true;
    for line in content.lines() {
        let trimmed = line.trim();
        if in_header && trimmed.starts_with("package ") {
            updated.push(format!("package {package_id}"));
            in_header = false;
        } else if in_header && (trimmed.starts_with("import ") || trimmed.is_empty()) {
            updated.push(line.to_string());
        } else if in_header {
            updated.push(format!("package {package_id}"));
            updated.push(String::new());
            updated.push(line.to_string());
            in_header = false;
        } else {
            updated.push(line.to_string());
        }
    }

    let destination = package_dir.join("MainActivity.kt");
    fs::write(&destination, updated.join("\n"))?;

    if source != destination {
        fs::remove_file(&source)?;
        if let Some(parent) = source.parent() {
            // only removes the directory if it is now empty
            let _ = fs::remove_dir(parent);
        }
    }
    Ok(())
}

fn find_main_activity(kotlin_base: &Path) -> Option<PathBuf> {
    WalkDir::new(kotlin_base)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_name() == "MainActivity.kt")
        .map(|entry| entry.path().to_path_buf())
}

fn extract_base64_zip(data: &str, res_dst: &Path, log: &LogSink) -> Result<bool> {
    // Strip a data-URL prefix ("data:application/zip;base64,...") if present
    let encoded = data.split_once(',').map_or(data, |(_, rest)| rest);
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .context("invalid base64 payload")?;

    let tmp_path = std::env::temp_dir().join(format!("appforge-res-{}.zip", Uuid::new_v4()));
    fs::write(&tmp_path, bytes)?;
    let result = extract_zip_file(&tmp_path, res_dst, log);
    let _ = fs::remove_file(&tmp_path);
    result
}

/// Extract the mipmap folders of an icon archive over the Android res
/// directory. The archive may carry them at its root or under `res/`.
fn extract_zip_file(zip_path: &Path, res_dst: &Path, log: &LogSink) -> Result<bool> {
    let file = fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let temp_dir = std::env::temp_dir().join(format!("appforge-res-{}", Uuid::new_v4()));
    fs::create_dir_all(&temp_dir)?;
    archive.extract(&temp_dir)?;

    let res_subfolder = temp_dir.join("res");
    let source_dir = if res_subfolder.exists() {
        res_subfolder
    } else {
        temp_dir.clone()
    };

    let mut found_mipmaps = false;
    for entry in fs::read_dir(&source_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let is_mipmap = entry.path().is_dir() && name.to_string_lossy().starts_with("mipmap");
        if !is_mipmap {
            continue;
        }
        let dst = res_dst.join(&name);
        if dst.exists() {
            fs::remove_dir_all(&dst)?;
        }
        fsx::copy_tree(&entry.path(), &dst)?;
        found_mipmaps = true;
        log.info(&format!("Copied {} to Android res", name.to_string_lossy()));
    }

    fs::remove_dir_all(&temp_dir)?;
    Ok(found_mipmaps)
}
