//! Shared fixtures: a spy toolchain and a seeded project layout.
#![allow(dead_code)]

use appforge::core::config::{AppRecord, ProjectRecord};
use appforge::core::error::{Error, Result};
use appforge::core::log::LogSink;
use appforge::core::{EventBus, Platform};
use appforge::steps::StepRegistry;
use appforge::store::history::BuildHistoryStore;
use appforge::store::{AppStore, ProjectStore};
use appforge::toolchain::{Device, PidCell, Toolchain};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::sync::Semaphore;

/// A toolchain spy: records invocations, fabricates build artifacts and
/// spawns `cat` for interactive sessions.
pub struct MockToolchain {
    pub calls: Arc<Mutex<Vec<Vec<String>>>>,
    pub device_list: Vec<Device>,
    /// When set, `run` blocks until a permit is available.
    pub gate: Option<Arc<Semaphore>>,
    pub fail_build: bool,
}

impl MockToolchain {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            device_list: Vec::new(),
            gate: None,
            fail_build: false,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Toolchain for MockToolchain {
    async fn run(
        &self,
        command: &[String],
        cwd: &Path,
        _pid: &PidCell,
        sink: &LogSink,
    ) -> Result<()> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.calls.lock().unwrap().push(command.to_vec());
        sink.terminal(&format!("mock: {}", command.join(" ")));

        if command.get(1).map(String::as_str) == Some("build") {
            if self.fail_build {
                return Err(Error::Toolchain {
                    description: command.join(" "),
                    code: 1,
                });
            }
            // fabricate the artifact the android handler will look for
            let apk_dir = cwd.join("build/app/outputs/flutter-apk");
            fs::create_dir_all(&apk_dir)?;
            fs::write(apk_dir.join("app-release.apk"), b"apk-bytes")?;
        }
        Ok(())
    }

    async fn spawn_session(&self, _command: &[String], cwd: &Path) -> Result<Child> {
        // cat echoes whatever the supervisor writes to stdin
        let child = Command::new("/bin/cat")
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Ok(child)
    }

    async fn devices(&self, _cwd: Option<&Path>) -> Result<Vec<Device>> {
        Ok(self.device_list.clone())
    }
}

pub fn android_device(id: &str) -> Device {
    Device {
        id: id.to_string(),
        name: "Test Device".to_string(),
        platform: "android-arm64".to_string(),
        platform_type: Some(Platform::Android),
        is_emulator: true,
    }
}

/// A seeded on-disk layout: one project ("proj1") with a checkout
/// directory, plus empty output and projects directories.
pub struct Fixture {
    pub dir: TempDir,
    pub projects: Arc<ProjectStore>,
    pub apps: Arc<AppStore>,
    pub history: Arc<BuildHistoryStore>,
    pub registry: Arc<StepRegistry>,
    pub events: EventBus,
    pub output_dir: PathBuf,
    pub project_root: PathBuf,
}

pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let projects_dir = dir.path().join("projects");
    let output_dir = dir.path().join("outputs");
    let project_root = dir.path().join("checkout");
    fs::create_dir_all(&project_root).expect("project root");

    let projects = Arc::new(ProjectStore::new(projects_dir.clone()));
    projects
        .save(&ProjectRecord {
            id: "proj1".to_string(),
            name: "Demo Project".to_string(),
            path: project_root.clone(),
        })
        .expect("save project");

    Fixture {
        apps: Arc::new(AppStore::new(projects_dir.clone())),
        history: Arc::new(BuildHistoryStore::new(projects_dir, output_dir.clone())),
        registry: Arc::new(StepRegistry::builtin()),
        events: EventBus::default(),
        projects,
        output_dir,
        project_root,
        dir,
    }
}

pub fn seed_app(fixture: &Fixture, app: serde_json::Value) -> AppRecord {
    let record: AppRecord = serde_json::from_value(app).expect("app record");
    fixture.apps.save(&record).expect("save app");
    record
}
