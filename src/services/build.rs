//! Build pipeline service
//!
//! Composes platform handler, workflow executor and subprocess
//! supervision into the one-shot build lifecycle: pre-steps, platform
//! setup, clean / dependency fetch / build, artifact relocation,
//! post-steps, history record. At most one build is in flight per
//! process; the slot is claimed before any subprocess work starts.

use crate::core::config::AppRecord;
use crate::core::context::ExecutionContext;
use crate::core::error::{Error, Result};
use crate::core::events::{Event, EventBus};
use crate::core::fsx;
use crate::core::log::{LogEntry, LogLevel, LogSink};
use crate::core::platform::{BuildMode, OutputKind, Platform};
use crate::execution::WorkflowExecutor;
use crate::platforms::{handler_for, HandlerContext};
use crate::steps::{custom_args, StepRegistry};
use crate::store::history::{BuildHistoryStore, BuildRecord, BuildStatus};
use crate::store::{AppStore, ProjectStore};
use crate::toolchain::{terminate_process, PidCell, Toolchain, FLUTTER_BIN};
use chrono::{Local, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

const STOP_GRACE: Duration = Duration::from_secs(5);

/// A requested build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub app_id: String,
    pub platform: Platform,
    pub build_type: BuildMode,
    pub output_type: OutputKind,
}

/// A finished, successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub build_id: Uuid,
    pub filename: String,
    pub output_path: PathBuf,
    pub platform: Platform,
    pub output_type: OutputKind,
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    NoActiveBuild,
}

/// Current build state, for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct BuildStatusReport {
    pub is_building: bool,
    pub build_id: Option<Uuid>,
}

#[derive(Clone)]
struct ActiveBuild {
    build_id: Uuid,
    pid: PidCell,
}

pub struct BuildService<T: Toolchain> {
    toolchain: Arc<T>,
    projects: Arc<ProjectStore>,
    apps: Arc<AppStore>,
    history: Arc<BuildHistoryStore>,
    registry: Arc<StepRegistry>,
    events: EventBus,
    output_dir: PathBuf,
    slot: Mutex<Option<ActiveBuild>>,
    logs: Arc<StdMutex<HashMap<Uuid, Vec<LogEntry>>>>,
}

impl<T: Toolchain> BuildService<T> {
    pub fn new(
        toolchain: Arc<T>,
        projects: Arc<ProjectStore>,
        apps: Arc<AppStore>,
        history: Arc<BuildHistoryStore>,
        registry: Arc<StepRegistry>,
        events: EventBus,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            toolchain,
            projects,
            apps,
            history,
            registry,
            events,
            output_dir,
            slot: Mutex::new(None),
            logs: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Run the full build pipeline for one app and platform.
    pub async fn build(&self, request: BuildRequest) -> Result<BuildOutcome> {
        let app = self.apps.get(&request.app_id)?;
        let project = self.projects.get(&app.project_id)?;
        if !app.supports(request.platform) {
            return Err(Error::UnsupportedPlatform(request.platform));
        }

        let build_id = Uuid::new_v4();
        {
            let mut slot = self.slot.lock().await;
            if slot.is_some() {
                return Err(Error::BuildInProgress);
            }
            *slot = Some(ActiveBuild {
                build_id,
                pid: PidCell::default(),
            });
        }
        self.logs.lock().unwrap().insert(build_id, Vec::new());

        let started = Utc::now();
        let result = self
            .run_pipeline(&request, &app, project.path.clone(), build_id)
            .await;
        let duration = (Utc::now() - started).num_seconds().max(0) as u64;

        match &result {
            Ok(outcome) => {
                self.record_history(
                    &app,
                    &request,
                    build_id,
                    BuildStatus::Success,
                    Some(outcome.filename.clone()),
                    None,
                    duration,
                );
            }
            Err(e) => {
                self.log(build_id, &format!("Build failed: {e}"), LogLevel::Error);
                self.record_history(
                    &app,
                    &request,
                    build_id,
                    BuildStatus::Error,
                    None,
                    Some(e.to_string()),
                    duration,
                );
            }
        }

        *self.slot.lock().await = None;
        result
    }

    async fn run_pipeline(
        &self,
        request: &BuildRequest,
        app: &AppRecord,
        project_root: PathBuf,
        build_id: Uuid,
    ) -> Result<BuildOutcome> {
        let sink = self.sink(build_id);
        let apps_dir = self.projects.apps_dir(&app.project_id);
        let settings = app.settings_for(request.platform).build;

        let mut context =
            ExecutionContext::new(&app.project_id, project_root.clone(), app.clone(), build_id);
        context.platform = Some(request.platform);
        context.mode = Some(request.build_type);
        context.apps_dir = Some(apps_dir.clone());

        // Pre-build steps run before anything touches the toolchain
        if !settings.pre_steps.is_empty() {
            self.log(build_id, "Running pre-build steps...", LogLevel::Info);
            let (ok, _) = WorkflowExecutor::execute_steps(
                &self.registry,
                &settings.pre_steps,
                &context,
                &sink,
                true,
            )
            .await;
            if !ok {
                return Err(Error::PreStepsFailed);
            }
        }
        let harvested_args = custom_args::extract_arguments(&settings.pre_steps);

        // Platform setup
        self.log(
            build_id,
            &format!("Step 1: Setting up {} configuration...", request.platform),
            LogLevel::Info,
        );
        let handler = handler_for(
            request.platform,
            HandlerContext {
                project_root: project_root.clone(),
                apps_dir,
                log: sink.clone(),
            },
        );
        handler.setup(&request.app_id, app)?;

        // Toolchain: clean, fetch dependencies, build
        self.log(
            build_id,
            &format!(
                "Step 2: Building {} {}...",
                request.platform, request.output_type
            ),
            LogLevel::Info,
        );
        let pid = self.active_pid().await;
        self.run_toolchain(
            &[FLUTTER_BIN.to_string(), "clean".to_string()],
            &project_root,
            &pid,
            &sink,
            "Flutter clean",
        )
        .await?;
        self.run_toolchain(
            &[FLUTTER_BIN.to_string(), "pub".to_string(), "get".to_string()],
            &project_root,
            &pid,
            &sink,
            "Flutter pub get",
        )
        .await?;

        let mut command = handler.build_command(request.build_type, request.output_type);
        command.extend(harvested_args);
        command.extend(settings.extra_args());
        command.extend(settings.dart_define_args());

        self.log(
            build_id,
            &format!("Running command: {}", command.join(" ")),
            LogLevel::Info,
        );
        self.run_toolchain(&command, &project_root, &pid, &sink, "Flutter build")
            .await?;
        self.log(build_id, "Flutter build completed", LogLevel::Success);

        // Relocate the artifact under a deterministic name
        let output = handler.find_output(request.build_type, request.output_type)?;
        let ext = handler.output_extension(request.output_type);
        let filename = format!(
            "{}_{}_{}_{}{}",
            app.app_name.replace(' ', "_"),
            request.platform,
            request.build_type,
            Local::now().format("%Y%m%d_%H%M%S"),
            ext
        );
        fs::create_dir_all(&self.output_dir)?;
        let final_path = self.output_dir.join(&filename);
        fsx::move_path(&output, &final_path)?;

        context.output_path = Some(final_path.clone());
        context.output_filename = Some(filename.clone());
        self.log(build_id, "Build completed successfully!", LogLevel::Success);

        // Post-build steps degrade to warnings; the artifact already exists
        if !settings.post_steps.is_empty() {
            self.log(build_id, "Running post-build steps...", LogLevel::Info);
            let (ok, _) = WorkflowExecutor::execute_steps(
                &self.registry,
                &settings.post_steps,
                &context,
                &sink,
                false,
            )
            .await;
            if !ok {
                self.log(
                    build_id,
                    "Post-build steps reported failures",
                    LogLevel::Warning,
                );
            }
        }

        Ok(BuildOutcome {
            build_id,
            filename,
            output_path: final_path,
            platform: request.platform,
            output_type: request.output_type,
        })
    }

    async fn run_toolchain(
        &self,
        command: &[String],
        cwd: &Path,
        pid: &PidCell,
        sink: &LogSink,
        description: &str,
    ) -> Result<()> {
        sink.info(&format!("Running {description}..."));
        match self.toolchain.run(command, cwd, pid, sink).await {
            Ok(()) => {
                sink.success(&format!("{description} completed"));
                Ok(())
            }
            Err(Error::Toolchain { description: cmd, code }) => {
                sink.error(&format!("{description} failed with exit code {code}"));
                Err(Error::Toolchain {
                    description: cmd,
                    code,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Stop the in-flight build by signalling its subprocess. The dying
    /// pipeline observes the exit and frees the slot itself.
    pub async fn stop(&self) -> StopOutcome {
        let active = self.slot.lock().await.clone();
        match active {
            Some(active) => {
                let pid = *active.pid.lock().await;
                if let Some(pid) = pid {
                    terminate_process(pid, STOP_GRACE).await;
                }
                self.log(active.build_id, "Build stopped by user", LogLevel::Warning);
                StopOutcome::Stopped
            }
            None => StopOutcome::NoActiveBuild,
        }
    }

    pub async fn status(&self) -> BuildStatusReport {
        let slot = self.slot.lock().await;
        BuildStatusReport {
            is_building: slot.is_some(),
            build_id: slot.as_ref().map(|active| active.build_id),
        }
    }

    /// Logs collected for a build.
    pub fn logs(&self, build_id: Uuid) -> Vec<LogEntry> {
        self.logs
            .lock()
            .unwrap()
            .get(&build_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn active_pid(&self) -> PidCell {
        self.slot
            .lock()
            .await
            .as_ref()
            .map(|active| active.pid.clone())
            .unwrap_or_default()
    }

    fn log(&self, build_id: Uuid, message: &str, level: LogLevel) {
        let entry = LogEntry::new(message, level);
        self.logs
            .lock()
            .unwrap()
            .entry(build_id)
            .or_default()
            .push(entry.clone());
        info!("[build {build_id}] {message}");
        self.events.publish(Event::BuildLog { build_id, entry });
    }

    fn sink(&self, build_id: Uuid) -> LogSink {
        let logs = self.logs.clone();
        let events = self.events.clone();
        LogSink::new(move |message, level| {
            let entry = LogEntry::new(message, level);
            logs.lock()
                .unwrap()
                .entry(build_id)
                .or_default()
                .push(entry.clone());
            events.publish(Event::BuildLog { build_id, entry });
        })
    }

    fn record_history(
        &self,
        app: &AppRecord,
        request: &BuildRequest,
        build_id: Uuid,
        status: BuildStatus,
        filename: Option<String>,
        error_message: Option<String>,
        duration_secs: u64,
    ) {
        let record = BuildRecord {
            build_id,
            timestamp: Utc::now(),
            platform: request.platform,
            build_type: request.build_type,
            output_type: request.output_type,
            status,
            filename,
            error_message,
            duration_secs: Some(duration_secs),
            file_exists: false,
        };
        // history is best-effort and never fails the build
        if let Err(e) = self.history.add_record(&app.project_id, &app.id, record) {
            warn!("Failed to log build to history: {e}");
        }
    }
}
