//! Run session service
//!
//! Supervises a long-lived interactive `flutter run` process. A
//! dedicated supervisor task owns the child and its stdin and is the
//! only writer: reload, restart and quit arrive over a command channel,
//! so in-session commands never interleave. Reader tasks classify each
//! output line and publish it for the session's lifetime.

use crate::core::config::AppRecord;
use crate::core::context::ExecutionContext;
use crate::core::error::{Error, Result};
use crate::core::events::{Event, EventBus, RunPhase};
use crate::core::log::{classify_line, LogEntry, LogSink};
use crate::core::platform::{BuildMode, Platform};
use crate::execution::WorkflowExecutor;
use crate::steps::{custom_args, StepRegistry};
use crate::store::{AppStore, ProjectStore};
use crate::toolchain::{spawn_line_reader, Device, PidCell, Toolchain, FLUTTER_BIN};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

const DEFAULT_QUIT_GRACE: Duration = Duration::from_secs(10);

/// Current session state, for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatusReport {
    pub is_running: bool,
    pub device: Option<String>,
    pub project_id: Option<String>,
}

enum SessionCommand {
    Reload,
    Restart,
    Quit(oneshot::Sender<()>),
}

struct PostRunHook {
    steps: Vec<crate::core::config::StepSpec>,
    context: ExecutionContext,
}

struct SessionHandle {
    device: String,
    project_id: String,
    commands: mpsc::Sender<SessionCommand>,
    post: Option<PostRunHook>,
}

pub struct RunSessionService<T: Toolchain> {
    toolchain: Arc<T>,
    projects: Arc<ProjectStore>,
    apps: Arc<AppStore>,
    registry: Arc<StepRegistry>,
    events: EventBus,
    session: Arc<Mutex<Option<SessionHandle>>>,
    logs: Arc<StdMutex<Vec<LogEntry>>>,
    quit_grace: Duration,
}

impl<T: Toolchain> RunSessionService<T> {
    pub fn new(
        toolchain: Arc<T>,
        projects: Arc<ProjectStore>,
        apps: Arc<AppStore>,
        registry: Arc<StepRegistry>,
        events: EventBus,
    ) -> Self {
        Self {
            toolchain,
            projects,
            apps,
            registry,
            events,
            session: Arc::new(Mutex::new(None)),
            logs: Arc::new(StdMutex::new(Vec::new())),
            quit_grace: DEFAULT_QUIT_GRACE,
        }
    }

    /// Shorten the quit grace period (how long a graceful quit may take
    /// before the process is killed).
    pub fn with_quit_grace(mut self, quit_grace: Duration) -> Self {
        self.quit_grace = quit_grace;
        self
    }

    /// Start an interactive session on a device. Holding the session
    /// lock across the whole start serializes concurrent attempts; the
    /// second caller sees the occupied slot.
    pub async fn start(
        &self,
        device_id: &str,
        project_id: &str,
        app_id: Option<&str>,
        mode: BuildMode,
    ) -> Result<RunStatusReport> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            return Err(Error::RunInProgress);
        }

        let project = self.projects.get(project_id)?;
        let project_root = project.path.clone();

        let mut command = vec![
            FLUTTER_BIN.to_string(),
            "run".to_string(),
            "-d".to_string(),
            device_id.to_string(),
            mode.flag().to_string(),
        ];

        // Per-app run settings and pre/post-run steps, when the device's
        // platform resolves to configured settings
        let mut post: Option<PostRunHook> = None;
        if let Some(app_id) = app_id {
            if let Some((app, platform)) = self.resolve_app_platform(app_id, device_id).await {
                let settings = app.settings_for(platform).run;
                let mut context = ExecutionContext::new(
                    project_id,
                    project_root.clone(),
                    app,
                    Uuid::new_v4(),
                );
                context.platform = Some(platform);
                context.mode = Some(mode);
                context.apps_dir = Some(self.projects.apps_dir(project_id));

                if !settings.pre_steps.is_empty() {
                    let sink = self.run_sink();
                    sink.info("Running pre-run steps...");
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

                command.extend(custom_args::extract_arguments(&settings.pre_steps));
                command.extend(settings.extra_args());
                command.extend(settings.dart_define_args());

                if !settings.post_steps.is_empty() {
                    post = Some(PostRunHook {
                        steps: settings.post_steps.clone(),
                        context,
                    });
                }
            }
        }

        info!("Running command: {}", command.join(" "));
        self.logs.lock().unwrap().clear();

        let mut child = self.toolchain.spawn_session(&command, &project_root).await?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Config("session stdin is not piped".to_string()))?;

        // One consumer classifies and publishes lines from both streams
        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, line_tx.clone());
        }
        drop(line_tx);
        let logs = self.logs.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            while let Some(line) = line_rx.recv().await {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let entry = LogEntry::new(line, classify_line(line));
                logs.lock().unwrap().push(entry.clone());
                events.publish(Event::RunLog { entry });
            }
        });

        let (command_tx, command_rx) = mpsc::channel(8);
        tokio::spawn(supervise(
            child,
            stdin,
            command_rx,
            self.events.clone(),
            self.session.clone(),
            self.quit_grace,
        ));

        *slot = Some(SessionHandle {
            device: device_id.to_string(),
            project_id: project_id.to_string(),
            commands: command_tx,
            post,
        });

        self.events.publish(Event::RunStatus {
            status: RunPhase::Running,
            device: Some(device_id.to_string()),
        });

        Ok(RunStatusReport {
            is_running: true,
            device: Some(device_id.to_string()),
            project_id: Some(project_id.to_string()),
        })
    }

    /// Stop the session: graceful quit, kill after the grace period,
    /// then post-run steps. Idempotent when nothing is running.
    pub async fn stop(&self) -> Result<RunStatusReport> {
        let handle = self.session.lock().await.take();
        let Some(handle) = handle else {
            return Ok(RunStatusReport {
                is_running: false,
                device: None,
                project_id: None,
            });
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if handle
            .commands
            .send(SessionCommand::Quit(ack_tx))
            .await
            .is_ok()
        {
            // the supervisor kills after quit_grace; leave it some slack
            let _ = tokio::time::timeout(self.quit_grace + Duration::from_secs(2), ack_rx).await;
        }

        if let Some(post) = handle.post {
            let sink = self.run_sink();
            sink.info("Running post-run steps...");
            let (ok, _) = WorkflowExecutor::execute_steps(
                &self.registry,
                &post.steps,
                &post.context,
                &sink,
                false,
            )
            .await;
            if !ok {
                sink.warning("Post-run steps reported failures");
            }
        }

        Ok(RunStatusReport {
            is_running: false,
            device: None,
            project_id: None,
        })
    }

    /// Write the hot-reload command into the session.
    pub async fn hot_reload(&self) -> Result<()> {
        self.send_command(SessionCommand::Reload).await?;
        self.events.publish(Event::RunStatus {
            status: RunPhase::Reloading,
            device: self.status().await.device,
        });
        Ok(())
    }

    /// Write the hot-restart command into the session.
    pub async fn hot_restart(&self) -> Result<()> {
        self.send_command(SessionCommand::Restart).await?;
        self.events.publish(Event::RunStatus {
            status: RunPhase::Restarting,
            device: self.status().await.device,
        });
        Ok(())
    }

    async fn send_command(&self, command: SessionCommand) -> Result<()> {
        let slot = self.session.lock().await;
        let handle = slot.as_ref().ok_or(Error::NotRunning)?;
        handle
            .commands
            .send(command)
            .await
            .map_err(|_| Error::NotRunning)
    }

    pub async fn status(&self) -> RunStatusReport {
        let slot = self.session.lock().await;
        match slot.as_ref() {
            Some(handle) => RunStatusReport {
                is_running: true,
                device: Some(handle.device.clone()),
                project_id: Some(handle.project_id.clone()),
            },
            None => RunStatusReport {
                is_running: false,
                device: None,
                project_id: None,
            },
        }
    }

    /// Logs collected for the current session.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.lock().unwrap().clone()
    }

    /// Available devices, filtered to the platforms a project's
    /// directory structure supports when a project id is given.
    pub async fn devices(&self, project_id: Option<&str>) -> Result<Vec<Device>> {
        let project_root = project_id
            .and_then(|id| self.projects.get(id).ok())
            .map(|project| project.path);

        let mut devices = self.toolchain.devices(project_root.as_deref()).await?;

        if let Some(root) = project_root {
            let supported = project_platforms(&root);
            if !supported.is_empty() {
                devices.retain(|device| {
                    device
                        .platform_type
                        .map_or(false, |platform| supported.contains(&platform))
                });
            }
        }
        Ok(devices)
    }

    /// Run `flutter clean` in a project root.
    pub async fn clean(&self, project_id: &str) -> Result<()> {
        let project = self.projects.get(project_id)?;
        let sink = self.run_sink();
        self.toolchain
            .run(
                &[FLUTTER_BIN.to_string(), "clean".to_string()],
                &project.path,
                &PidCell::default(),
                &sink,
            )
            .await?;
        sink.success("Flutter clean completed");
        Ok(())
    }

    /// Resolve an app record and the platform of the target device.
    async fn resolve_app_platform(
        &self,
        app_id: &str,
        device_id: &str,
    ) -> Option<(AppRecord, Platform)> {
        let app = match self.apps.get(app_id) {
            Ok(app) => app,
            Err(e) => {
                warn!("run settings unavailable: {e}");
                return None;
            }
        };
        let devices = self.toolchain.devices(None).await.unwrap_or_default();
        let platform = devices
            .iter()
            .find(|device| device.id == device_id)
            .and_then(|device| device.platform_type)?;
        Some((app, platform))
    }

    /// A sink feeding the session log buffer and the run-log event
    /// stream.
    fn run_sink(&self) -> LogSink {
        let logs = self.logs.clone();
        let events = self.events.clone();
        LogSink::new(move |message, level| {
            let entry = LogEntry::new(message, level);
            logs.lock().unwrap().push(entry.clone());
            events.publish(Event::RunLog { entry });
        })
    }
}

/// The platforms a project supports, judged by which platform
/// directories exist under its root.
pub fn project_platforms(project_root: &Path) -> Vec<Platform> {
    Platform::ALL
        .into_iter()
        .filter(|platform| project_root.join(platform.dir_name()).is_dir())
        .collect()
}

/// Owns the child process and its stdin for the session's lifetime. All
/// stdin writes flow through here, serialized by the command channel.
async fn supervise(
    mut child: Child,
    mut stdin: ChildStdin,
    mut commands: mpsc::Receiver<SessionCommand>,
    events: EventBus,
    session: Arc<Mutex<Option<SessionHandle>>>,
    quit_grace: Duration,
) {
    enum Exit {
        Quit(oneshot::Sender<()>),
        Dropped,
        Died,
    }

    let exit = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::Reload) => {
                    let _ = stdin.write_all(b"r\n").await;
                    let _ = stdin.flush().await;
                }
                Some(SessionCommand::Restart) => {
                    let _ = stdin.write_all(b"R\n").await;
                    let _ = stdin.flush().await;
                }
                Some(SessionCommand::Quit(ack)) => {
                    let _ = stdin.write_all(b"q\n").await;
                    let _ = stdin.flush().await;
                    break Exit::Quit(ack);
                }
                // all handles dropped, tear the session down
                None => break Exit::Dropped,
            },
            _ = child.wait() => {
                info!("run session process exited");
                break Exit::Died;
            }
        }
    };

    match exit {
        Exit::Quit(ack) => {
            if tokio::time::timeout(quit_grace, child.wait()).await.is_err() {
                warn!("session did not quit in time, killing");
                let _ = child.kill().await;
                let _ = child.wait().await;
            }
            let _ = ack.send(());
        }
        Exit::Dropped => {
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
        Exit::Died => {}
    }

    session.lock().await.take();
    events.publish(Event::RunStatus {
        status: RunPhase::Stopped,
        device: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_project_platforms_reads_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("android")).unwrap();
        fs::create_dir_all(dir.path().join("web")).unwrap();
        fs::write(dir.path().join("ios"), "a file, not a dir").unwrap();

        let platforms = project_platforms(dir.path());
        assert_eq!(platforms, [Platform::Android, Platform::Web]);
    }
}
