//! Flutter CLI subprocess supervision
//!
//! Wraps toolchain invocations behind the [`Toolchain`] trait so the
//! build pipeline can be driven by a spy in tests. Output is consumed
//! line by line as it arrives and forwarded to the caller's sink.

pub mod devices;

use crate::core::error::{Error, Result};
use crate::core::log::LogSink;
use async_trait::async_trait;
pub use devices::Device;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Name of the toolchain binary as it appears in handler commands.
pub const FLUTTER_BIN: &str = "flutter";

/// Shared cell recording the pid of the currently supervised process,
/// so a stop call from another task can signal it.
pub type PidCell = Arc<Mutex<Option<u32>>>;

/// Driver for toolchain invocations.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Run a command to completion, streaming every output line to the
    /// sink. The spawned pid is recorded in `pid` for external
    /// cancellation. A non-zero exit is an error carrying the code.
    async fn run(&self, command: &[String], cwd: &Path, pid: &PidCell, sink: &LogSink)
        -> Result<()>;

    /// Spawn a long-lived interactive process with piped stdin/stdout/stderr.
    async fn spawn_session(&self, command: &[String], cwd: &Path) -> Result<Child>;

    /// List attached devices via the machine-readable device listing.
    async fn devices(&self, cwd: Option<&Path>) -> Result<Vec<Device>>;
}

/// The real Flutter CLI.
#[derive(Debug, Clone)]
pub struct FlutterCli {
    binary: String,
}

impl FlutterCli {
    pub fn new() -> Self {
        Self {
            binary: FLUTTER_BIN.to_string(),
        }
    }

    /// Use a specific toolchain binary instead of `flutter` on PATH.
    pub fn with_binary(binary: String) -> Self {
        Self { binary }
    }

    fn resolve<'a>(&'a self, program: &'a str) -> &'a str {
        if program == FLUTTER_BIN {
            &self.binary
        } else {
            program
        }
    }
}

impl Default for FlutterCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Toolchain for FlutterCli {
    async fn run(
        &self,
        command: &[String],
        cwd: &Path,
        pid: &PidCell,
        sink: &LogSink,
    ) -> Result<()> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Config("empty toolchain command".to_string()))?;
        let program = self.resolve(program);

        debug!("Spawning {} {}", program, args.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        *pid.lock().await = child.id();

        let status = stream_output(&mut child, |line| {
            let line = line.trim();
            if !line.is_empty() {
                sink.terminal(line);
            }
        })
        .await;

        *pid.lock().await = None;

        let status = status?;
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return Err(Error::Toolchain {
                description: command.join(" "),
                code,
            });
        }
        Ok(())
    }

    async fn spawn_session(&self, command: &[String], cwd: &Path) -> Result<Child> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Config("empty toolchain command".to_string()))?;
        let child = Command::new(self.resolve(program))
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Ok(child)
    }

    async fn devices(&self, cwd: Option<&Path>) -> Result<Vec<Device>> {
        let mut command = Command::new(&self.binary);
        command
            .args(["devices", "--machine"])
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        let output = command.output().await?;
        if !output.status.success() {
            warn!(
                "device listing exited with code {}",
                output.status.code().unwrap_or(-1)
            );
            return Ok(Vec::new());
        }
        Ok(devices::parse_device_list(&output.stdout))
    }
}

/// Spawn a task that reads lines from `reader` into `tx` until EOF.
pub(crate) fn spawn_line_reader<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

/// Consume a child's combined stdout/stderr line by line, then wait for
/// it to exit.
pub(crate) async fn stream_output<F>(
    child: &mut Child,
    mut on_line: F,
) -> std::io::Result<std::process::ExitStatus>
where
    F: FnMut(&str),
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, tx.clone());
    }
    drop(tx);

    while let Some(line) = rx.recv().await {
        on_line(&line);
    }
    child.wait().await
}

/// Signal a process to terminate, escalating to SIGKILL after the grace
/// period if it is still alive.
pub async fn terminate_process(pid: u32, grace: Duration) {
    let pid = Pid::from_raw(pid as i32);
    if signal::kill(pid, Signal::SIGTERM).is_err() {
        // already gone
        return;
    }
    let deadline = tokio::time::Instant::now() + grace;
    while tokio::time::Instant::now() < deadline {
        if signal::kill(pid, None).is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    let _ = signal::kill(pid, Signal::SIGKILL);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_streams_lines_and_succeeds() {
        let cli = FlutterCli::new();
        let lines = Arc::new(std::sync::Mutex::new(Vec::new()));
        let captured = lines.clone();
        let sink = LogSink::new(move |message, _| {
            captured.lock().unwrap().push(message.to_string());
        });
        let pid = PidCell::default();

        let command: Vec<String> = ["sh", "-c", "echo one; echo two 1>&2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        cli.run(&command, Path::new("."), &pid, &sink).await.unwrap();

        let mut lines = lines.lock().unwrap().clone();
        lines.sort();
        assert_eq!(lines, ["one", "two"]);
        assert!(pid.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_run_maps_exit_code() {
        let cli = FlutterCli::new();
        let pid = PidCell::default();
        let command: Vec<String> = ["sh", "-c", "exit 3"].iter().map(|s| s.to_string()).collect();

        let err = cli
            .run(&command, Path::new("."), &pid, &LogSink::noop())
            .await
            .unwrap_err();
        match err {
            Error::Toolchain { code, .. } => assert_eq!(code, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_terminate_is_quiet_for_dead_pid() {
        // a pid above the kernel's default pid_max, so nothing is signalled
        terminate_process(99_999_999, Duration::from_millis(50)).await;
    }
}
