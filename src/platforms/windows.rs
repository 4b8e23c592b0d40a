//! Windows platform handler

use crate::core::config::AppRecord;
use crate::core::error::{Error, Result};
use crate::core::platform::{BuildMode, OutputKind, Platform};
use crate::platforms::{zip_directory, HandlerContext, PlatformHandler};
use crate::toolchain::FLUTTER_BIN;
use std::path::PathBuf;

pub struct WindowsHandler {
    cx: HandlerContext,
}

impl WindowsHandler {
    pub fn new(cx: HandlerContext) -> Self {
        Self { cx }
    }
}

impl PlatformHandler for WindowsHandler {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn setup(&self, _app_id: &str, _app: &AppRecord) -> Result<()> {
        self.cx.log.info("Setting up Windows configuration...");
        self.cx
            .log
            .success("Windows setup completed (minimal configuration)");
        Ok(())
    }

    fn build_command(&self, mode: BuildMode, _output: OutputKind) -> Vec<String> {
        vec![
            FLUTTER_BIN.to_string(),
            "build".to_string(),
            "windows".to_string(),
            mode.flag().to_string(),
        ]
    }

    fn find_output(&self, mode: BuildMode, _output: OutputKind) -> Result<PathBuf> {
        let runner_dir = self
            .cx
            .project_root
            .join("build")
            .join("windows")
            .join("x64")
            .join("runner")
            .join(mode.config_dir());

        if !runner_dir.exists() {
            return Err(Error::OutputNotFound(runner_dir));
        }
        zip_directory(&self.cx.project_root, &runner_dir, &format!("windows_{mode}"))
    }

    fn output_extension(&self, _output: OutputKind) -> &'static str {
        ".zip"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log::LogSink;

    #[test]
    fn test_build_command_mode_flag() {
        let dir = tempfile::tempdir().unwrap();
        let handler = WindowsHandler::new(HandlerContext {
            project_root: dir.path().to_path_buf(),
            apps_dir: dir.path().join("apps"),
            log: LogSink::noop(),
        });
        assert_eq!(
            handler.build_command(BuildMode::Debug, OutputKind::Executable),
            ["flutter", "build", "windows", "--debug"]
        );
    }
}
