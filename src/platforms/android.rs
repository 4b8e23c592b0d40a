//! Android platform handler
//!
//! Project configuration (app name, package id, MainActivity, icons) is
//! handled by the "Android Setup" workflow step, so `setup` here only
//! points at that.

use crate::core::config::AppRecord;
use crate::core::error::{Error, Result};
use crate::core::platform::{BuildMode, OutputKind, Platform};
use crate::platforms::{HandlerContext, PlatformHandler};
use crate::toolchain::FLUTTER_BIN;
use std::path::PathBuf;

pub struct AndroidHandler {
    cx: HandlerContext,
}

impl AndroidHandler {
    pub fn new(cx: HandlerContext) -> Self {
        Self { cx }
    }
}

impl PlatformHandler for AndroidHandler {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn setup(&self, _app_id: &str, _app: &AppRecord) -> Result<()> {
        self.cx.log.info("Android setup is managed via workflow steps");
        self.cx
            .log
            .info("Add 'Android Setup' step to pre-build workflow for configuration");
        Ok(())
    }

    fn build_command(&self, mode: BuildMode, output: OutputKind) -> Vec<String> {
        let target = match output {
            OutputKind::Appbundle => "appbundle",
            _ => "apk",
        };
        vec![
            FLUTTER_BIN.to_string(),
            "build".to_string(),
            target.to_string(),
            mode.flag().to_string(),
        ]
    }

    fn find_output(&self, mode: BuildMode, output: OutputKind) -> Result<PathBuf> {
        let path = match output {
            OutputKind::Appbundle => self
                .cx
                .project_root
                .join("build")
                .join("app")
                .join("outputs")
                .join("bundle")
                .join(mode.as_str())
                .join(format!("app-{mode}.aab")),
            _ => self
                .cx
                .project_root
                .join("build")
                .join("app")
                .join("outputs")
                .join("flutter-apk")
                .join(format!("app-{mode}.apk")),
        };

        if !path.exists() {
            return Err(Error::OutputNotFound(path));
        }
        Ok(path)
    }

    fn output_extension(&self, output: OutputKind) -> &'static str {
        match output {
            OutputKind::Appbundle => ".aab",
            _ => ".apk",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log::LogSink;
    use std::fs;

    fn handler_in(root: &std::path::Path) -> AndroidHandler {
        AndroidHandler::new(HandlerContext {
            project_root: root.to_path_buf(),
            apps_dir: root.join("apps"),
            log: LogSink::noop(),
        })
    }

    #[test]
    fn test_build_command_selects_target_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());

        assert_eq!(
            handler.build_command(BuildMode::Debug, OutputKind::Appbundle),
            ["flutter", "build", "appbundle", "--debug"]
        );
        assert_eq!(
            handler.build_command(BuildMode::Release, OutputKind::Apk),
            ["flutter", "build", "apk", "--release"]
        );
        assert_eq!(
            handler.build_command(BuildMode::Profile, OutputKind::Apk),
            ["flutter", "build", "apk", "--profile"]
        );
    }

    #[test]
    fn test_output_extension() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        assert_eq!(handler.output_extension(OutputKind::Appbundle), ".aab");
        assert_eq!(handler.output_extension(OutputKind::Apk), ".apk");
    }

    #[test]
    fn test_find_output_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_in(dir.path());
        let err = handler
            .find_output(BuildMode::Release, OutputKind::Apk)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_find_output_returns_apk_directly() {
        let dir = tempfile::tempdir().unwrap();
        let apk_dir = dir.path().join("build/app/outputs/flutter-apk");
        fs::create_dir_all(&apk_dir).unwrap();
        fs::write(apk_dir.join("app-release.apk"), "apk").unwrap();

        let handler = handler_in(dir.path());
        let path = handler
            .find_output(BuildMode::Release, OutputKind::Apk)
            .unwrap();
        assert_eq!(path, apk_dir.join("app-release.apk"));
    }
}
