//! macOS platform handler

use crate::core::config::AppRecord;
use crate::core::error::{Error, Result};
use crate::core::platform::{BuildMode, OutputKind, Platform};
use crate::platforms::{zip_directory, HandlerContext, PlatformHandler};
use crate::toolchain::FLUTTER_BIN;
use std::path::PathBuf;

pub struct MacosHandler {
    cx: HandlerContext,
}

impl MacosHandler {
    pub fn new(cx: HandlerContext) -> Self {
        Self { cx }
    }
}

impl PlatformHandler for MacosHandler {
    fn platform(&self) -> Platform {
        Platform::Macos
    }

    fn setup(&self, _app_id: &str, _app: &AppRecord) -> Result<()> {
        self.cx.log.info("Setting up macOS configuration...");
        self.cx
            .log
            .success("macOS setup completed (minimal configuration)");
        Ok(())
    }

    fn build_command(&self, mode: BuildMode, _output: OutputKind) -> Vec<String> {
        vec![
            FLUTTER_BIN.to_string(),
            "build".to_string(),
            "macos".to_string(),
            mode.flag().to_string(),
        ]
    }

    fn find_output(&self, mode: BuildMode, _output: OutputKind) -> Result<PathBuf> {
        let products = self
            .cx
            .project_root
            .join("build")
            .join("macos")
            .join("Build")
            .join("Products")
            .join(mode.config_dir());

        if !products.exists() {
            return Err(Error::OutputNotFound(products));
        }
        zip_directory(&self.cx.project_root, &products, &format!("macos_{mode}"))
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
    fn test_missing_products_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let handler = MacosHandler::new(HandlerContext {
            project_root: dir.path().to_path_buf(),
            apps_dir: dir.path().join("apps"),
            log: LogSink::noop(),
        });
        let err = handler
            .find_output(BuildMode::Debug, OutputKind::Executable)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Products/Debug"));
    }
}
