//! Web platform handler

use crate::core::config::AppRecord;
use crate::core::error::{Error, Result};
use crate::core::platform::{BuildMode, OutputKind, Platform};
use crate::platforms::{zip_directory, HandlerContext, PlatformHandler};
use crate::toolchain::FLUTTER_BIN;
use std::path::PathBuf;

pub struct WebHandler {
    cx: HandlerContext,
}

impl WebHandler {
    pub fn new(cx: HandlerContext) -> Self {
        Self { cx }
    }
}

impl PlatformHandler for WebHandler {
    fn platform(&self) -> Platform {
        Platform::Web
    }

    fn setup(&self, _app_id: &str, _app: &AppRecord) -> Result<()> {
        self.cx.log.info("Setting up Web configuration...");
        self.cx
            .log
            .success("Web setup completed (minimal configuration)");
        Ok(())
    }

    fn build_command(&self, mode: BuildMode, _output: OutputKind) -> Vec<String> {
        vec![
            FLUTTER_BIN.to_string(),
            "build".to_string(),
            "web".to_string(),
            mode.flag().to_string(),
        ]
    }

    fn find_output(&self, mode: BuildMode, _output: OutputKind) -> Result<PathBuf> {
        let web_dir = self.cx.project_root.join("build").join("web");
        if !web_dir.exists() {
            return Err(Error::OutputNotFound(web_dir));
        }
        zip_directory(&self.cx.project_root, &web_dir, &format!("web_{mode}"))
    }

    fn output_extension(&self, _output: OutputKind) -> &'static str {
        ".zip"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log::LogSink;
    use std::fs;

    #[test]
    fn test_find_output_zips_web_directory() {
        let dir = tempfile::tempdir().unwrap();
        let web_dir = dir.path().join("build/web");
        fs::create_dir_all(&web_dir).unwrap();
        fs::write(web_dir.join("index.html"), "<html></html>").unwrap();

        let handler = WebHandler::new(HandlerContext {
            project_root: dir.path().to_path_buf(),
            apps_dir: dir.path().join("apps"),
            log: LogSink::noop(),
        });
        let path = handler
            .find_output(BuildMode::Release, OutputKind::Web)
            .unwrap();
        assert_eq!(path, dir.path().join("build/web_release.zip"));
        assert!(path.exists());
    }
}
