//! Linux platform handler

use crate::core::config::AppRecord;
use crate::core::error::{Error, Result};
use crate::core::platform::{BuildMode, OutputKind, Platform};
use crate::platforms::{zip_directory, HandlerContext, PlatformHandler};
use crate::toolchain::FLUTTER_BIN;
use std::path::PathBuf;

pub struct LinuxHandler {
    cx: HandlerContext,
}

impl LinuxHandler {
    pub fn new(cx: HandlerContext) -> Self {
        Self { cx }
    }
}

impl PlatformHandler for LinuxHandler {
    fn platform(&self) -> Platform {
        Platform::Linux
    }

    fn setup(&self, _app_id: &str, _app: &AppRecord) -> Result<()> {
        self.cx.log.info("Setting up Linux configuration...");
        self.cx
            .log
            .success("Linux setup completed (minimal configuration)");
        Ok(())
    }

    fn build_command(&self, mode: BuildMode, _output: OutputKind) -> Vec<String> {
        vec![
            FLUTTER_BIN.to_string(),
            "build".to_string(),
            "linux".to_string(),
            mode.flag().to_string(),
        ]
    }

    fn find_output(&self, mode: BuildMode, _output: OutputKind) -> Result<PathBuf> {
        let bundle_dir = self
            .cx
            .project_root
            .join("build")
            .join("linux")
            .join("x64")
            .join(mode.as_str())
            .join("bundle");

        if !bundle_dir.exists() {
            return Err(Error::OutputNotFound(bundle_dir));
        }
        zip_directory(&self.cx.project_root, &bundle_dir, &format!("linux_{mode}"))
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
    fn test_find_output_zips_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("build/linux/x64/release/bundle");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("demo"), "elf").unwrap();

        let handler = LinuxHandler::new(HandlerContext {
            project_root: dir.path().to_path_buf(),
            apps_dir: dir.path().join("apps"),
            log: LogSink::noop(),
        });
        let path = handler
            .find_output(BuildMode::Release, OutputKind::Executable)
            .unwrap();
        assert_eq!(path, dir.path().join("build/linux_release.zip"));
    }
}
