//! iOS platform handler

use crate::core::config::AppRecord;
use crate::core::error::{Error, Result};
use crate::core::platform::{BuildMode, OutputKind, Platform};
use crate::platforms::{zip_app_bundle, HandlerContext, PlatformHandler};
use crate::toolchain::FLUTTER_BIN;
use std::path::PathBuf;

pub struct IosHandler {
    cx: HandlerContext,
}

impl IosHandler {
    pub fn new(cx: HandlerContext) -> Self {
        Self { cx }
    }
}

impl PlatformHandler for IosHandler {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn setup(&self, _app_id: &str, _app: &AppRecord) -> Result<()> {
        self.cx.log.info("Setting up iOS configuration...");
        // TODO: Info.plist updates for app name and bundle id once the
        // signing story is sorted out
        self.cx
            .log
            .success("iOS setup completed (minimal configuration)");
        Ok(())
    }

    fn build_command(&self, mode: BuildMode, _output: OutputKind) -> Vec<String> {
        vec![
            FLUTTER_BIN.to_string(),
            "build".to_string(),
            "ios".to_string(),
            mode.flag().to_string(),
            "--no-codesign".to_string(),
        ]
    }

    fn find_output(&self, mode: BuildMode, _output: OutputKind) -> Result<PathBuf> {
        let app_path = self
            .cx
            .project_root
            .join("build")
            .join("ios")
            .join("iphoneos")
            .join("Runner.app");

        if !app_path.exists() {
            return Err(Error::OutputNotFound(app_path));
        }
        zip_app_bundle(&self.cx.project_root, &app_path, &format!("ios_{mode}"))
    }

    fn output_extension(&self, _output: OutputKind) -> &'static str {
        // the .app bundle is shipped inside a zip
        ".zip"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log::LogSink;
    use std::fs;

    #[test]
    fn test_build_command_disables_codesigning() {
        let dir = tempfile::tempdir().unwrap();
        let handler = IosHandler::new(HandlerContext {
            project_root: dir.path().to_path_buf(),
            apps_dir: dir.path().join("apps"),
            log: LogSink::noop(),
        });
        assert_eq!(
            handler.build_command(BuildMode::Release, OutputKind::Ipa),
            ["flutter", "build", "ios", "--release", "--no-codesign"]
        );
        assert_eq!(handler.output_extension(OutputKind::Ipa), ".zip");
    }

    #[test]
    fn test_find_output_zips_app_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("build/ios/iphoneos/Runner.app");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("Info.plist"), "plist").unwrap();

        let handler = IosHandler::new(HandlerContext {
            project_root: dir.path().to_path_buf(),
            apps_dir: dir.path().join("apps"),
            log: LogSink::noop(),
        });
        let path = handler
            .find_output(BuildMode::Release, OutputKind::Ipa)
            .unwrap();
        assert_eq!(path, dir.path().join("build/ios_release.zip"));
        assert!(path.exists());
    }
}
