//! Per-platform build strategy
//!
//! Each target platform implements [`PlatformHandler`]: pre-build setup,
//! build-command construction, artifact lookup and output packaging.
//! Desktop, web and iOS handlers zip their raw build output before
//! returning a path; Android hands back the apk/aab file directly.

pub mod android;
pub mod ios;
pub mod linux;
pub mod macos;
pub mod web;
pub mod windows;

use crate::core::config::AppRecord;
use crate::core::error::Result;
use crate::core::log::LogSink;
use crate::core::platform::{BuildMode, OutputKind, Platform};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub use android::AndroidHandler;
pub use ios::IosHandler;
pub use linux::LinuxHandler;
pub use macos::MacosHandler;
pub use web::WebHandler;
pub use windows::WindowsHandler;

/// State bound into a handler for the duration of one build.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub project_root: PathBuf,
    /// Directory holding per-app assets for this project.
    pub apps_dir: PathBuf,
    pub log: LogSink,
}

/// Strategy for one target platform.
pub trait PlatformHandler: Send + Sync {
    fn platform(&self) -> Platform;

    /// Apply platform-specific configuration before the build. May be a
    /// no-op when configuration is delegated to workflow steps.
    fn setup(&self, app_id: &str, app: &AppRecord) -> Result<()>;

    /// The toolchain build command for this platform, including the
    /// toolchain binary itself.
    fn build_command(&self, mode: BuildMode, output: OutputKind) -> Vec<String>;

    /// Locate the build artifact, packaging it first where the platform
    /// produces a directory. Returns [`crate::core::Error::OutputNotFound`]
    /// when the expected artifact is absent.
    fn find_output(&self, mode: BuildMode, output: OutputKind) -> Result<PathBuf>;

    /// File extension of the final artifact, including the dot.
    fn output_extension(&self, output: OutputKind) -> &'static str;
}

/// Select the handler for a platform.
pub fn handler_for(platform: Platform, cx: HandlerContext) -> Box<dyn PlatformHandler> {
    match platform {
        Platform::Android => Box::new(AndroidHandler::new(cx)),
        Platform::Ios => Box::new(IosHandler::new(cx)),
        Platform::Web => Box::new(WebHandler::new(cx)),
        Platform::Macos => Box::new(MacosHandler::new(cx)),
        Platform::Windows => Box::new(WindowsHandler::new(cx)),
        Platform::Linux => Box::new(LinuxHandler::new(cx)),
    }
}

/// Zip a directory's contents into `<project>/build/<name>.zip`.
pub(crate) fn zip_directory(
    project_root: &Path,
    source_dir: &Path,
    output_name: &str,
) -> Result<PathBuf> {
    let zip_path = project_root.join("build").join(format!("{output_name}.zip"));
    write_zip(&zip_path, source_dir, source_dir)?;
    Ok(zip_path)
}

/// Zip an `.app` bundle, keeping the bundle directory itself as the
/// top-level archive entry.
pub(crate) fn zip_app_bundle(
    project_root: &Path,
    app_path: &Path,
    output_name: &str,
) -> Result<PathBuf> {
    let zip_path = project_root.join("build").join(format!("{output_name}.zip"));
    let base = app_path.parent().unwrap_or(app_path);
    write_zip(&zip_path, base, app_path)?;
    Ok(zip_path)
}

/// Walk `root` and write its entries into a new archive at `zip_path`,
/// with entry names relative to `base`.
fn write_zip(zip_path: &Path, base: &Path, root: &Path) -> Result<()> {
    if let Some(parent) = zip_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(zip_path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(root).into_iter().filter_map(|entry| entry.ok()) {
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(base) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }
        let name = rel.to_string_lossy().replace('\\', "/");
        if path.is_dir() {
            writer.add_directory(name, options)?;
        } else {
            writer.start_file(name, options)?;
            let mut source = fs::File::open(path)?;
            std::io::copy(&mut source, &mut writer)?;
        }
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_zip_directory_contains_relative_entries() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("out");
        fs::create_dir_all(source.join("assets")).unwrap();
        fs::write(source.join("index.html"), "<html></html>").unwrap();
        fs::write(source.join("assets/app.js"), "app").unwrap();

        let zip_path = zip_directory(dir.path(), &source, "web_release").unwrap();
        assert_eq!(zip_path, dir.path().join("build/web_release.zip"));

        let mut archive = zip::ZipArchive::new(fs::File::open(&zip_path).unwrap()).unwrap();
        let mut content = String::new();
        archive
            .by_name("index.html")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<html></html>");
        assert!(archive.by_name("assets/app.js").is_ok());
    }

    #[test]
    fn test_zip_app_bundle_keeps_bundle_as_root() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("Products/Runner.app");
        fs::create_dir_all(bundle.join("Contents")).unwrap();
        fs::write(bundle.join("Contents/Info.plist"), "plist").unwrap();

        let zip_path = zip_app_bundle(dir.path(), &bundle, "ios_release").unwrap();
        let mut archive = zip::ZipArchive::new(fs::File::open(&zip_path).unwrap()).unwrap();
        assert!(archive.by_name("Runner.app/Contents/Info.plist").is_ok());
    }

    #[test]
    fn test_handler_for_covers_all_platforms() {
        let dir = tempfile::tempdir().unwrap();
        for platform in Platform::ALL {
            let handler = handler_for(
                platform,
                HandlerContext {
                    project_root: dir.path().to_path_buf(),
                    apps_dir: dir.path().join("apps"),
                    log: LogSink::noop(),
                },
            );
            assert_eq!(handler.platform(), platform);
        }
    }
}
