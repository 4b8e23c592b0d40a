//! Target platform, build mode and output kind types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A build target platform supported by the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Web,
    Macos,
    Windows,
    Linux,
}

impl Platform {
    /// All supported platforms, in registry order.
    pub const ALL: [Platform; 6] = [
        Platform::Android,
        Platform::Ios,
        Platform::Web,
        Platform::Macos,
        Platform::Windows,
        Platform::Linux,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Web => "web",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
        }
    }

    /// Name of the platform directory inside a project root.
    pub fn dir_name(&self) -> &'static str {
        self.as_str()
    }

    /// Map the toolchain's raw `targetPlatform` identifier to a canonical
    /// platform. Unknown identifiers map to `None`.
    pub fn from_device_target(target: &str) -> Option<Platform> {
        match target {
            "android-arm" | "android-arm64" | "android-x64" | "android-x86" | "android" => {
                Some(Platform::Android)
            }
            "ios" => Some(Platform::Ios),
            "darwin" | "darwin-arm64" | "darwin-x64" => Some(Platform::Macos),
            "linux-x64" | "linux-arm64" | "linux" => Some(Platform::Linux),
            "windows-x64" | "windows" => Some(Platform::Windows),
            "web-javascript" | "chrome" | "web" => Some(Platform::Web),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "web" => Ok(Platform::Web),
            "macos" => Ok(Platform::Macos),
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Compilation mode passed to the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Release,
    Debug,
    Profile,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Release => "release",
            BuildMode::Debug => "debug",
            BuildMode::Profile => "profile",
        }
    }

    /// The toolchain command-line flag for this mode.
    pub fn flag(&self) -> &'static str {
        match self {
            BuildMode::Release => "--release",
            BuildMode::Debug => "--debug",
            BuildMode::Profile => "--profile",
        }
    }

    /// The capitalized configuration directory name used by desktop builds.
    pub fn config_dir(&self) -> &'static str {
        match self {
            BuildMode::Release => "Release",
            BuildMode::Debug => "Debug",
            BuildMode::Profile => "Profile",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(BuildMode::Release),
            "debug" => Ok(BuildMode::Debug),
            "profile" => Ok(BuildMode::Profile),
            other => Err(format!("unknown build mode: {other}")),
        }
    }
}

/// Requested artifact format for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Apk,
    Appbundle,
    Ipa,
    Web,
    Executable,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Apk => "apk",
            OutputKind::Appbundle => "appbundle",
            OutputKind::Ipa => "ipa",
            OutputKind::Web => "web",
            OutputKind::Executable => "executable",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apk" => Ok(OutputKind::Apk),
            "appbundle" => Ok(OutputKind::Appbundle),
            "ipa" => Ok(OutputKind::Ipa),
            "web" => Ok(OutputKind::Web),
            "executable" => Ok(OutputKind::Executable),
            other => Err(format!("unknown output type: {other}")),
        }
    }
}
