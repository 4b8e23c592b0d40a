//! Device discovery - parsing the machine-readable device listing

use crate::core::platform::Platform;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One entry of the toolchain's `devices --machine` JSON output.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDevice {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    target_platform: String,
    #[serde(default)]
    emulator: bool,
}

/// An attached device, with the raw platform identifier mapped to a
/// canonical platform where possible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    /// Raw toolchain identifier, e.g. "android-arm64".
    pub platform: String,
    /// Canonical platform, when the raw identifier maps to one.
    pub platform_type: Option<Platform>,
    #[serde(rename = "isEmulator")]
    pub is_emulator: bool,
}

/// Parse the device-listing JSON. Malformed output yields an empty list
/// rather than an error, matching the best-effort nature of discovery.
pub fn parse_device_list(raw: &[u8]) -> Vec<Device> {
    let raw_devices: Vec<RawDevice> = match serde_json::from_slice(raw) {
        Ok(devices) => devices,
        Err(e) => {
            warn!("failed to parse device listing: {e}");
            return Vec::new();
        }
    };

    raw_devices
        .into_iter()
        .map(|raw| Device {
            platform_type: Platform::from_device_target(&raw.target_platform),
            id: raw.id,
            name: raw.name,
            platform: raw.target_platform,
            is_emulator: raw.emulator,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_list() {
        let raw = br#"[
            {"id": "emulator-5554", "name": "Pixel 7", "targetPlatform": "android-arm64", "emulator": true},
            {"id": "chrome", "name": "Chrome", "targetPlatform": "web-javascript", "emulator": false},
            {"id": "odd", "name": "Odd", "targetPlatform": "fuchsia-x64", "emulator": false}
        ]"#;

        let devices = parse_device_list(raw);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].platform_type, Some(Platform::Android));
        assert!(devices[0].is_emulator);
        assert_eq!(devices[1].platform_type, Some(Platform::Web));
        assert_eq!(devices[2].platform_type, None);
    }

    #[test]
    fn test_malformed_listing_is_empty() {
        assert!(parse_device_list(b"not json").is_empty());
    }
}
