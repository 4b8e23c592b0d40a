//! CLI output formatting

use crate::core::events::{StepStatus, WorkflowStatus};
use crate::core::log::{LogEntry, LogLevel};
use crate::store::history::{BuildRecord, BuildStatus};
use crate::toolchain::Device;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format a log entry for terminal display
pub fn format_log_entry(entry: &LogEntry) -> String {
    let message = match entry.level {
        LogLevel::Info => style(entry.message.as_str()).cyan().to_string(),
        LogLevel::Success => style(entry.message.as_str()).green().to_string(),
        LogLevel::Warning => style(entry.message.as_str()).yellow().to_string(),
        LogLevel::Error => style(entry.message.as_str()).red().to_string(),
        LogLevel::Terminal => style(entry.message.as_str()).dim().to_string(),
    };
    match &entry.step_id {
        Some(step_id) => format!("  [{step_id}] {message}"),
        None => message,
    }
}

/// Format a step status for display
pub fn format_step_status(status: StepStatus) -> String {
    match status {
        StepStatus::Pending => style("PENDING").dim().to_string(),
        StepStatus::Running => style("RUNNING").yellow().to_string(),
        StepStatus::Success => style("SUCCESS").green().to_string(),
        StepStatus::Error => style("ERROR").red().to_string(),
        StepStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format a workflow status for display
pub fn format_workflow_status(status: WorkflowStatus) -> String {
    match status {
        WorkflowStatus::Running => style("RUNNING").yellow().to_string(),
        WorkflowStatus::Success => style("SUCCESS").green().to_string(),
        WorkflowStatus::Error => style("ERROR").red().to_string(),
        WorkflowStatus::Stopped => style("STOPPED").yellow().to_string(),
    }
}

/// Format a device listing line
pub fn format_device(device: &Device) -> String {
    let platform = device
        .platform_type
        .map(|platform| platform.to_string())
        .unwrap_or_else(|| device.platform.clone());
    let kind = if device.is_emulator { "emulator" } else { "device" };
    format!(
        "{} {} ({}, {})",
        style(&device.id).bold(),
        device.name,
        style(platform).cyan(),
        style(kind).dim()
    )
}

/// Format one build-history line
pub fn format_build_record(record: &BuildRecord) -> String {
    let status = match record.status {
        BuildStatus::Success => style("success").green().to_string(),
        BuildStatus::Error => style("error").red().to_string(),
    };
    let what = match (&record.filename, &record.error_message) {
        (Some(filename), _) => {
            if record.file_exists {
                filename.clone()
            } else {
                format!("{filename} {}", style("(missing)").dim())
            }
        }
        (None, Some(error)) => style(error.as_str()).red().to_string(),
        (None, None) => String::new(),
    };
    let duration = record
        .duration_secs
        .map(|secs| format!(" {}", style(format!("{secs}s")).dim()))
        .unwrap_or_default();

    format!(
        "{} [{status}] {} {} {what}{duration}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.platform,
        record.build_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_includes_step_label() {
        let mut entry = LogEntry::new("copying", LogLevel::Info);
        entry.step_id = Some("copy".to_string());
        assert!(format_log_entry(&entry).contains("[copy]"));
    }

    #[test]
    fn test_device_line_prefers_canonical_platform() {
        let device = Device {
            id: "emulator-5554".into(),
            name: "Pixel".into(),
            platform: "android-arm64".into(),
            platform_type: Some(crate::core::Platform::Android),
            is_emulator: true,
        };
        let line = format_device(&device);
        assert!(line.contains("emulator-5554"));
        assert!(line.contains("android"));
    }
}
