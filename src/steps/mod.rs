//! Workflow step contract and registry
//!
//! A step type exposes static metadata (a [`StepDescriptor`] published
//! for UI consumption) and two operations on an instance: a side-effect
//! free `validate` and an `execute` against the shared pipeline context.
//! Step types are registered in an explicit table built at process init;
//! unknown types are a lookup miss, not an error.

pub mod android_setup;
pub mod copy_files;
pub mod custom_args;
pub mod move_file;
pub mod run_script;

use crate::core::context::ExecutionContext;
use crate::core::log::LogSink;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Result of a workflow step execution.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            output: None,
            error: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, output: Map<String, Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            output: None,
            error: Some(error.into()),
        }
    }

    pub fn failed_with(
        message: impl Into<String>,
        error: impl Into<String>,
        output: Map<String, Value>,
    ) -> Self {
        Self {
            success: false,
            message: message.into(),
            output: Some(output),
            error: Some(error.into()),
        }
    }
}

/// Kind of a step configuration field, for UI form rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFieldKind {
    String,
    Number,
    Boolean,
    Select,
    Multiselect,
    Textarea,
    File,
}

/// An option of a select/multiselect field.
#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// Declaration of one configuration field of a step type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigField {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: ConfigFieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub placeholder: &'static str,
    /// Accepted file extensions for file fields (e.g. ".zip").
    #[serde(skip_serializing_if = "str::is_empty")]
    pub accept: &'static str,
}

impl ConfigField {
    pub fn new(name: &'static str, label: &'static str, kind: ConfigFieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            default: None,
            description: "",
            options: Vec::new(),
            placeholder: "",
            accept: "",
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn accept(mut self, accept: &'static str) -> Self {
        self.accept = accept;
        self
    }
}

/// Static metadata describing a step type. Immutable once registered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    #[serde(rename = "type")]
    pub step_type: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub config_fields: Vec<ConfigField>,
}

/// Lenient accessor over a step's raw JSON configuration.
///
/// Construction never fails; type mismatches and missing keys surface
/// through the step's own `validate`.
#[derive(Debug, Clone, Default)]
pub struct StepConfig(Map<String, Value>);

impl StepConfig {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.str(key).unwrap_or(default).to_string()
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn u64_or(&self, key: &str, default: u64) -> u64 {
        self.0.get(key).and_then(Value::as_u64).unwrap_or(default)
    }
}

impl From<&Map<String, Value>> for StepConfig {
    fn from(map: &Map<String, Value>) -> Self {
        Self(map.clone())
    }
}

/// A configurable unit of work executed as part of a pipeline.
#[async_trait]
pub trait WorkflowStep: Send + Sync {
    /// Check the configuration without side effects. Called before
    /// `execute`; an invalid config short-circuits execution.
    fn validate(&self) -> Result<(), String>;

    /// Run the step against the shared pipeline context.
    async fn execute(&self, context: &ExecutionContext) -> StepResult;
}

type StepCtor = fn(StepConfig, LogSink) -> Box<dyn WorkflowStep>;

struct Registration {
    step_type: &'static str,
    ctor: StepCtor,
    descriptor: fn() -> StepDescriptor,
}

/// Registry mapping step-type identifiers to constructors and metadata.
///
/// Registration order is fixed at init; registering the same type twice
/// is a configuration error and panics.
pub struct StepRegistry {
    entries: Vec<Registration>,
}

impl StepRegistry {
    /// The registry with every compiled-in step type.
    pub fn builtin() -> Self {
        let mut registry = Self { entries: Vec::new() };
        registry.register(custom_args::STEP_TYPE, custom_args::create, custom_args::descriptor);
        registry.register(copy_files::STEP_TYPE, copy_files::create, copy_files::descriptor);
        registry.register(move_file::STEP_TYPE, move_file::create, move_file::descriptor);
        registry.register(run_script::STEP_TYPE, run_script::create, run_script::descriptor);
        registry.register(
            android_setup::STEP_TYPE,
            android_setup::create,
            android_setup::descriptor,
        );
        registry
    }

    fn register(
        &mut self,
        step_type: &'static str,
        ctor: StepCtor,
        descriptor: fn() -> StepDescriptor,
    ) {
        if self.entries.iter().any(|entry| entry.step_type == step_type) {
            panic!("duplicate step type registered: {step_type}");
        }
        self.entries.push(Registration {
            step_type,
            ctor,
            descriptor,
        });
    }

    pub fn contains(&self, step_type: &str) -> bool {
        self.entries.iter().any(|entry| entry.step_type == step_type)
    }

    /// Instantiate a step, or `None` for an unknown type.
    pub fn create(
        &self,
        step_type: &str,
        config: StepConfig,
        log: LogSink,
    ) -> Option<Box<dyn WorkflowStep>> {
        self.entries
            .iter()
            .find(|entry| entry.step_type == step_type)
            .map(|entry| (entry.ctor)(config, log))
    }

    /// Metadata for every registered step type, in registration order.
    pub fn descriptors(&self) -> Vec<StepDescriptor> {
        self.entries.iter().map(|entry| (entry.descriptor)()).collect()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registration_is_exhaustive() {
        let registry = StepRegistry::builtin();
        for step_type in [
            "custom_args",
            "copy_files",
            "move_file",
            "run_script",
            "android_setup",
        ] {
            assert!(registry.contains(step_type), "missing step type {step_type}");
        }
    }

    #[test]
    fn test_unknown_type_is_a_lookup_miss() {
        let registry = StepRegistry::builtin();
        assert!(registry
            .create("no_such_step", StepConfig::default(), LogSink::noop())
            .is_none());
    }

    #[test]
    fn test_descriptor_order_matches_registration() {
        let registry = StepRegistry::builtin();
        let types: Vec<&str> = registry
            .descriptors()
            .iter()
            .map(|descriptor| descriptor.step_type)
            .collect();
        assert_eq!(
            types,
            ["custom_args", "copy_files", "move_file", "run_script", "android_setup"]
        );
    }

    #[test]
    fn test_descriptor_wire_shape() {
        let registry = StepRegistry::builtin();
        let descriptors = registry.descriptors();
        let json = serde_json::to_value(&descriptors[0]).unwrap();
        assert_eq!(json["type"], "custom_args");
        assert!(json["configFields"].is_array());
    }

    #[test]
    fn test_step_config_accessors() {
        let config = StepConfig::new(
            serde_json::json!({"source": "a.txt", "overwrite": true, "timeout": 60})
                .as_object()
                .unwrap()
                .clone(),
        );
        assert_eq!(config.str("source"), Some("a.txt"));
        assert!(config.bool_or("overwrite", false));
        assert!(!config.bool_or("missing", false));
        assert_eq!(config.u64_or("timeout", 300), 60);
        assert_eq!(config.u64_or("missing", 300), 300);
    }
}
